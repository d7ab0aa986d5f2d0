// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Transactional email delivery via the Mailtrap sending API.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

const SEND_API: &str = "https://send.api.mailtrap.io/api/send";
const SANDBOX_API: &str = "https://sandbox.api.mailtrap.io/api/send";

/// Delivery attempts before giving up.
pub const MAX_RETRIES: u32 = 3;
/// Backoff unit; the wait after attempt `n` (1-based) is `n * RETRY_STEP`.
pub const RETRY_STEP: Duration = Duration::from_secs(2);

/// Emails the service knows how to send.
#[derive(Debug, Clone)]
pub enum EmailTemplate {
    UserInvitation {
        username: String,
        activation_url: String,
    },
}

impl EmailTemplate {
    pub fn name(&self) -> &'static str {
        match self {
            EmailTemplate::UserInvitation { .. } => "user_invitation",
        }
    }

    pub fn subject(&self) -> String {
        match self {
            EmailTemplate::UserInvitation { .. } => "Finish signing up for Reviews".to_string(),
        }
    }

    pub fn html_body(&self) -> String {
        match self {
            EmailTemplate::UserInvitation {
                username,
                activation_url,
            } => format!(
                "<!doctype html>\n<html><body>\
                 <p>Hi {},</p>\
                 <p>Thanks for signing up. Confirm your email to activate your account:</p>\
                 <p><a href=\"{}\">{}</a></p>\
                 <p>If you did not sign up, you can ignore this message.</p>\
                 </body></html>",
                escape_html(username),
                escape_html(activation_url),
                escape_html(activation_url),
            ),
        }
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail transport error: {0}")]
    Transport(String),

    #[error("mail provider returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("could not send email after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: Box<MailError> },
}

/// Outbound mail.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send `template` to one recipient and return the provider's status code.
    ///
    /// In sandbox mode messages are captured by the provider instead of
    /// being delivered.
    async fn send(
        &self,
        template: &EmailTemplate,
        recipient_name: &str,
        recipient_email: &str,
        sandbox: bool,
    ) -> Result<u16, MailError>;
}

/// Run `op` up to `attempts` times, sleeping `n * step` after failed attempt `n`.
pub async fn retry_with_backoff<T, F, Fut>(
    attempts: u32,
    step: Duration,
    mut op: F,
) -> Result<T, MailError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, MailError>>,
{
    let mut last = MailError::Transport("no delivery attempted".to_string());

    for attempt in 1..=attempts {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                tracing::warn!(attempt, error = %e, "Email delivery attempt failed");
                last = e;
                if attempt < attempts {
                    tokio::time::sleep(step * attempt).await;
                }
            }
        }
    }

    Err(MailError::Exhausted {
        attempts,
        last: Box::new(last),
    })
}

/// Mailtrap HTTP API client.
#[derive(Clone)]
pub struct MailtrapMailer {
    http: reqwest::Client,
    api_key: String,
    from_email: String,
    /// Sandbox inbox; sandbox sends need one
    inbox_id: Option<String>,
}

impl MailtrapMailer {
    pub fn new(api_key: String, from_email: String, inbox_id: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            from_email,
            inbox_id,
        }
    }

    fn endpoint(&self, sandbox: bool) -> String {
        match (&self.inbox_id, sandbox) {
            (Some(inbox), true) => format!("{}/{}", SANDBOX_API, inbox),
            _ => SEND_API.to_string(),
        }
    }
}

#[async_trait]
impl Mailer for MailtrapMailer {
    async fn send(
        &self,
        template: &EmailTemplate,
        recipient_name: &str,
        recipient_email: &str,
        sandbox: bool,
    ) -> Result<u16, MailError> {
        let url = self.endpoint(sandbox);
        let body = serde_json::json!({
            "from": { "email": self.from_email, "name": "Reviews" },
            "to": [{ "email": recipient_email, "name": recipient_name }],
            "subject": template.subject(),
            "html": template.html_body(),
            "category": template.name(),
        });

        let status = retry_with_backoff(MAX_RETRIES, RETRY_STEP, |_| {
            let request = self
                .http
                .post(&url)
                .bearer_auth(&self.api_key)
                .timeout(Duration::from_secs(10))
                .json(&body);
            async move {
                let response = request
                    .send()
                    .await
                    .map_err(|e| MailError::Transport(e.to_string()))?;

                let status = response.status();
                if status.is_success() {
                    Ok(status.as_u16())
                } else {
                    let body = response.text().await.unwrap_or_default();
                    Err(MailError::Rejected {
                        status: status.as_u16(),
                        body,
                    })
                }
            }
        })
        .await?;

        tracing::info!(
            template = template.name(),
            status,
            sandbox,
            "Email sent"
        );
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let calls = AtomicU32::new(0);
        let start = tokio::time::Instant::now();

        let result = retry_with_backoff(3, RETRY_STEP, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err(MailError::Transport("connection refused".to_string()))
                } else {
                    Ok(200u16)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 200);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 2s after the first failure, 4s after the second.
        assert_eq!(start.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);

        let result: Result<u16, _> = retry_with_backoff(3, RETRY_STEP, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(MailError::Rejected {
                    status: 401,
                    body: "Unauthorized".to_string(),
                })
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(MailError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, MailError::Rejected { status: 401, .. }));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn invitation_escapes_user_input() {
        let template = EmailTemplate::UserInvitation {
            username: "<script>".to_string(),
            activation_url: "http://localhost:3000/activate/abc".to_string(),
        };
        let body = template.html_body();
        assert!(body.contains("&lt;script&gt;"));
        assert!(body.contains("http://localhost:3000/activate/abc"));
        assert_eq!(template.name(), "user_invitation");
    }

    #[test]
    fn sandbox_requires_inbox() {
        let with_inbox = MailtrapMailer::new("k".into(), "a@b.c".into(), Some("42".into()));
        assert_eq!(
            with_inbox.endpoint(true),
            "https://sandbox.api.mailtrap.io/api/send/42"
        );
        assert_eq!(with_inbox.endpoint(false), SEND_API);

        let without = MailtrapMailer::new("k".into(), "a@b.c".into(), None);
        assert_eq!(without.endpoint(true), SEND_API);
    }
}
