// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth 2.0 authorization-code flow.

use crate::services::google_oidc::{GoogleIdTokenVerifier, GoogleProfile, OidcError};
use serde::Deserialize;
use std::time::Duration;

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

#[derive(Deserialize)]
struct TokenResponse {
    id_token: Option<String>,
}

/// OAuth client for "Sign in with Google".
pub struct GoogleOAuthClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_url: String,
    verifier: GoogleIdTokenVerifier,
}

impl GoogleOAuthClient {
    pub fn new(
        client_id: String,
        client_secret: String,
        redirect_url: String,
    ) -> anyhow::Result<Self> {
        let verifier = GoogleIdTokenVerifier::new(&client_id)?;
        Ok(Self {
            http: reqwest::Client::new(),
            client_id,
            client_secret,
            redirect_url,
            verifier,
        })
    }

    /// URL of Google's consent screen carrying our signed `state`.
    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            AUTHORIZE_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_url),
            urlencoding::encode("openid email profile"),
            urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code and return the verified profile.
    pub async fn exchange_code(&self, code: &str) -> Result<GoogleProfile, OidcError> {
        let response = self
            .http
            .post(TOKEN_URL)
            .timeout(Duration::from_secs(10))
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| OidcError::Transient(format!("token request failed: {e}")))?;

        let status = response.status();
        if status.is_client_error() {
            // Expired or replayed codes land here.
            let body = response.text().await.unwrap_or_default();
            return Err(OidcError::Invalid(format!(
                "token endpoint rejected code ({status}): {body}"
            )));
        }
        if !status.is_success() {
            return Err(OidcError::Transient(format!(
                "token endpoint returned {status}"
            )));
        }

        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|e| OidcError::Transient(format!("invalid token response: {e}")))?;
        let id_token = tokens
            .id_token
            .ok_or_else(|| OidcError::Invalid("token response has no id_token".to_string()))?;

        self.verifier.verify(&id_token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_url_is_encoded() {
        let client = GoogleOAuthClient::new(
            "client-123.apps.googleusercontent.com".to_string(),
            "secret".to_string(),
            "http://localhost:8080/v1/auth/google/callback".to_string(),
        )
        .unwrap();

        let url = client.authorize_url("abc");
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=client-123.apps.googleusercontent.com"));
        assert!(url.contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fv1%2Fauth%2Fgoogle%2Fcallback"
        ));
        assert!(url.contains("scope=openid%20email%20profile"));
        assert!(url.contains("state=abc"));
    }
}
