// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Compensating actions for operations that span systems.
//!
//! Each step that changes external state registers its inverse. If a later
//! step fails, [`Saga::compensate`] runs the inverses newest first. A failing
//! inverse is logged and the remaining ones still run.

use futures_util::future::BoxFuture;
use std::future::Future;

type Compensation = Box<dyn FnOnce() -> BoxFuture<'static, anyhow::Result<()>> + Send>;

pub struct Saga {
    name: &'static str,
    steps: Vec<(&'static str, Compensation)>,
}

impl Saga {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            steps: Vec::new(),
        }
    }

    /// Register the inverse of a step that just succeeded.
    pub fn register<F, Fut>(&mut self, step: &'static str, undo: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let undo: Compensation =
            Box::new(move || -> BoxFuture<'static, anyhow::Result<()>> { Box::pin(undo()) });
        self.steps.push((step, undo));
    }

    /// Undo every registered step in reverse order.
    ///
    /// Returns how many compensations failed.
    pub async fn compensate(mut self) -> usize {
        let steps = std::mem::take(&mut self.steps);
        let mut failed = 0;

        for (step, undo) in steps.into_iter().rev() {
            match undo().await {
                Ok(()) => tracing::info!(saga = self.name, step, "Compensated step"),
                Err(e) => {
                    failed += 1;
                    tracing::error!(
                        saga = self.name,
                        step,
                        error = %e,
                        "Compensation failed"
                    );
                }
            }
        }

        failed
    }

    /// The operation succeeded; drop the compensations without running them.
    pub fn complete(mut self) {
        self.steps.clear();
    }
}

impl Drop for Saga {
    fn drop(&mut self) {
        if !self.steps.is_empty() {
            tracing::warn!(
                saga = self.name,
                pending = self.steps.len(),
                "Saga dropped without completing or compensating"
            );
        }
    }
}
