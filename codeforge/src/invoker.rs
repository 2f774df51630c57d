//! Retry-with-backoff around the completion service.
//!
//! Every stage goes through [`ResilientInvoker::invoke`], so transient
//! failures, timeouts and blank replies are handled the same way everywhere.

use std::sync::Arc;
use std::time::Duration;

use crate::error::InvocationError;
use crate::llm::{CompletionConfig, CompletionRequest, CompletionService};

pub struct ResilientInvoker {
    service: Arc<dyn CompletionService>,
    max_retries: u32,
    backoff_unit: Duration,
}

impl ResilientInvoker {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self {
            service,
            max_retries: 3,
            backoff_unit: Duration::from_secs(1),
        }
    }

    /// Total attempts per call. Values below one are treated as one.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before retrying after the given (0-indexed) attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_unit.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Call the service until it returns non-blank text.
    ///
    /// A call error, a timeout, an absent reply and a whitespace-only reply
    /// all count as a failed attempt.
    pub async fn invoke(
        &self,
        system: &str,
        prompt: &str,
        config: &CompletionConfig,
    ) -> Result<String, InvocationError> {
        let request = CompletionRequest {
            system,
            prompt,
            config,
        };
        let mut cause = String::from("no attempt made");

        for attempt in 0..self.max_retries {
            let outcome =
                tokio::time::timeout(config.timeout, self.service.complete(&request)).await;
            match outcome {
                Ok(Ok(Some(text))) if !text.trim().is_empty() => return Ok(text),
                Ok(Ok(Some(_))) => cause = "empty response".to_string(),
                Ok(Ok(None)) => cause = "no response".to_string(),
                Ok(Err(e)) => cause = format!("{e:#}"),
                Err(_) => cause = format!("timed out after {}s", config.timeout.as_secs_f32()),
            }

            if attempt + 1 < self.max_retries {
                let delay = self.backoff(attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    max_retries = self.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    cause = %cause,
                    "Completion failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }

        tracing::error!(
            attempts = self.max_retries,
            cause = %cause,
            "Completion retries exhausted"
        );
        Err(InvocationError {
            attempts: self.max_retries,
            cause,
        })
    }
}
