//! Resolution trace
//!
//! Ordered, append-only log of every upstream attempt made during one
//! resolution. Each provider invocation owns its own [`Trace`]; the resolver
//! merges them once both have finished, so concurrent providers never share
//! a mutable log.

use serde::Serialize;

/// A single upstream attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationAttempt {
    /// Step name, e.g. `attom:property/detail`
    pub step: String,
    /// Whether the upstream answered with a 2xx status
    pub ok: bool,
    /// Upstream HTTP status, if a response was received
    pub http_status: Option<u16>,
    /// Value extracted at this step, if any
    pub extracted_value: Option<f64>,
    /// Provider identifier discovered at this step, if any
    pub identifier: Option<String>,
    /// Diagnostic message (errors, unparsable bodies)
    pub message: Option<String>,
}

impl ValuationAttempt {
    /// Attempt that received an upstream response
    pub fn response(step: impl Into<String>, status: u16, ok: bool, value: Option<f64>) -> Self {
        Self {
            step: step.into(),
            ok,
            http_status: Some(status),
            extracted_value: value,
            identifier: None,
            message: None,
        }
    }

    /// Attempt that failed before (or while) talking to the upstream
    pub fn failure(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            ok: false,
            http_status: None,
            extracted_value: None,
            identifier: None,
            message: Some(message.into()),
        }
    }

    /// Attach a discovered identifier
    pub fn with_identifier(mut self, identifier: Option<String>) -> Self {
        self.identifier = identifier;
        self
    }

    /// Attach a diagnostic message
    pub fn with_message(mut self, message: Option<String>) -> Self {
        self.message = message;
        self
    }
}

/// Append-only attempt log
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Trace {
    attempts: Vec<ValuationAttempt>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an attempt
    pub fn push(&mut self, attempt: ValuationAttempt) {
        tracing::debug!(
            step = %attempt.step,
            ok = attempt.ok,
            http_status = ?attempt.http_status,
            value = ?attempt.extracted_value,
            "Valuation attempt recorded"
        );
        self.attempts.push(attempt);
    }

    /// Append another trace after this one, preserving both orders
    pub fn extend(&mut self, other: Trace) {
        self.attempts.extend(other.attempts);
    }

    pub fn attempts(&self) -> &[ValuationAttempt] {
        &self.attempts
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }
}
