//! Multi-provider property valuation
//!
//! # Architecture
//! - **normalizer** - ordered field-path extraction from raw provider JSON
//! - **trace** - append-only log of upstream attempts
//! - **providers** - one adapter per upstream AVM provider
//! - **resolver** - provider selection, concurrent execution and the
//!   cross-provider priority merge
//!
//! Provider failures never surface as errors: they become `None` values plus
//! trace entries. Only an empty address or an adapter task that dies before
//! producing any result is reported as an error.

pub mod normalizer;
pub mod providers;
pub mod resolver;
pub mod trace;

pub use providers::{AttomClient, RentcastClient, ValuationProvider};
pub use resolver::{ResolutionResult, ResolveError, ValuationResolver};
pub use trace::{Trace, ValuationAttempt};

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Upstream AVM provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// ATTOM Data (multi-step: property detail → AVM by id → AVM by address)
    Attom,
    /// RentCast (single AVM call)
    Rentcast,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Attom => "attom",
            ProviderKind::Rentcast => "rentcast",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-selected provider mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderMode {
    /// Query ATTOM only
    Attom,
    /// Query RentCast only
    Rentcast,
    /// Query both concurrently; ATTOM wins when it has a value
    #[default]
    Auto,
}

/// Unrecognised provider mode string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown provider mode: {0}")]
pub struct UnknownMode(pub String);

impl FromStr for ProviderMode {
    type Err = UnknownMode;

    /// Case-insensitive; `providerA`/`providerB` are accepted as aliases
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "attom" | "providera" => Ok(ProviderMode::Attom),
            "rentcast" | "providerb" => Ok(ProviderMode::Rentcast),
            "auto" | "" => Ok(ProviderMode::Auto),
            _ => Err(UnknownMode(s.to_string())),
        }
    }
}

impl ProviderMode {
    /// Parse an optional caller-supplied mode
    ///
    /// Missing or unrecognised values select `Auto`.
    pub fn from_param(param: Option<&str>) -> Self {
        match param.map(str::parse::<ProviderMode>) {
            None => ProviderMode::Auto,
            Some(Ok(mode)) => mode,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Falling back to auto provider mode");
                ProviderMode::Auto
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderMode::Attom => "attom",
            ProviderMode::Rentcast => "rentcast",
            ProviderMode::Auto => "auto",
        }
    }

    /// Providers this mode invokes, in priority order
    pub fn providers(&self) -> &'static [ProviderKind] {
        match self {
            ProviderMode::Attom => &[ProviderKind::Attom],
            ProviderMode::Rentcast => &[ProviderKind::Rentcast],
            ProviderMode::Auto => &[ProviderKind::Attom, ProviderKind::Rentcast],
        }
    }
}

impl fmt::Display for ProviderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a provider's value was derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    /// Automated valuation model estimate
    Avm,
    /// Tax/market assessment (fallback only)
    Assessment,
}

/// Outcome of one provider adapter invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderResult {
    /// Normalized value, if any path produced one
    pub value: Option<f64>,
    /// Derivation path of `value`
    pub source: Option<ValueSource>,
    /// Provider-internal property identifier
    pub identifier: Option<String>,
    /// Upstream status metadata, provider-shaped
    pub upstream_status: Option<Value>,
}

impl ProviderResult {
    /// Result carrying no value and no metadata
    pub fn empty() -> Self {
        Self::default()
    }
}
