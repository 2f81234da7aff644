//! Resolution orchestrator
//!
//! Selects providers from the requested [`ProviderMode`], runs them (both
//! concurrently in auto mode), merges their traces and applies the fixed
//! priority policy: ATTOM's value wins whenever it has one, regardless of
//! which provider finished first.

use super::providers::{build_http_client, AttomClient, RentcastClient, ValuationProvider};
use super::{ProviderKind, ProviderMode, ProviderResult, Trace, ValuationAttempt, ValueSource};
use pvr_common::config::{resolve_api_key, TomlConfig, ATTOM_API_KEY_ENV, RENTCAST_API_KEY_ENV};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

/// Resolution errors
///
/// Provider failures are not errors; they show up as `None` values and
/// trace entries.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Address missing or blank; no upstream call was made
    #[error("address is required")]
    EmptyAddress,

    /// No invoked provider produced a result at all
    #[error("valuation failed: {0}")]
    Internal(String),
}

/// Per-provider raw values
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProviderValues {
    pub attom: Option<f64>,
    pub rentcast: Option<f64>,
}

/// Per-provider upstream status metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProviderStatuses {
    pub attom: Option<Value>,
    pub rentcast: Option<Value>,
}

/// Final resolution envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    /// Address as supplied by the caller
    pub address: String,
    /// Requested mode
    #[serde(rename = "provider")]
    pub requested_mode: ProviderMode,
    /// Provider chosen by the priority policy
    pub resolved_provider: Option<ProviderKind>,
    /// Resolved value
    pub value: Option<f64>,
    /// Same as `value`; older clients read this field
    pub market_value: Option<f64>,
    pub values: ProviderValues,
    pub attom_id: Option<String>,
    pub attom_source: Option<ValueSource>,
    pub status: ProviderStatuses,
    /// Every upstream attempt, ATTOM's entries first
    pub tried: Trace,
}

/// Outcome of one provider task
struct Invocation {
    result: ProviderResult,
    trace: Trace,
    failed: bool,
}

/// Multi-provider valuation resolver
pub struct ValuationResolver {
    attom: Arc<dyn ValuationProvider>,
    rentcast: Arc<dyn ValuationProvider>,
}

impl ValuationResolver {
    /// Create a resolver from one adapter per provider
    ///
    /// Fails if an adapter reports a different [`ProviderKind`] than the slot
    /// it is given, since the slots decide the priority order.
    pub fn new(
        attom: Arc<dyn ValuationProvider>,
        rentcast: Arc<dyn ValuationProvider>,
    ) -> pvr_common::Result<Self> {
        let slots = [(ProviderKind::Attom, &attom), (ProviderKind::Rentcast, &rentcast)];
        for (slot, provider) in slots {
            if provider.kind() != slot {
                return Err(pvr_common::Error::Config(format!(
                    "{} adapter registered as {} provider",
                    provider.kind(),
                    slot
                )));
            }
        }

        Ok(Self { attom, rentcast })
    }

    fn provider(&self, kind: ProviderKind) -> &Arc<dyn ValuationProvider> {
        match kind {
            ProviderKind::Attom => &self.attom,
            ProviderKind::Rentcast => &self.rentcast,
        }
    }

    /// Build the resolver with reqwest-backed clients
    ///
    /// API keys resolve ENV → TOML; a missing key is reported per resolution
    /// rather than failing startup.
    pub fn from_config(config: &TomlConfig) -> pvr_common::Result<Self> {
        let http = build_http_client(Duration::from_secs(config.http.timeout_secs))?;

        let attom_key = resolve_api_key("ATTOM", ATTOM_API_KEY_ENV, config.attom.api_key.as_deref());
        let rentcast_key = resolve_api_key(
            "RentCast",
            RENTCAST_API_KEY_ENV,
            config.rentcast.api_key.as_deref(),
        );

        info!(
            attom_base_url = config.attom_base_url(),
            rentcast_base_url = config.rentcast_base_url(),
            "Valuation providers configured"
        );

        Self::new(
            Arc::new(AttomClient::new(http.clone(), config.attom_base_url(), attom_key)),
            Arc::new(RentcastClient::new(http, config.rentcast_base_url(), rentcast_key)),
        )
    }

    /// Resolve a value for `address`
    ///
    /// `address` must be non-blank; it is forwarded upstream unchanged.
    pub async fn resolve(
        &self,
        address: &str,
        mode: ProviderMode,
    ) -> Result<ResolutionResult, ResolveError> {
        if address.trim().is_empty() {
            return Err(ResolveError::EmptyAddress);
        }

        let resolution_id = Uuid::new_v4();
        let span = info_span!("resolve", %resolution_id, %mode);

        self.run(address, mode).instrument(span).await
    }

    async fn run(&self, address: &str, mode: ProviderMode) -> Result<ResolutionResult, ResolveError> {
        // Launch every selected provider before awaiting any of them
        let tasks: Vec<_> = mode
            .providers()
            .iter()
            .map(|&kind| {
                let provider = self.provider(kind);
                (provider.kind(), spawn_lookup(provider, address))
            })
            .collect();

        let mut attom = None;
        let mut rentcast = None;
        for (kind, task) in tasks {
            let invocation = join_lookup(kind, task).await;
            match kind {
                ProviderKind::Attom => attom = Some(invocation),
                ProviderKind::Rentcast => rentcast = Some(invocation),
            }
        }

        let invoked = attom.iter().chain(rentcast.iter());
        if invoked.clone().all(|inv| inv.failed) {
            let failed: Vec<String> = invoked
                .flat_map(|inv| inv.trace.attempts().iter())
                .filter_map(|a| a.message.clone())
                .collect();
            error!(errors = ?failed, "No provider produced a result");
            return Err(ResolveError::Internal(failed.join("; ")));
        }

        let (resolved_provider, value) = merge(
            mode,
            attom.as_ref().map(|inv| &inv.result),
            rentcast.as_ref().map(|inv| &inv.result),
        );

        let mut tried = Trace::new();
        let mut values = ProviderValues::default();
        let mut status = ProviderStatuses::default();
        let mut attom_id = None;
        let mut attom_source = None;

        if let Some(inv) = attom {
            values.attom = inv.result.value;
            status.attom = inv.result.upstream_status;
            attom_id = inv.result.identifier;
            attom_source = inv.result.source;
            tried.extend(inv.trace);
        }
        if let Some(inv) = rentcast {
            values.rentcast = inv.result.value;
            status.rentcast = inv.result.upstream_status;
            tried.extend(inv.trace);
        }

        info!(
            resolved_provider = ?resolved_provider,
            value = ?value,
            attempts = tried.len(),
            "Resolution complete"
        );

        Ok(ResolutionResult {
            address: address.to_string(),
            requested_mode: mode,
            resolved_provider,
            value,
            market_value: value,
            values,
            attom_id,
            attom_source,
            status,
            tried,
        })
    }
}

/// Cross-provider priority policy
///
/// An explicitly requested provider is reported as resolved even without a
/// value. In auto mode ATTOM wins over RentCast, and neither is reported if
/// both came back empty.
pub fn merge(
    mode: ProviderMode,
    attom: Option<&ProviderResult>,
    rentcast: Option<&ProviderResult>,
) -> (Option<ProviderKind>, Option<f64>) {
    let attom_value = attom.and_then(|r| r.value);
    let rentcast_value = rentcast.and_then(|r| r.value);

    match mode {
        ProviderMode::Attom => (Some(ProviderKind::Attom), attom_value),
        ProviderMode::Rentcast => (Some(ProviderKind::Rentcast), rentcast_value),
        ProviderMode::Auto => match (attom_value, rentcast_value) {
            (Some(v), _) => (Some(ProviderKind::Attom), Some(v)),
            (None, Some(v)) => (Some(ProviderKind::Rentcast), Some(v)),
            (None, None) => (None, None),
        },
    }
}

fn spawn_lookup(
    provider: &Arc<dyn ValuationProvider>,
    address: &str,
) -> JoinHandle<(ProviderResult, Trace)> {
    let provider = Arc::clone(provider);
    let address = address.to_string();

    tokio::spawn(
        async move {
            let mut trace = Trace::new();
            let result = provider.lookup(&address, &mut trace).await;
            (result, trace)
        }
        .in_current_span(),
    )
}

/// Await a provider task, absorbing a panicked or cancelled task as an
/// empty result with an error trace entry
async fn join_lookup(kind: ProviderKind, task: JoinHandle<(ProviderResult, Trace)>) -> Invocation {
    match task.await {
        Ok((result, trace)) => Invocation {
            result,
            trace,
            failed: false,
        },
        Err(e) => {
            error!(provider = %kind, error = %e, "Provider task failed");
            let mut trace = Trace::new();
            trace.push(ValuationAttempt::failure(
                format!("{}:error", kind),
                format!("provider task failed: {}", e),
            ));
            Invocation {
                result: ProviderResult::empty(),
                trace,
                failed: true,
            }
        }
    }
}
