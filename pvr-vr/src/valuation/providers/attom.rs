//! ATTOM property API client
//!
//! ATTOM valuations are most reliable when requested by ATTOM's internal
//! property id, so a lookup runs up to three steps:
//! 1. `property/detail?address=` - resolve the attomId, plus an assessment
//!    value kept as a weak fallback
//! 2. `avm/detail?attomId=` - only when step 1 produced an id
//! 3. `avm/detail?address=` - only when no AVM value was obtained yet
//!
//! An AVM value always beats the assessment value.

use super::{fetch_json, normalize_base_url, UpstreamReply, ValuationProvider};
use crate::valuation::normalizer::{self, ATTOM_ASSESSMENT, ATTOM_AVM};
use crate::valuation::{ProviderKind, ProviderResult, Trace, ValuationAttempt, ValueSource};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

const PROPERTY_DETAIL_PATH: &str = "/property/detail";
const AVM_DETAIL_PATH: &str = "/avm/detail";

/// Header carrying the ATTOM API key
pub const API_KEY_HEADER: &str = "apikey";

pub const STEP_MISSING_KEY: &str = "attom:missing-key";
pub const STEP_PROPERTY_DETAIL: &str = "attom:property/detail";
pub const STEP_AVM_BY_ID: &str = "attom:avm/detail?attomId";
pub const STEP_AVM_BY_ADDRESS: &str = "attom:avm/detail?address";
pub const STEP_ERROR: &str = "attom:error";

/// ATTOM API client
pub struct AttomClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl AttomClient {
    /// Create a client; `api_key = None` makes every lookup short-circuit
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: normalize_base_url(base_url),
            api_key,
        }
    }

    async fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
        api_key: &str,
    ) -> Result<UpstreamReply, reqwest::Error> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "ATTOM request");

        fetch_json(
            self.http
                .get(url)
                .query(query)
                .header(API_KEY_HEADER, api_key)
                .header(ACCEPT, "application/json"),
        )
        .await
    }

    /// Run the three-step protocol; any transport error aborts it
    async fn run_protocol(
        &self,
        address: &str,
        api_key: &str,
        trace: &mut Trace,
    ) -> Result<ProviderResult, reqwest::Error> {
        // Step 1: property detail
        let detail = self
            .get(PROPERTY_DETAIL_PATH, &[("address", address)], api_key)
            .await?;
        let property = normalizer::attom_property(&detail.body);
        let attom_id = property.and_then(normalizer::attom_identifier);
        let assessment_value = property.and_then(|p| ATTOM_ASSESSMENT.extract(p));

        trace.push(
            ValuationAttempt::response(
                STEP_PROPERTY_DETAIL,
                detail.status,
                detail.ok,
                assessment_value,
            )
            .with_identifier(attom_id.clone())
            .with_message(detail.parse_error.clone()),
        );

        let mut avm_value = None;
        let mut avm_status: Option<Value> = None;

        // Step 2: AVM by attomId
        if let Some(id) = attom_id.as_deref() {
            let reply = self.get(AVM_DETAIL_PATH, &[("attomId", id)], api_key).await?;
            avm_status = Some(reply.status_object());
            avm_value = ATTOM_AVM.extract(&reply.body);

            trace.push(
                ValuationAttempt::response(STEP_AVM_BY_ID, reply.status, reply.ok, avm_value)
                    .with_message(reply.parse_error),
            );
        }

        // Step 3: AVM by address fallback
        if avm_value.is_none() {
            let reply = self
                .get(AVM_DETAIL_PATH, &[("address", address)], api_key)
                .await?;
            if avm_status.is_none() {
                avm_status = Some(reply.status_object());
            }
            avm_value = ATTOM_AVM.extract(&reply.body);

            trace.push(
                ValuationAttempt::response(STEP_AVM_BY_ADDRESS, reply.status, reply.ok, avm_value)
                    .with_message(reply.parse_error),
            );
        }

        let (value, source) = match (avm_value, assessment_value) {
            (Some(v), _) => (Some(v), Some(ValueSource::Avm)),
            (None, Some(v)) => (Some(v), Some(ValueSource::Assessment)),
            (None, None) => (None, None),
        };

        Ok(ProviderResult {
            value,
            source,
            identifier: attom_id,
            upstream_status: Some(json!({ "avm": avm_status })),
        })
    }
}

#[async_trait]
impl ValuationProvider for AttomClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Attom
    }

    async fn lookup(&self, address: &str, trace: &mut Trace) -> ProviderResult {
        let Some(api_key) = self.api_key.as_deref() else {
            trace.push(ValuationAttempt::failure(
                STEP_MISSING_KEY,
                "ATTOM API key not configured",
            ));
            return ProviderResult::empty();
        };

        match self.run_protocol(address, api_key, trace).await {
            Ok(result) => {
                info!(
                    value = ?result.value,
                    source = ?result.source,
                    attom_id = ?result.identifier,
                    "ATTOM lookup complete"
                );
                result
            }
            Err(e) => {
                warn!(error = %e, "ATTOM lookup failed");
                trace.push(ValuationAttempt::failure(STEP_ERROR, e.to_string()));
                ProviderResult::empty()
            }
        }
    }
}
