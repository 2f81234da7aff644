//! RentCast AVM client
//!
//! Single call to `avm/value?address=`. The response layout differs between
//! API versions, so the value is located via [`RENTCAST_AVM`] rules.

use super::{fetch_json, normalize_base_url, ValuationProvider};
use crate::valuation::normalizer::RENTCAST_AVM;
use crate::valuation::{ProviderKind, ProviderResult, Trace, ValuationAttempt, ValueSource};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde_json::json;
use tracing::{debug, info, warn};

const AVM_VALUE_PATH: &str = "/avm/value";

/// Header carrying the RentCast API key
pub const API_KEY_HEADER: &str = "X-Api-Key";

pub const STEP_MISSING_KEY: &str = "rentcast:missing-key";
pub const STEP_AVM_VALUE: &str = "rentcast:avm/value";
pub const STEP_ERROR: &str = "rentcast:error";

/// RentCast API client
pub struct RentcastClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl RentcastClient {
    /// Create a client; `api_key = None` makes every lookup short-circuit
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: normalize_base_url(base_url),
            api_key,
        }
    }

    async fn fetch_value(
        &self,
        address: &str,
        api_key: &str,
        trace: &mut Trace,
    ) -> Result<ProviderResult, reqwest::Error> {
        let url = format!("{}{}", self.base_url, AVM_VALUE_PATH);
        debug!(%url, "RentCast request");

        let reply = fetch_json(
            self.http
                .get(url)
                .query(&[("address", address)])
                .header(API_KEY_HEADER, api_key)
                .header(ACCEPT, "application/json"),
        )
        .await?;

        let value = RENTCAST_AVM.extract(&reply.body);

        trace.push(
            ValuationAttempt::response(STEP_AVM_VALUE, reply.status, reply.ok, value)
                .with_message(reply.parse_error),
        );

        Ok(ProviderResult {
            value,
            source: value.map(|_| ValueSource::Avm),
            identifier: None,
            upstream_status: Some(json!({ "code": reply.status, "ok": reply.ok })),
        })
    }
}

#[async_trait]
impl ValuationProvider for RentcastClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Rentcast
    }

    async fn lookup(&self, address: &str, trace: &mut Trace) -> ProviderResult {
        let Some(api_key) = self.api_key.as_deref() else {
            trace.push(ValuationAttempt::failure(
                STEP_MISSING_KEY,
                "RentCast API key not configured",
            ));
            return ProviderResult::empty();
        };

        match self.fetch_value(address, api_key, trace).await {
            Ok(result) => {
                info!(value = ?result.value, "RentCast lookup complete");
                result
            }
            Err(e) => {
                warn!(error = %e, "RentCast lookup failed");
                trace.push(ValuationAttempt::failure(STEP_ERROR, e.to_string()));
                ProviderResult::empty()
            }
        }
    }
}
