//! Upstream AVM provider adapters
//!
//! Each adapter implements [`ValuationProvider`]. Adapters never fail: any
//! transport error or missing credential is recorded in the trace and turned
//! into an empty [`ProviderResult`], so one provider cannot stop another from
//! contributing to a resolution.

pub mod attom;
pub mod rentcast;

pub use attom::AttomClient;
pub use rentcast::RentcastClient;

use super::{ProviderKind, ProviderResult, Trace};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("pvr-vr/", env!("CARGO_PKG_VERSION"));

/// Trace message for upstream bodies that are not JSON
pub const NON_JSON_BODY: &str = "response body is not valid JSON";

/// Upstream valuation provider
///
/// Implementations append every attempt they make to `trace`, in order, and
/// must not panic or return early without recording why.
#[async_trait]
pub trait ValuationProvider: Send + Sync {
    /// Which provider this adapter talks to
    fn kind(&self) -> ProviderKind;

    /// Look up a value for `address` (passed upstream verbatim)
    async fn lookup(&self, address: &str, trace: &mut Trace) -> ProviderResult;
}

/// Build the HTTP client shared by all provider adapters
pub fn build_http_client(timeout: Duration) -> pvr_common::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| pvr_common::Error::Internal(format!("Failed to build HTTP client: {}", e)))
}

/// Decoded upstream response
///
/// Non-JSON bodies decode to an empty object with `parse_error` set, so
/// field extraction simply finds nothing.
#[derive(Debug, Clone)]
pub(crate) struct UpstreamReply {
    pub status: u16,
    pub ok: bool,
    pub body: Value,
    pub parse_error: Option<String>,
}

impl UpstreamReply {
    /// Status object reported by the upstream body, or `{ "code": <http status> }`
    pub fn status_object(&self) -> Value {
        match self.body.get("status") {
            Some(status) if is_truthy(status) => status.clone(),
            _ => json!({ "code": self.status }),
        }
    }
}

/// Send a request and decode its body as JSON
///
/// Only transport failures (connect, timeout, body read) are errors.
pub(crate) async fn fetch_json(
    request: reqwest::RequestBuilder,
) -> Result<UpstreamReply, reqwest::Error> {
    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;

    let (body, parse_error) = match serde_json::from_str::<Value>(&text) {
        Ok(body) => (body, None),
        Err(e) => {
            debug!(status = status.as_u16(), error = %e, "Upstream body is not JSON");
            (Value::Object(Map::new()), Some(NON_JSON_BODY.to_string()))
        }
    };

    Ok(UpstreamReply {
        status: status.as_u16(),
        ok: status.is_success(),
        body,
        parse_error,
    })
}

/// Strip trailing slashes so paths can be appended directly
pub(crate) fn normalize_base_url(base_url: impl Into<String>) -> String {
    base_url.into().trim_end_matches('/').to_string()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
