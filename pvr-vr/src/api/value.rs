//! Valuation endpoint
//!
//! `GET /api/value?address=...&provider=attom|rentcast|auto`
//!
//! `mode` is accepted as an alias for `provider`. A repeated parameter is
//! joined with commas rather than rejected. Provider failures never produce
//! an error status; they are reported inside the envelope's trace.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::debug;

use crate::error::{ApiError, ApiResult, ADDRESS_REQUIRED};
use crate::valuation::{ProviderMode, ResolutionResult};
use crate::AppState;

/// Query parameters for a valuation request
#[derive(Debug, Default, PartialEq)]
pub struct ValueQuery {
    /// Property address, passed upstream verbatim (after trimming)
    pub address: Option<String>,

    /// Requested provider mode (default: auto)
    pub provider: Option<String>,

    /// Alias for `provider`
    pub mode: Option<String>,
}

impl ValueQuery {
    /// Collect known parameters from decoded query pairs
    ///
    /// Unknown keys are ignored; repeated keys are joined with `,`.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = ValueQuery::default();

        for (key, value) in pairs {
            let slot = match key.as_str() {
                "address" => &mut query.address,
                "provider" => &mut query.provider,
                "mode" => &mut query.mode,
                _ => continue,
            };

            match slot {
                Some(existing) => {
                    existing.push(',');
                    existing.push_str(&value);
                }
                None => *slot = Some(value),
            }
        }

        query
    }
}

/// GET /api/value
pub async fn get_value(
    State(state): State<AppState>,
    pairs: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> ApiResult<Json<ResolutionResult>> {
    let Query(pairs) = pairs.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let query = ValueQuery::from_pairs(pairs);

    let address = query.address.as_deref().map(str::trim).unwrap_or_default();
    if address.is_empty() {
        return Err(ApiError::BadRequest(ADDRESS_REQUIRED.to_string()));
    }

    let mode = ProviderMode::from_param(query.provider.as_deref().or(query.mode.as_deref()));
    debug!(%mode, "Valuation requested");

    let result = state.resolver.resolve(address, mode).await?;
    Ok(Json(result))
}

/// OPTIONS /api/value (non-preflight; preflights are answered by the CORS layer)
async fn options_ok() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// Build valuation routes
pub fn value_routes() -> Router<AppState> {
    Router::new().route(
        "/api/value",
        get(get_value)
            // GET handlers also answer HEAD unless HEAD is routed explicitly
            .head(method_not_allowed)
            .options(options_ok)
            .fallback(method_not_allowed),
    )
}
