//! pvr-vr library - Property valuation resolver
//!
//! Resolves an estimated market value for an address by querying ATTOM
//! and/or RentCast, normalizing their responses and merging them with a
//! fixed priority policy. Exposes the HTTP API for the `pvr-vr` binary
//! and for integration testing.

pub mod api;
pub mod error;
pub mod valuation;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use valuation::ValuationResolver;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Valuation resolver (immutable, shared by all requests)
    pub resolver: Arc<ValuationResolver>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(resolver: ValuationResolver) -> Self {
        Self {
            resolver: Arc::new(resolver),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
///
/// CORS applies to every route; requests are logged via `TraceLayer`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::value_routes())
        .merge(api::health_routes())
        .layer(api::cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
