//! HTTP API handlers for pvr-vr

pub mod health;
pub mod value;

pub use health::health_routes;
pub use value::value_routes;

use axum::http::{header, HeaderName, Method};
use tower_http::cors::{Any, CorsLayer};

/// CORS policy: any origin, GET/OPTIONS only
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-api-key"),
        ])
}
