//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store and service construction
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs and parsing helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs` and the
/// black-box tests).
pub fn build_app(services: Arc<AppServices>) -> Router {
    let api = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn(middleware::lab_context_middleware));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(api)
        .layer(ServiceBuilder::new())
}
