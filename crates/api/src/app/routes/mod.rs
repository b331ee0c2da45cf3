use axum::{Json, Router, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use protelab_infra::ServiceResult;

use crate::app::errors;

pub mod labs;
pub mod orders;
pub mod subcontracts;
pub mod system;

/// Router for all order and lab endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/orders", orders::router().merge(subcontracts::router()))
        .nest("/labs", labs::router())
}

/// Serialize a service result, mapping failures through
/// [`errors::service_error_to_response`].
pub(crate) fn respond<T: Serialize>(status: StatusCode, result: ServiceResult<T>) -> axum::response::Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
