//! Subcontract endpoints, nested under `/orders/:id/subcontract`.
//!
//! Mutations act on behalf of the lab named in `X-Lab-Id`; the service decides
//! whether that lab is the requester or the executor of the subcontract.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, post},
};

use protelab_core::{LabId, OrderId};

use crate::app::dto;
use crate::app::routes::respond;
use crate::app::services::AppServices;
use crate::context::LabContext;

pub fn router() -> Router {
    Router::new()
        .route(
            "/:id/subcontract",
            get(get_subcontract).post(request_subcontract),
        )
        .route("/:id/subcontract/accept", post(accept_subcontract))
        .route("/:id/subcontract/refuse", post(refuse_subcontract))
        .route("/:id/subcontract/start", post(start_subcontract))
        .route("/:id/subcontract/complete", post(complete_subcontract))
        .route("/:id/subcontract/cancel", post(cancel_subcontract))
}

fn order_and_lab(
    id: &str,
    lab: Option<Extension<LabContext>>,
) -> Result<(OrderId, LabId), axum::response::Response> {
    let order_id = dto::parse_order_id(id)?;
    let lab_id = dto::require_lab(lab)?;
    Ok((order_id, lab_id))
}

pub async fn get_subcontract(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match dto::parse_order_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };

    respond(StatusCode::OK, services.subcontracts.find_by_order(order_id))
}

pub async fn request_subcontract(
    Extension(services): Extension<Arc<AppServices>>,
    lab: Option<Extension<LabContext>>,
    Path(id): Path<String>,
    Json(body): Json<dto::RequestSubcontractRequest>,
) -> axum::response::Response {
    let (order_id, lab_id) = match order_and_lab(&id, lab) {
        Ok(v) => v,
        Err(r) => return r,
    };

    respond(
        StatusCode::CREATED,
        services
            .subcontracts
            .request_subcontract(order_id, lab_id, body.into()),
    )
}

pub async fn accept_subcontract(
    Extension(services): Extension<Arc<AppServices>>,
    lab: Option<Extension<LabContext>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let (order_id, lab_id) = match order_and_lab(&id, lab) {
        Ok(v) => v,
        Err(r) => return r,
    };

    respond(StatusCode::OK, services.subcontracts.accept(order_id, lab_id))
}

pub async fn refuse_subcontract(
    Extension(services): Extension<Arc<AppServices>>,
    lab: Option<Extension<LabContext>>,
    Path(id): Path<String>,
    body: Option<Json<dto::ReasonRequest>>,
) -> axum::response::Response {
    let (order_id, lab_id) = match order_and_lab(&id, lab) {
        Ok(v) => v,
        Err(r) => return r,
    };
    let body = body.map(|Json(b)| b).unwrap_or_default();

    respond(
        StatusCode::OK,
        services
            .subcontracts
            .refuse(order_id, lab_id, body.reason.as_deref()),
    )
}

pub async fn start_subcontract(
    Extension(services): Extension<Arc<AppServices>>,
    lab: Option<Extension<LabContext>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let (order_id, lab_id) = match order_and_lab(&id, lab) {
        Ok(v) => v,
        Err(r) => return r,
    };

    respond(StatusCode::OK, services.subcontracts.start(order_id, lab_id))
}

pub async fn complete_subcontract(
    Extension(services): Extension<Arc<AppServices>>,
    lab: Option<Extension<LabContext>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let (order_id, lab_id) = match order_and_lab(&id, lab) {
        Ok(v) => v,
        Err(r) => return r,
    };

    respond(
        StatusCode::OK,
        services.subcontracts.complete(order_id, lab_id),
    )
}

pub async fn cancel_subcontract(
    Extension(services): Extension<Arc<AppServices>>,
    lab: Option<Extension<LabContext>>,
    Path(id): Path<String>,
    body: Option<Json<dto::ReasonRequest>>,
) -> axum::response::Response {
    let (order_id, lab_id) = match order_and_lab(&id, lab) {
        Ok(v) => v,
        Err(r) => return r,
    };
    let body = body.map(|Json(b)| b).unwrap_or_default();

    respond(
        StatusCode::OK,
        services
            .subcontracts
            .cancel(order_id, lab_id, body.reason.as_deref()),
    )
}
