use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, post, put},
};

use crate::app::dto;
use crate::app::routes::respond;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_order))
        .route("/by-code/:code", get(get_order_by_code))
        .route("/:id", get(get_order))
        .route("/:id/approve", post(approve_order))
        .route("/:id/start-production", post(start_production))
        .route("/:id/finalize", post(finalize_order))
        .route("/:id/cancel", post(cancel_order))
        .route("/:id/transition", post(transition_order))
        .route("/:id/next-statuses", get(next_statuses))
        .route("/:id/charged-amount", put(update_charged_amount))
        .route("/:id/expected-delivery", put(reschedule_delivery))
}

pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateOrderRequest>,
) -> axum::response::Response {
    let new = match body.into_new_order() {
        Ok(v) => v,
        Err(r) => return r,
    };

    respond(StatusCode::CREATED, services.orders.create_order(new))
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match dto::parse_order_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };

    respond(StatusCode::OK, services.orders.get(order_id))
}

pub async fn get_order_by_code(
    Extension(services): Extension<Arc<AppServices>>,
    Path(code): Path<String>,
) -> axum::response::Response {
    respond(StatusCode::OK, services.orders.find_by_code(&code))
}

pub async fn approve_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match dto::parse_order_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };

    respond(StatusCode::OK, services.orders.approve(order_id))
}

pub async fn start_production(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match dto::parse_order_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };

    respond(StatusCode::OK, services.orders.start_production(order_id))
}

pub async fn finalize_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match dto::parse_order_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };

    respond(StatusCode::OK, services.orders.finalize(order_id))
}

pub async fn cancel_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match dto::parse_order_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };

    respond(StatusCode::OK, services.orders.cancel(order_id))
}

pub async fn transition_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::TransitionRequest>,
) -> axum::response::Response {
    let order_id = match dto::parse_order_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };

    respond(
        StatusCode::OK,
        services.orders.transition_to(order_id, &body.status),
    )
}

pub async fn next_statuses(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match dto::parse_order_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };

    respond(
        StatusCode::OK,
        services.orders.possible_next_statuses(order_id),
    )
}

pub async fn update_charged_amount(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::ChargedAmountRequest>,
) -> axum::response::Response {
    let order_id = match dto::parse_order_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };

    respond(
        StatusCode::OK,
        services.orders.update_charged_amount(order_id, body.charged_amount),
    )
}

pub async fn reschedule_delivery(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::ExpectedDeliveryRequest>,
) -> axum::response::Response {
    let order_id = match dto::parse_order_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };

    respond(
        StatusCode::OK,
        services.orders.reschedule_delivery(order_id, body.expected_delivery),
    )
}
