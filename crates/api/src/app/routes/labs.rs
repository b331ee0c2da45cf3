use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::get,
};

use crate::app::dto;
use crate::app::routes::respond;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/eligible", get(list_eligible_labs))
        .route("/:id/subcontracts", get(list_lab_subcontracts))
        .route(
            "/:id/preferred-subcontractor",
            get(preferred_subcontractor),
        )
}

pub async fn list_eligible_labs(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::EligibleLabsQuery>,
) -> axum::response::Response {
    let service_type = match dto::parse_service_type(&query.service_type) {
        Ok(v) => v,
        Err(r) => return r,
    };
    let exclude = match query.exclude.as_deref().map(dto::parse_lab_id).transpose() {
        Ok(v) => v,
        Err(r) => return r,
    };

    respond(
        StatusCode::OK,
        services.subcontracts.list_eligible_labs(service_type, exclude),
    )
}

pub async fn list_lab_subcontracts(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let lab_id = match dto::parse_lab_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };

    respond(StatusCode::OK, services.subcontracts.list_for_lab(lab_id))
}

/// `null` body when no lab can take the work.
pub async fn preferred_subcontractor(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Query(query): Query<dto::ServiceTypeQuery>,
) -> axum::response::Response {
    let lab_id = match dto::parse_lab_id(&id) {
        Ok(v) => v,
        Err(r) => return r,
    };
    let service_type = match dto::parse_service_type(&query.service_type) {
        Ok(v) => v,
        Err(r) => return r,
    };

    respond(
        StatusCode::OK,
        services
            .subcontracts
            .suggest_preferred_subcontractor(lab_id, service_type),
    )
}
