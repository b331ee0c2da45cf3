use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use protelab_core::LabId;

use crate::app::errors;
use crate::context::{LAB_HEADER, LabContext};

/// Attach a [`LabContext`] when the request names an acting lab.
///
/// Requests without the header pass through untouched (read endpoints do not
/// need one); a header that is present but malformed is rejected here.
pub async fn lab_context_middleware(mut req: Request, next: Next) -> Response {
    match extract_lab(req.headers()) {
        Ok(Some(lab_id)) => {
            req.extensions_mut().insert(LabContext::new(lab_id));
        }
        Ok(None) => {}
        Err(message) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_lab_header", message);
        }
    }

    next.run(req).await
}

fn extract_lab(headers: &HeaderMap) -> Result<Option<LabId>, String> {
    let Some(header) = headers.get(LAB_HEADER) else {
        return Ok(None);
    };

    let raw = header
        .to_str()
        .map_err(|_| format!("{LAB_HEADER} must be ASCII"))?;

    raw.parse::<LabId>()
        .map(Some)
        .map_err(|e| format!("{LAB_HEADER}: {e}"))
}
