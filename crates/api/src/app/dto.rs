use axum::http::StatusCode;
use axum::{Extension, response::Response};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use protelab_core::{DentistId, LabId, Money, OrderId};
use protelab_infra::{ServiceError, SubcontractRequest};
use protelab_labs::ServiceType;
use protelab_orders::{NewOrder, SubcontractType};

use crate::app::errors;
use crate::context::LabContext;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub dentist_id: DentistId,
    pub lab_id: LabId,
    /// Free-form service name, e.g. `"Zirconia"` or `"fixed-bridge"`.
    pub service_type: String,
    pub charged_amount: Option<Decimal>,
    pub expected_delivery: Option<NaiveDate>,
    pub details: Option<String>,
}

impl CreateOrderRequest {
    pub fn into_new_order(self) -> Result<NewOrder, Response> {
        let service_type = parse_service_type(&self.service_type)?;
        let charged_amount = self
            .charged_amount
            .map(Money::new)
            .transpose()
            .map_err(|e| errors::service_error_to_response(e.into()))?;

        Ok(NewOrder {
            dentist_id: self.dentist_id,
            lab_id: self.lab_id,
            service_type,
            charged_amount,
            expected_delivery: self.expected_delivery,
            details: self.details.filter(|d| !d.trim().is_empty()),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct ChargedAmountRequest {
    pub charged_amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct ExpectedDeliveryRequest {
    pub expected_delivery: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct RequestSubcontractRequest {
    pub target_lab: LabId,
    pub percentage: Option<Decimal>,
    /// `complete`, `partial`, `specialty`, `capacity` or `urgency`; anything
    /// else is treated as `partial`.
    pub kind: Option<String>,
    pub reason: Option<String>,
    pub service_description: Option<String>,
}

impl From<RequestSubcontractRequest> for SubcontractRequest {
    fn from(value: RequestSubcontractRequest) -> Self {
        Self {
            target_lab: value.target_lab,
            percentage: value.percentage,
            kind: SubcontractType::parse_or_default(value.kind.as_deref()),
            reason: value.reason,
            service_description: value.service_description,
        }
    }
}

/// Body of `refuse` and `cancel`; both accept an optional reason.
#[derive(Debug, Default, Deserialize)]
pub struct ReasonRequest {
    pub reason: Option<String>,
}

// -------------------------
// Query DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct EligibleLabsQuery {
    pub service_type: String,
    pub exclude: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ServiceTypeQuery {
    pub service_type: String,
}

// -------------------------
// Parsing helpers
// -------------------------

pub fn parse_order_id(raw: &str) -> Result<OrderId, Response> {
    raw.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id"))
}

pub fn parse_lab_id(raw: &str) -> Result<LabId, Response> {
    raw.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid lab id"))
}

pub fn parse_service_type(raw: &str) -> Result<ServiceType, Response> {
    raw.parse::<ServiceType>()
        .map_err(|e| errors::service_error_to_response(ServiceError::from(e)))
}

/// The acting lab, which every subcontract mutation needs.
pub fn require_lab(ctx: Option<Extension<LabContext>>) -> Result<LabId, Response> {
    ctx.map(|Extension(ctx)| ctx.lab_id()).ok_or_else(|| {
        errors::json_error(
            StatusCode::BAD_REQUEST,
            "missing_lab",
            "X-Lab-Id header is required",
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_parses_service_type_leniently() {
        let body: CreateOrderRequest = serde_json::from_value(serde_json::json!({
            "dentist_id": 5,
            "lab_id": 1,
            "service_type": "Fixed Bridge",
            "charged_amount": "250.5",
            "details": "  ",
        }))
        .unwrap();

        let new = body.into_new_order().unwrap();
        assert_eq!(new.service_type, ServiceType::FixedBridge);
        assert_eq!(new.charged_amount.unwrap().to_string(), "250.50");
        assert_eq!(new.details, None);
    }

    #[test]
    fn negative_charged_amount_is_bad_request() {
        let body: CreateOrderRequest = serde_json::from_value(serde_json::json!({
            "dentist_id": 5,
            "lab_id": 1,
            "service_type": "crown",
            "charged_amount": "-1",
        }))
        .unwrap();

        let response = body.into_new_order().unwrap_err();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn non_positive_body_ids_are_rejected() {
        let err = serde_json::from_value::<CreateOrderRequest>(serde_json::json!({
            "dentist_id": 0,
            "lab_id": 1,
            "service_type": "crown",
        }))
        .unwrap_err();
        assert!(err.to_string().contains("DentistId"));

        assert!(serde_json::from_value::<CreateOrderRequest>(serde_json::json!({
            "dentist_id": 5,
            "lab_id": -1,
            "service_type": "crown",
        }))
        .is_err());

        assert!(serde_json::from_value::<RequestSubcontractRequest>(serde_json::json!({
            "target_lab": 0,
            "percentage": 40,
        }))
        .is_err());
    }

    #[test]
    fn unknown_subcontract_kind_defaults_to_partial() {
        let body: RequestSubcontractRequest = serde_json::from_value(serde_json::json!({
            "target_lab": 3,
            "percentage": 40,
            "kind": "whatever",
        }))
        .unwrap();

        let request = SubcontractRequest::from(body);
        assert_eq!(request.kind, SubcontractType::Partial);
        assert_eq!(request.percentage, Some(Decimal::from(40)));
    }

    #[test]
    fn missing_lab_context_is_rejected() {
        assert_eq!(
            require_lab(None).unwrap_err().status(),
            StatusCode::BAD_REQUEST
        );
        let ctx = Extension(LabContext::new(LabId::new(2)));
        assert_eq!(require_lab(Some(ctx)).unwrap(), LabId::new(2));
    }
}
