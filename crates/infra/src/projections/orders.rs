use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use protelab_core::{AggregateRoot, DentistId, LabId, Money, OrderId};
use protelab_labs::ServiceType;
use protelab_orders::{Order, OrderStatus, SubcontractStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderView {
    pub id: OrderId,
    pub code: String,
    pub dentist_id: DentistId,
    pub lab_id: LabId,
    pub service_type: ServiceType,
    pub status: OrderStatus,
    pub next_statuses: Vec<OrderStatus>,
    pub details: Option<String>,
    pub charged_amount: Option<Money>,
    pub entry_date: NaiveDate,
    pub expected_delivery: Option<NaiveDate>,
    pub delivered_on: Option<NaiveDate>,
    pub cancelled_on: Option<NaiveDate>,
    pub subcontract_status: SubcontractStatus,
    pub subcontracted_lab_id: Option<LabId>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.order_id(),
            code: order.code().to_string(),
            dentist_id: order.dentist_id(),
            lab_id: order.lab_id(),
            service_type: order.service_type(),
            status: order.status(),
            next_statuses: order.next_statuses(),
            details: order.details().map(str::to_string),
            charged_amount: order.charged_amount(),
            entry_date: order.entry_date(),
            expected_delivery: order.expected_delivery(),
            delivered_on: order.delivered_on(),
            cancelled_on: order.cancelled_on(),
            subcontract_status: order.subcontract_status(),
            subcontracted_lab_id: order.subcontracted_lab(),
            version: order.version(),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
        }
    }
}
