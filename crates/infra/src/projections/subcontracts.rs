use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use protelab_core::{HistoryId, Money, OrderId, Percentage};
use protelab_labs::{Lab, LabSummary, ServiceType};
use protelab_orders::{
    Order, OrderStatus, SubcontractDetails, SubcontractRecord, SubcontractStatus, SubcontractType,
};

/// Current subcontract of one order, seen from either lab.
///
/// `subcontracted_lab` still names the destination lab after a refusal or
/// cancellation (taken from the history record), even though the order no
/// longer references it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubcontractView {
    pub order_id: OrderId,
    pub order_code: String,
    pub order_status: OrderStatus,
    pub service_type: ServiceType,
    pub status: SubcontractStatus,
    pub kind: SubcontractType,
    pub percentage: Option<Percentage>,
    pub charged_amount: Option<Money>,
    pub subcontracted_amount: Option<Money>,
    pub reason: Option<String>,
    pub requesting_lab: LabSummary,
    pub subcontracted_lab: Option<LabSummary>,
    pub requested_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub history_id: Option<HistoryId>,
    pub service_description: Option<String>,
    pub notes: Option<String>,
}

impl SubcontractView {
    pub fn new(
        order: &Order,
        details: &SubcontractDetails,
        requesting_lab: &Lab,
        subcontracted_lab: Option<&Lab>,
        record: Option<&SubcontractRecord>,
    ) -> Self {
        Self {
            order_id: order.order_id(),
            order_code: order.code().to_string(),
            order_status: order.status(),
            service_type: order.service_type(),
            status: order.subcontract_status(),
            kind: details.kind,
            percentage: details.percentage,
            charged_amount: order.charged_amount(),
            subcontracted_amount: details.amount,
            reason: details.reason.clone(),
            requesting_lab: requesting_lab.summary(),
            subcontracted_lab: subcontracted_lab.map(Lab::summary),
            requested_at: details.requested_at,
            responded_at: details.responded_at,
            completed_at: details.completed_at,
            history_id: record.and_then(|r| r.id),
            service_description: record.map(|r| r.service_description.clone()),
            notes: record.and_then(|r| r.notes.clone()),
        }
    }
}
