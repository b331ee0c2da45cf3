//! Subcontract history records.
//!
//! One record per subcontract request. The order only carries its latest
//! subcontract; the history keeps every request ever made against it so a
//! lab can list the work it handed over or received.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use protelab_core::{HistoryId, LabId, Money, OrderId};

use crate::subcontract::SubcontractStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubcontractRecord {
    /// Assigned by the repository on first save.
    pub id: Option<HistoryId>,
    pub order_id: OrderId,
    pub origin_lab: LabId,
    pub destination_lab: LabId,
    pub service_description: String,
    pub notes: Option<String>,
    pub status: SubcontractStatus,
    pub agreed_amount: Option<Money>,
    pub requested_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl SubcontractRecord {
    pub fn requested(
        order_id: OrderId,
        origin_lab: LabId,
        destination_lab: LabId,
        service_description: impl Into<String>,
        notes: Option<String>,
        agreed_amount: Option<Money>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            order_id,
            origin_lab,
            destination_lab,
            service_description: service_description.into(),
            notes,
            status: SubcontractStatus::Requested,
            agreed_amount,
            requested_at: at,
            accepted_at: None,
            completed_at: None,
            updated_at: at,
        }
    }

    /// Mirror the order's subcontract status, stamping the matching timestamp.
    pub fn record_status(&mut self, status: SubcontractStatus, at: DateTime<Utc>) {
        self.status = status;
        self.updated_at = at;
        match status {
            SubcontractStatus::Accepted => self.accepted_at = Some(at),
            SubcontractStatus::Completed => self.completed_at = Some(at),
            _ => {}
        }
    }

    pub fn append_note(&mut self, note: &str) {
        self.notes = Some(match self.notes.take() {
            Some(existing) if !existing.is_empty() => format!("{existing} | {note}"),
            _ => note.to_string(),
        });
    }
}
