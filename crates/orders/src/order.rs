use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use protelab_core::{
    AggregateRoot, DentistId, DomainError, DomainResult, LabId, Money, OrderId, Percentage,
};
use protelab_labs::ServiceType;

use crate::status::{self, OrderStatus};
use crate::subcontract::{self, SubcontractStatus, SubcontractType};

/// Input for opening a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub dentist_id: DentistId,
    pub lab_id: LabId,
    pub service_type: ServiceType,
    pub charged_amount: Option<Money>,
    pub expected_delivery: Option<NaiveDate>,
    pub details: Option<String>,
}

/// Subcontract linkage carried by an order once a subcontract was requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubcontractDetails {
    /// Cleared when the request is refused or cancelled.
    pub lab_id: Option<LabId>,
    pub percentage: Option<Percentage>,
    pub amount: Option<Money>,
    pub kind: SubcontractType,
    pub reason: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Outcome of [`Order::cancel`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OrderCancellation {
    /// An active subcontract was cancelled together with the order.
    pub cancelled_subcontract: bool,
}

/// Aggregate root: Order.
///
/// Carries two orthogonal state machines: the primary lifecycle
/// ([`OrderStatus`]) and the subcontract protocol ([`SubcontractStatus`]).
/// Each is validated by its own rule set; the only cross-machine rules are
/// [`Order::is_eligible_for_subcontract`], the terminal-order guard, and the
/// cancel/finalize handling of an open subcontract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    code: String,
    dentist_id: DentistId,
    lab_id: LabId,
    service_type: ServiceType,
    details: Option<String>,
    charged_amount: Option<Money>,
    entry_date: NaiveDate,
    expected_delivery: Option<NaiveDate>,
    delivered_on: Option<NaiveDate>,
    cancelled_on: Option<NaiveDate>,
    status: OrderStatus,
    subcontract_status: SubcontractStatus,
    subcontract: Option<SubcontractDetails>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: u64,
}

impl Order {
    /// Open a new order awaiting the lab's approval.
    pub fn create(id: OrderId, new: NewOrder, at: DateTime<Utc>) -> Self {
        Self {
            id,
            code: Self::generate_code(id, at),
            dentist_id: new.dentist_id,
            lab_id: new.lab_id,
            service_type: new.service_type,
            details: new.details,
            charged_amount: new.charged_amount,
            entry_date: at.date_naive(),
            expected_delivery: new.expected_delivery,
            delivered_on: None,
            cancelled_on: None,
            status: OrderStatus::AwaitingApproval,
            subcontract_status: SubcontractStatus::NotSubcontracted,
            subcontract: None,
            created_at: at,
            updated_at: at,
            version: 0,
        }
    }

    /// `P` + creation timestamp + zero-padded id, e.g. `P20261019143000-000042`.
    fn generate_code(id: OrderId, at: DateTime<Utc>) -> String {
        format!("P{}-{:06}", at.format("%Y%m%d%H%M%S"), id.value())
    }

    pub fn order_id(&self) -> OrderId {
        self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn dentist_id(&self) -> DentistId {
        self.dentist_id
    }

    pub fn lab_id(&self) -> LabId {
        self.lab_id
    }

    pub fn service_type(&self) -> ServiceType {
        self.service_type
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    pub fn charged_amount(&self) -> Option<Money> {
        self.charged_amount
    }

    pub fn entry_date(&self) -> NaiveDate {
        self.entry_date
    }

    pub fn expected_delivery(&self) -> Option<NaiveDate> {
        self.expected_delivery
    }

    pub fn delivered_on(&self) -> Option<NaiveDate> {
        self.delivered_on
    }

    pub fn cancelled_on(&self) -> Option<NaiveDate> {
        self.cancelled_on
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn subcontract_status(&self) -> SubcontractStatus {
        self.subcontract_status
    }

    pub fn subcontract(&self) -> Option<&SubcontractDetails> {
        self.subcontract.as_ref()
    }

    /// The lab currently holding the subcontract, if any.
    pub fn subcontracted_lab(&self) -> Option<LabId> {
        self.subcontract.as_ref().and_then(|s| s.lab_id)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_terminal(&self) -> bool {
        status::is_terminal(self.status)
    }

    pub fn has_active_subcontract(&self) -> bool {
        subcontract::is_active(self.subcontract_status)
    }

    pub fn next_statuses(&self) -> Vec<OrderStatus> {
        status::next_possible(self.status)
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
        self.version += 1;
    }

    fn ensure_open(&self, attempted: impl core::fmt::Display) -> DomainResult<()> {
        if self.is_terminal() {
            return Err(DomainError::transition_conflict(
                format!("order {} is {} and can no longer be changed", self.id, self.status),
                self.status,
                attempted,
            ));
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Primary lifecycle
    // ---------------------------------------------------------------------

    fn transition(&mut self, target: OrderStatus, at: DateTime<Utc>) -> DomainResult<()> {
        status::validate_transition(self.status, target)?;
        self.status = target;
        self.touch(at);
        Ok(())
    }

    pub fn approve(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        self.transition(OrderStatus::Approved, at)
    }

    pub fn start_production(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        self.transition(OrderStatus::InProduction, at)
    }

    /// Deliver the order. Refused while a subcontract is still open: the
    /// subcontract must be completed or cancelled first.
    pub fn finalize(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        status::validate_transition(self.status, OrderStatus::Finalized)?;
        if self.has_active_subcontract() {
            return Err(DomainError::transition_conflict(
                format!(
                    "order {} still has an open subcontract ({})",
                    self.id, self.subcontract_status
                ),
                self.subcontract_status,
                OrderStatus::Finalized,
            ));
        }
        self.transition(OrderStatus::Finalized, at)?;
        self.delivered_on = Some(at.date_naive());
        Ok(())
    }

    /// Cancel the order. An open subcontract is cancelled along with it so a
    /// terminal order never carries an active subcontract.
    pub fn cancel(&mut self, at: DateTime<Utc>) -> DomainResult<OrderCancellation> {
        self.transition(OrderStatus::Cancelled, at)?;
        self.cancelled_on = Some(at.date_naive());

        let cancelled_subcontract = self.has_active_subcontract();
        if cancelled_subcontract {
            self.subcontract_status = SubcontractStatus::Cancelled;
            if let Some(details) = self.subcontract.as_mut() {
                details.lab_id = None;
            }
        }
        Ok(OrderCancellation {
            cancelled_subcontract,
        })
    }

    /// Generic form of the named lifecycle operations.
    pub fn transition_to(
        &mut self,
        target: OrderStatus,
        at: DateTime<Utc>,
    ) -> DomainResult<OrderCancellation> {
        status::validate_transition(self.status, target)?;
        let untouched = OrderCancellation {
            cancelled_subcontract: false,
        };
        match target {
            OrderStatus::Approved => self.approve(at).map(|_| untouched),
            OrderStatus::InProduction => self.start_production(at).map(|_| untouched),
            OrderStatus::Finalized => self.finalize(at).map(|_| untouched),
            OrderStatus::Cancelled => self.cancel(at),
            // Unreachable after validation: nothing transitions back to the
            // initial state.
            OrderStatus::AwaitingApproval => Err(DomainError::transition_conflict(
                "orders cannot return to awaiting approval",
                self.status,
                target,
            )),
        }
    }

    pub fn update_charged_amount(&mut self, amount: Money, at: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_open("update charged amount")?;
        let recomputed = match &self.subcontract {
            Some(details) if self.has_active_subcontract() => {
                Some(details.percentage.map(|p| amount.share(p)).transpose()?)
            }
            _ => None,
        };

        self.charged_amount = Some(amount);
        if let (Some(share), Some(details)) = (recomputed, self.subcontract.as_mut()) {
            details.amount = share;
        }
        self.touch(at);
        Ok(())
    }

    pub fn reschedule_delivery(&mut self, date: NaiveDate, at: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_open("reschedule delivery")?;
        if date < self.entry_date {
            return Err(DomainError::invalid_argument(format!(
                "expected delivery {date} is before the entry date {}",
                self.entry_date
            )));
        }
        self.expected_delivery = Some(date);
        self.touch(at);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Subcontracting
    // ---------------------------------------------------------------------

    /// Approved or in production, and no subcontract currently open.
    pub fn is_eligible_for_subcontract(&self) -> bool {
        matches!(self.status, OrderStatus::Approved | OrderStatus::InProduction)
            && (self.subcontract_status == SubcontractStatus::NotSubcontracted
                || subcontract::is_final(self.subcontract_status))
    }

    pub fn request_subcontract(
        &mut self,
        target_lab: LabId,
        percentage: Option<Percentage>,
        kind: SubcontractType,
        reason: Option<String>,
        at: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.ensure_open(SubcontractStatus::Requested)?;
        if !self.is_eligible_for_subcontract() {
            return Err(DomainError::transition_conflict(
                format!(
                    "order {} cannot be subcontracted now (order {}, subcontract {})",
                    self.id, self.status, self.subcontract_status
                ),
                self.subcontract_status,
                SubcontractStatus::Requested,
            ));
        }

        // A finished subcontract leaves room for a fresh one.
        let from = if subcontract::is_final(self.subcontract_status) {
            SubcontractStatus::NotSubcontracted
        } else {
            self.subcontract_status
        };
        subcontract::validate_subcontract_transition(from, SubcontractStatus::Requested)?;

        let amount = self
            .charged_amount
            .zip(percentage)
            .map(|(charged, pct)| charged.share(pct))
            .transpose()?;

        self.subcontract = Some(SubcontractDetails {
            lab_id: Some(target_lab),
            percentage,
            amount,
            kind,
            reason: reason.filter(|r| !r.trim().is_empty()),
            requested_at: at,
            responded_at: None,
            completed_at: None,
        });
        self.subcontract_status = SubcontractStatus::Requested;
        self.touch(at);
        Ok(())
    }

    fn advance_subcontract(
        &mut self,
        target: SubcontractStatus,
        at: DateTime<Utc>,
    ) -> DomainResult<&mut SubcontractDetails> {
        self.ensure_open(target)?;
        subcontract::validate_subcontract_transition(self.subcontract_status, target)?;
        self.subcontract_status = target;
        self.touch(at);
        self.subcontract.as_mut().ok_or_else(|| {
            DomainError::conflict("subcontract status is set but no subcontract details exist")
        })
    }

    pub fn accept_subcontract(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        let details = self.advance_subcontract(SubcontractStatus::Accepted, at)?;
        details.responded_at = Some(at);
        Ok(())
    }

    pub fn refuse_subcontract(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        let details = self.advance_subcontract(SubcontractStatus::Refused, at)?;
        details.responded_at = Some(at);
        details.lab_id = None;
        Ok(())
    }

    pub fn start_subcontract_execution(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        self.advance_subcontract(SubcontractStatus::InProgress, at)?;
        Ok(())
    }

    pub fn complete_subcontract(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        let details = self.advance_subcontract(SubcontractStatus::Completed, at)?;
        details.completed_at = Some(at);
        Ok(())
    }

    pub fn cancel_subcontract(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        if !self.has_active_subcontract() {
            self.ensure_open(SubcontractStatus::Cancelled)?;
            return Err(DomainError::transition_conflict(
                format!(
                    "order {} has no open subcontract to cancel ({})",
                    self.id, self.subcontract_status
                ),
                self.subcontract_status,
                SubcontractStatus::Cancelled,
            ));
        }
        let details = self.advance_subcontract(SubcontractStatus::Cancelled, at)?;
        details.lab_id = None;
        Ok(())
    }

    /// Append an audit note to the subcontract reason (` | `-separated).
    pub fn append_subcontract_note(&mut self, note: &str) -> DomainResult<()> {
        let details = self
            .subcontract
            .as_mut()
            .ok_or_else(|| DomainError::conflict(format!("order {} was never subcontracted", self.id)))?;
        details.reason = Some(match details.reason.take() {
            Some(existing) => format!("{existing} | {note}"),
            None => note.to_string(),
        });
        Ok(())
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
