//! Orders domain module: the order lifecycle and the subcontracting protocol.
//!
//! Business rules only (no IO, no HTTP, no storage). The two status machines
//! are plain functions over `(current, target)` pairs; the [`Order`] aggregate
//! applies them to its two independent status fields.

pub mod history;
pub mod order;
pub mod status;
pub mod subcontract;

pub use history::SubcontractRecord;
pub use order::{NewOrder, Order, OrderCancellation, SubcontractDetails};
pub use status::{OrderStatus, can_transition, is_terminal, next_possible, validate_transition};
pub use subcontract::{
    SubcontractStatus, SubcontractType, can_transition_subcontract, is_active, is_final,
    next_subcontract_statuses, validate_subcontract_transition,
};
