//! `protelab-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! the error taxonomy shared by every layer, numeric identifiers, the aggregate
//! root contract and the money/percentage value objects.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod value_object;

pub use aggregate::{AggregateRoot, ExpectedVersion};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{DentistId, HistoryId, LabId, OrderId};
pub use money::{Money, Percentage};
pub use value_object::ValueObject;
