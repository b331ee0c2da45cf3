//! Repository traits and the transactional store boundary.
//!
//! Services never touch a repository directly. They open a unit of work
//! through [`Store::transaction`] (or [`Store::read`] for queries) and reach
//! each table through the [`Transaction`] accessors. Everything written inside
//! one transaction is committed together or not at all.
//!
//! ## Concurrency
//!
//! A transaction holds the store exclusively for its whole
//! load → validate → mutate → save sequence, so a second writer always observes
//! the first writer's result. `OrderRepository::save` additionally checks the
//! aggregate version against [`ExpectedVersion`], which guards callers that
//! load in one unit of work and save in another.

mod memory;

use std::sync::Arc;

use thiserror::Error;

use protelab_core::{ExpectedVersion, LabId, OrderId};
use protelab_labs::{Lab, ServiceOffering, ServiceType};
use protelab_orders::{Order, SubcontractRecord};

pub use memory::InMemoryStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage failure.
///
/// Infrastructure errors only; domain rule violations are `DomainError`s.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A previous writer panicked while holding the store.
    #[error("store lock poisoned")]
    Poisoned,

    /// Optimistic concurrency check failed (stale aggregate version).
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    /// An update targeted a row that does not exist.
    #[error("missing row: {0}")]
    MissingRow(String),
}

pub trait OrderRepository {
    fn find_by_id(&self, id: OrderId) -> StoreResult<Option<Order>>;

    fn find_by_code(&self, code: &str) -> StoreResult<Option<Order>>;

    /// Orders where `lab` is the primary lab or the current subcontractor,
    /// ordered by id.
    fn find_by_lab(&self, lab: LabId) -> StoreResult<Vec<Order>>;

    /// Reserve the next order id.
    fn next_order_id(&mut self) -> StoreResult<OrderId>;

    /// Insert or replace an order.
    ///
    /// `expected` is compared against the version currently stored, i.e. the
    /// version the caller loaded before mutating.
    fn save(&mut self, order: &Order, expected: ExpectedVersion) -> StoreResult<()>;
}

pub trait LabRepository {
    fn find_by_id(&self, id: LabId) -> StoreResult<Option<Lab>>;

    fn insert_lab(&mut self, lab: Lab) -> StoreResult<()>;
}

pub trait OfferingRepository {
    fn find_by_lab_and_service_type(
        &self,
        lab: LabId,
        service_type: ServiceType,
    ) -> StoreResult<Option<ServiceOffering>>;

    /// Active offerings for `service_type`, ordered by lab id.
    fn find_active_offerings_by_service_type(
        &self,
        service_type: ServiceType,
    ) -> StoreResult<Vec<ServiceOffering>>;

    /// At most one offering per `(lab, service_type)`; a second write replaces the first.
    fn upsert_offering(&mut self, offering: ServiceOffering) -> StoreResult<()>;
}

pub trait SubcontractHistoryRepository {
    /// Insert (when `record.id` is `None`) or update a record; returns the
    /// record as stored, id assigned.
    fn save(&mut self, record: SubcontractRecord) -> StoreResult<SubcontractRecord>;

    /// Most recent record for an order (highest id).
    fn find_latest_by_order_id(&self, order_id: OrderId) -> StoreResult<Option<SubcontractRecord>>;

    /// Records for any of `order_ids`, ordered by id.
    fn find_by_order_ids(&self, order_ids: &[OrderId]) -> StoreResult<Vec<SubcontractRecord>>;
}

/// One unit of work over all tables.
pub trait Transaction {
    fn orders(&self) -> &dyn OrderRepository;
    fn orders_mut(&mut self) -> &mut dyn OrderRepository;

    fn labs(&self) -> &dyn LabRepository;
    fn labs_mut(&mut self) -> &mut dyn LabRepository;

    fn offerings(&self) -> &dyn OfferingRepository;
    fn offerings_mut(&mut self) -> &mut dyn OfferingRepository;

    fn history(&self) -> &dyn SubcontractHistoryRepository;
    fn history_mut(&mut self) -> &mut dyn SubcontractHistoryRepository;
}

/// Transactional store.
pub trait Store: Send + Sync {
    /// Run `f` against a consistent snapshot. Nothing `f` does is persisted.
    fn read<T, E>(&self, f: impl FnOnce(&dyn Transaction) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>;

    /// Run `f` exclusively; commit its writes if it returns `Ok`, discard
    /// them all if it returns `Err`.
    fn transaction<T, E>(
        &self,
        f: impl FnOnce(&mut dyn Transaction) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>;
}

impl<S> Store for Arc<S>
where
    S: Store,
{
    fn read<T, E>(&self, f: impl FnOnce(&dyn Transaction) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        (**self).read(f)
    }

    fn transaction<T, E>(
        &self,
        f: impl FnOnce(&mut dyn Transaction) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        (**self).transaction(f)
    }
}
