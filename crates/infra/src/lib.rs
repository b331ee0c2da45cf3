//! Infrastructure and application services for protelab.
//!
//! - [`store`]: repository traits, the transactional [`Store`] and its
//!   in-memory implementation
//! - [`lifecycle`]: the order lifecycle service
//! - [`subcontracting`]: the subcontracting service
//! - [`projections`]: serializable views returned by the services

pub mod clock;
pub mod error;
pub mod lifecycle;
pub mod projections;
pub mod seed;
pub mod store;
pub mod subcontracting;

pub use clock::{FixedTimeSource, SystemTimeSource, TimeSource};
pub use error::{ErrorKind, ServiceError, ServiceResult};
pub use lifecycle::OrderLifecycleService;
pub use store::{InMemoryStore, Store, StoreError, Transaction};
pub use subcontracting::{SubcontractRequest, SubcontractingService};
