//! Read models returned by the services.
//!
//! Views are flat, serializable snapshots built from the aggregate and the
//! entities it references by id. They carry no behaviour and can be rebuilt
//! from the store at any time.

pub mod labs;
pub mod orders;
pub mod subcontracts;

pub use labs::EligibleLabView;
pub use orders::OrderView;
pub use subcontracts::SubcontractView;
