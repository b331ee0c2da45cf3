//! Labs domain module: prosthetics labs and the services they offer.
//!
//! Labs are read-only from the order core's perspective; this crate only
//! describes them and answers "may this offering be subcontracted to?".

pub mod lab;
pub mod offering;

pub use lab::{Lab, LabSummary};
pub use offering::{ExecutionPolicy, ServiceOffering, ServiceType};
