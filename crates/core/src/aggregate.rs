//! Aggregate root trait and optimistic concurrency expectation.

use crate::error::{DomainError, DomainResult};

/// Aggregate root marker + minimal interface.
///
/// Aggregates are mutated in memory by their own operations and then handed
/// back to a repository. The version lets the repository reject a write that
/// was computed from a stale read.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Monotonically increasing version of the aggregate's state.
    ///
    /// Incremented once per successful mutating operation.
    fn version(&self) -> u64;
}

/// Optimistic concurrency expectation for an aggregate.
///
/// `Exact(0)` on a row that does not exist yet is a first insert.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Require the stored aggregate to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn check(self, actual: u64) -> DomainResult<()> {
        let ExpectedVersion::Exact(expected) = self;
        if expected == actual {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}
