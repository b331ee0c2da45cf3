//! Subcontracting protocol nested inside an order.
//!
//! ```text
//! NotSubcontracted -> Requested -> Accepted -> InProgress -> Completed
//!                        |  \          |            |
//!                        |   Refused   |            |
//!                        +-------------+------------+--> Cancelled
//! ```

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use protelab_core::{DomainError, DomainResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubcontractStatus {
    NotSubcontracted,
    Requested,
    Accepted,
    InProgress,
    Completed,
    Refused,
    Cancelled,
}

impl SubcontractStatus {
    pub const ALL: [SubcontractStatus; 7] = [
        SubcontractStatus::NotSubcontracted,
        SubcontractStatus::Requested,
        SubcontractStatus::Accepted,
        SubcontractStatus::InProgress,
        SubcontractStatus::Completed,
        SubcontractStatus::Refused,
        SubcontractStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubcontractStatus::NotSubcontracted => "not_subcontracted",
            SubcontractStatus::Requested => "requested",
            SubcontractStatus::Accepted => "accepted",
            SubcontractStatus::InProgress => "in_progress",
            SubcontractStatus::Completed => "completed",
            SubcontractStatus::Refused => "refused",
            SubcontractStatus::Cancelled => "cancelled",
        }
    }
}

impl core::fmt::Display for SubcontractStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn can_transition_subcontract(current: SubcontractStatus, target: SubcontractStatus) -> bool {
    use SubcontractStatus::*;

    matches!(
        (current, target),
        (NotSubcontracted, Requested)
            | (Requested, Accepted)
            | (Requested, Refused)
            | (Requested, Cancelled)
            | (Accepted, InProgress)
            | (Accepted, Cancelled)
            | (InProgress, Completed)
            | (InProgress, Cancelled)
    )
}

/// A request that is still open: someone is expected to act on it.
pub fn is_active(status: SubcontractStatus) -> bool {
    matches!(
        status,
        SubcontractStatus::Requested | SubcontractStatus::Accepted | SubcontractStatus::InProgress
    )
}

pub fn is_final(status: SubcontractStatus) -> bool {
    matches!(
        status,
        SubcontractStatus::Completed | SubcontractStatus::Refused | SubcontractStatus::Cancelled
    )
}

pub fn next_subcontract_statuses(current: SubcontractStatus) -> Vec<SubcontractStatus> {
    SubcontractStatus::ALL
        .into_iter()
        .filter(|target| can_transition_subcontract(current, *target))
        .collect()
}

pub fn validate_subcontract_transition(
    current: SubcontractStatus,
    target: SubcontractStatus,
) -> DomainResult<()> {
    if can_transition_subcontract(current, target) {
        Ok(())
    } else {
        Err(DomainError::transition_conflict(
            format!("subcontract cannot move from {current} to {target}"),
            current,
            target,
        ))
    }
}

/// Why a lab hands work over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubcontractType {
    /// The whole job goes to the other lab.
    Complete,
    #[default]
    Partial,
    /// The primary lab lacks the specialty.
    Specialty,
    /// The primary lab is over capacity.
    Capacity,
    /// The deadline cannot be met in-house.
    Urgency,
}

impl SubcontractType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubcontractType::Complete => "complete",
            SubcontractType::Partial => "partial",
            SubcontractType::Specialty => "specialty",
            SubcontractType::Capacity => "capacity",
            SubcontractType::Urgency => "urgency",
        }
    }

    /// Missing or unrecognised input falls back to [`SubcontractType::Partial`].
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        raw.map(|s| s.parse().unwrap_or_default()).unwrap_or_default()
    }
}

impl core::fmt::Display for SubcontractType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubcontractType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "complete" => Ok(SubcontractType::Complete),
            "partial" => Ok(SubcontractType::Partial),
            "specialty" => Ok(SubcontractType::Specialty),
            "capacity" => Ok(SubcontractType::Capacity),
            "urgency" => Ok(SubcontractType::Urgency),
            other => Err(DomainError::invalid_argument(format!(
                "unknown subcontract type: {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn protocol_edges() {
        use SubcontractStatus::*;

        assert_eq!(next_subcontract_statuses(NotSubcontracted), vec![Requested]);
        assert_eq!(
            next_subcontract_statuses(Requested),
            vec![Accepted, Refused, Cancelled]
        );
        assert_eq!(next_subcontract_statuses(Accepted), vec![InProgress, Cancelled]);
        assert_eq!(next_subcontract_statuses(InProgress), vec![Completed, Cancelled]);
        for s in [Completed, Refused, Cancelled] {
            assert!(next_subcontract_statuses(s).is_empty());
        }
    }

    #[test]
    fn cannot_skip_acceptance() {
        use SubcontractStatus::*;

        assert!(!can_transition_subcontract(Requested, InProgress));
        assert!(!can_transition_subcontract(Requested, Completed));
        assert!(!can_transition_subcontract(Accepted, Completed));
        assert!(!can_transition_subcontract(Accepted, Refused));
        assert!(!can_transition_subcontract(NotSubcontracted, Cancelled));
        assert!(validate_subcontract_transition(Accepted, Refused)
            .unwrap_err()
            .is_conflict());
    }

    #[test]
    fn active_and_final_partition_the_requested_states() {
        use SubcontractStatus::*;

        assert!(!is_active(NotSubcontracted) && !is_final(NotSubcontracted));
        for s in [Requested, Accepted, InProgress] {
            assert!(is_active(s) && !is_final(s));
        }
        for s in [Completed, Refused, Cancelled] {
            assert!(is_final(s) && !is_active(s));
        }
    }

    #[test]
    fn subcontract_type_defaults_to_partial() {
        assert_eq!(SubcontractType::parse_or_default(None), SubcontractType::Partial);
        assert_eq!(
            SubcontractType::parse_or_default(Some("whatever")),
            SubcontractType::Partial
        );
        assert_eq!(
            SubcontractType::parse_or_default(Some(" URGENCY ")),
            SubcontractType::Urgency
        );
    }

    fn any_status() -> impl Strategy<Value = SubcontractStatus> {
        prop::sample::select(SubcontractStatus::ALL.to_vec())
    }

    proptest! {
        /// Property: final states never move; only active states (and the
        /// initial one) have outgoing edges.
        #[test]
        fn final_states_are_dead_ends(from in any_status(), to in any_status()) {
            if is_final(from) {
                prop_assert!(!can_transition_subcontract(from, to));
            }
            if can_transition_subcontract(from, to) {
                prop_assert!(is_active(from) || from == SubcontractStatus::NotSubcontracted);
            }
        }

        /// Property: every active state can be cancelled.
        #[test]
        fn active_states_are_cancellable(from in any_status()) {
            prop_assert_eq!(
                is_active(from),
                can_transition_subcontract(from, SubcontractStatus::Cancelled)
            );
        }
    }
}
