//! Primary order lifecycle.
//!
//! ```text
//! AwaitingApproval -> Approved -> InProduction -> Finalized
//!        \              \              \
//!         +--------------+--------------+--> Cancelled
//! ```

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use protelab_core::{DomainError, DomainResult};

/// Order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    AwaitingApproval,
    Approved,
    InProduction,
    Finalized,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::AwaitingApproval,
        OrderStatus::Approved,
        OrderStatus::InProduction,
        OrderStatus::Finalized,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::AwaitingApproval => "awaiting_approval",
            OrderStatus::Approved => "approved",
            OrderStatus::InProduction => "in_production",
            OrderStatus::Finalized => "finalized",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    /// Accepts `InProduction`, `in_production`, `IN_PRODUCTION`, `in-production`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let squashed: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .flat_map(char::to_lowercase)
            .collect();

        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().replace('_', "") == squashed)
            .ok_or_else(|| DomainError::invalid_argument(format!("unknown order status: {s:?}")))
    }
}

/// Whether an order in `current` may move to `target`.
///
/// Cancellation is reachable from every non-terminal state; everything else
/// advances one step at a time.
pub fn can_transition(current: OrderStatus, target: OrderStatus) -> bool {
    use OrderStatus::*;

    matches!(
        (current, target),
        (AwaitingApproval, Approved)
            | (Approved, InProduction)
            | (InProduction, Finalized)
            | (AwaitingApproval, Cancelled)
            | (Approved, Cancelled)
            | (InProduction, Cancelled)
    )
}

pub fn is_terminal(status: OrderStatus) -> bool {
    matches!(status, OrderStatus::Finalized | OrderStatus::Cancelled)
}

/// Legal targets from `current`, in lifecycle order.
pub fn next_possible(current: OrderStatus) -> Vec<OrderStatus> {
    OrderStatus::ALL
        .into_iter()
        .filter(|target| can_transition(current, *target))
        .collect()
}

pub fn validate_transition(current: OrderStatus, target: OrderStatus) -> DomainResult<()> {
    if can_transition(current, target) {
        return Ok(());
    }

    let message = if is_terminal(current) {
        format!("order is {current} and can no longer change status (attempted {target})")
    } else {
        format!("cannot move order from {current} to {target}")
    };
    Err(DomainError::transition_conflict(message, current, target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn happy_path_is_strictly_sequential() {
        use OrderStatus::*;

        assert!(can_transition(AwaitingApproval, Approved));
        assert!(can_transition(Approved, InProduction));
        assert!(can_transition(InProduction, Finalized));

        assert!(!can_transition(AwaitingApproval, InProduction));
        assert!(!can_transition(AwaitingApproval, Finalized));
        assert!(!can_transition(Approved, Finalized));
        assert!(!can_transition(InProduction, Approved));
        assert!(!can_transition(Approved, AwaitingApproval));
    }

    #[test]
    fn cancellation_only_from_non_terminal_states() {
        use OrderStatus::*;

        for s in [AwaitingApproval, Approved, InProduction] {
            assert!(can_transition(s, Cancelled), "{s} -> cancelled");
        }
        assert!(!can_transition(Finalized, Cancelled));
        assert!(!can_transition(Cancelled, Cancelled));
    }

    #[test]
    fn next_possible_lists_legal_targets() {
        use OrderStatus::*;

        assert_eq!(next_possible(AwaitingApproval), vec![Approved, Cancelled]);
        assert_eq!(next_possible(Approved), vec![InProduction, Cancelled]);
        assert_eq!(next_possible(InProduction), vec![Finalized, Cancelled]);
        assert!(next_possible(Finalized).is_empty());
        assert!(next_possible(Cancelled).is_empty());
    }

    #[test]
    fn validate_reports_current_and_attempted() {
        let err = validate_transition(OrderStatus::AwaitingApproval, OrderStatus::Finalized)
            .unwrap_err();
        match err {
            DomainError::Conflict {
                current, attempted, ..
            } => {
                assert_eq!(current.as_deref(), Some("awaiting_approval"));
                assert_eq!(attempted.as_deref(), Some("finalized"));
            }
            _ => panic!("Expected Conflict"),
        }
    }

    #[test]
    fn parses_common_spellings() {
        assert_eq!("Finalized".parse::<OrderStatus>().unwrap(), OrderStatus::Finalized);
        assert_eq!(
            "awaiting_approval".parse::<OrderStatus>().unwrap(),
            OrderStatus::AwaitingApproval
        );
        assert_eq!(
            "IN_PRODUCTION".parse::<OrderStatus>().unwrap(),
            OrderStatus::InProduction
        );
        assert_eq!(
            "in-production".parse::<OrderStatus>().unwrap(),
            OrderStatus::InProduction
        );
    }

    #[test]
    fn unknown_status_is_invalid_argument() {
        for raw in ["", "shipped", "draft", "approvedd"] {
            assert!(matches!(
                raw.parse::<OrderStatus>(),
                Err(DomainError::InvalidArgument(_))
            ));
        }
    }

    fn any_status() -> impl Strategy<Value = OrderStatus> {
        prop::sample::select(OrderStatus::ALL.to_vec())
    }

    proptest! {
        /// Property: terminal states have no outgoing transitions.
        #[test]
        fn terminal_states_are_dead_ends(from in any_status(), to in any_status()) {
            if is_terminal(from) {
                prop_assert!(!can_transition(from, to));
            }
        }

        /// Property: no self transitions and `next_possible` agrees with `can_transition`.
        #[test]
        fn next_possible_matches_rule(from in any_status(), to in any_status()) {
            prop_assert!(!can_transition(from, from));
            prop_assert_eq!(next_possible(from).contains(&to), can_transition(from, to));
            prop_assert_eq!(validate_transition(from, to).is_ok(), can_transition(from, to));
        }
    }
}
