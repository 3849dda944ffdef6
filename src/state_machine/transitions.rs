//! Whitelists of legal `(from, to)` pairs for both status machines.

use super::states::{KitchenStatus, OrderStatus};
use crate::error::{PipelineError, Result};

const ORDER_TRANSITIONS: &[(OrderStatus, OrderStatus)] = &[
    (OrderStatus::Placed, OrderStatus::Accepted),
    (OrderStatus::Placed, OrderStatus::Declined),
    (OrderStatus::Accepted, OrderStatus::Cooking),
    (OrderStatus::Cooking, OrderStatus::Ready),
    (OrderStatus::Ready, OrderStatus::PickedUp),
    (OrderStatus::PickedUp, OrderStatus::Delivered),
];

const KITCHEN_TRANSITIONS: &[(KitchenStatus, KitchenStatus)] = &[
    (KitchenStatus::Pending, KitchenStatus::Accepted),
    (KitchenStatus::Pending, KitchenStatus::Declined),
    (KitchenStatus::Accepted, KitchenStatus::Cooking),
    (KitchenStatus::Cooking, KitchenStatus::Ready),
];

/// A status machine backed by a static transition table
pub trait TransitionTable: Copy + PartialEq + std::fmt::Display + 'static {
    fn table() -> &'static [(Self, Self)];

    fn can_transition_to(self, next: Self) -> bool {
        Self::table().iter().any(|&(from, to)| from == self && to == next)
    }

    fn successors(self) -> Vec<Self> {
        Self::table()
            .iter()
            .filter(|(from, _)| *from == self)
            .map(|&(_, to)| to)
            .collect()
    }

    /// Ok when the transition is whitelisted, otherwise a `Conflict`
    fn ensure_transition(self, next: Self) -> Result<()> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(PipelineError::conflict(format!(
                "illegal status transition {self} -> {next}"
            )))
        }
    }
}

impl TransitionTable for OrderStatus {
    fn table() -> &'static [(Self, Self)] {
        ORDER_TRANSITIONS
    }
}

impl TransitionTable for KitchenStatus {
    fn table() -> &'static [(Self, Self)] {
        KITCHEN_TRANSITIONS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_happy_path_is_legal() {
        let path = [
            OrderStatus::Placed,
            OrderStatus::Accepted,
            OrderStatus::Cooking,
            OrderStatus::Ready,
            OrderStatus::PickedUp,
            OrderStatus::Delivered,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_skipping_states_is_a_conflict() {
        let err = OrderStatus::Placed
            .ensure_transition(OrderStatus::Delivered)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Conflict(_)));
        assert!(!KitchenStatus::Pending.can_transition_to(KitchenStatus::Cooking));
    }

    #[test]
    fn test_successors() {
        assert_eq!(
            OrderStatus::Placed.successors(),
            vec![OrderStatus::Accepted, OrderStatus::Declined]
        );
        assert!(KitchenStatus::Ready.successors().is_empty());
    }

    fn any_order_status() -> impl Strategy<Value = OrderStatus> {
        proptest::sample::select(OrderStatus::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn terminal_states_have_no_successors(from in any_order_status(), to in any_order_status()) {
            if from.is_terminal() {
                prop_assert!(!from.can_transition_to(to));
            }
        }

        #[test]
        fn no_self_transitions(status in any_order_status()) {
            prop_assert!(!status.can_transition_to(status));
        }

        #[test]
        fn placed_is_never_reentered(from in any_order_status()) {
            prop_assert!(!from.can_transition_to(OrderStatus::Placed));
        }
    }
}
