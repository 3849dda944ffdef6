//! # Status Machines
//!
//! Order and kitchen statuses as tagged enums with explicit transition whitelists.

pub mod states;
pub mod transitions;

pub use states::{KitchenStatus, OrderStatus};
pub use transitions::TransitionTable;
