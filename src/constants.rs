//! System-wide names shared by the producer and every consumer of the order event stream.

/// Topic carrying every order lifecycle event
pub const ORDER_EVENTS_TOPIC: &str = "order-events";

/// Consumer group used by the kitchen projection
pub const KITCHEN_CONSUMER_GROUP: &str = "kitchen-group";

/// Suffix appended to a topic name to form its dead-letter topic
pub const DEAD_LETTER_SUFFIX: &str = ".dlq";

/// Restaurant name stored when the client omits one
pub const UNKNOWN_RESTAURANT_NAME: &str = "Unknown";

pub mod services {
    pub const ORDER_SERVICE: &str = "order-service";
    pub const KITCHEN_SERVICE: &str = "kitchen-service";
}

/// Name of the circuit breaker guarding catalog lookups
pub const MENU_SERVICE_BREAKER: &str = "menu_service";

pub fn dead_letter_topic(topic: &str) -> String {
    format!("{topic}{DEAD_LETTER_SUFFIX}")
}
