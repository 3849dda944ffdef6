use serde::{Deserialize, Serialize};
use std::fmt;

/// Order lifecycle states owned by the ingestion service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Initial state when the order is persisted
    Placed,
    /// Restaurant agreed to prepare the order
    Accepted,
    /// Restaurant refused the order
    Declined,
    Cooking,
    Ready,
    /// Courier collected the order
    PickedUp,
    Delivered,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        Self::Placed,
        Self::Accepted,
        Self::Declined,
        Self::Cooking,
        Self::Ready,
        Self::PickedUp,
        Self::Delivered,
    ];

    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Declined | Self::Delivered)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Placed => "PLACED",
            Self::Accepted => "ACCEPTED",
            Self::Declined => "DECLINED",
            Self::Cooking => "COOKING",
            Self::Ready => "READY",
            Self::PickedUp => "PICKED_UP",
            Self::Delivered => "DELIVERED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PLACED" => Ok(Self::Placed),
            "ACCEPTED" => Ok(Self::Accepted),
            "DECLINED" => Ok(Self::Declined),
            "COOKING" => Ok(Self::Cooking),
            "READY" => Ok(Self::Ready),
            "PICKED_UP" => Ok(Self::PickedUp),
            "DELIVERED" => Ok(Self::Delivered),
            _ => Err(format!("Invalid order status: {s}")),
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        Self::Placed
    }
}

/// Kitchen-side fulfillment states, independent from [`OrderStatus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KitchenStatus {
    /// Projected from an ORDER_PLACED event, waiting for staff
    Pending,
    Accepted,
    Declined,
    Cooking,
    Ready,
}

impl KitchenStatus {
    pub const ALL: [KitchenStatus; 5] = [
        Self::Pending,
        Self::Accepted,
        Self::Declined,
        Self::Cooking,
        Self::Ready,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Declined | Self::Ready)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
            Self::Declined => "DECLINED",
            Self::Cooking => "COOKING",
            Self::Ready => "READY",
        }
    }
}

impl fmt::Display for KitchenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for KitchenStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "ACCEPTED" => Ok(Self::Accepted),
            "DECLINED" => Ok(Self::Declined),
            "COOKING" => Ok(Self::Cooking),
            "READY" => Ok(Self::Ready),
            _ => Err(format!("Invalid kitchen status: {s}")),
        }
    }
}

impl Default for KitchenStatus {
    fn default() -> Self {
        Self::Pending
    }
}
