//! Order status and the transition rules between statuses.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// Statuses whose order totals count toward reported revenue.
    pub const REVENUE_RECOGNIZED: [OrderStatus; 2] =
        [OrderStatus::Confirmed, OrderStatus::Delivered];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_revenue_recognized(&self) -> bool {
        Self::REVENUE_RECOGNIZED.contains(self)
    }

    /// Plans an administrative status change.
    ///
    /// Every pair is allowed, including re-entering the current status. Stock
    /// is handed back only when the order moves into `cancelled` from any
    /// other status, so a repeated cancellation never restocks twice.
    pub fn transition_to(self, to: OrderStatus) -> Transition {
        Transition {
            from: self,
            to,
            restock: to == OrderStatus::Cancelled && self != OrderStatus::Cancelled,
        }
    }

    /// Customers may only withdraw orders nobody has acted on yet.
    pub fn is_self_cancellable(&self) -> bool {
        *self == OrderStatus::Pending
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown order status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Side effects implied by moving an order from one status to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub restock: bool,
}

impl Transition {
    pub fn default_note(&self) -> String {
        format!("Status changed from {} to {}", self.from, self.to)
    }
}
