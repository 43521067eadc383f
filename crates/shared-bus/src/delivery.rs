//! # Deliveries
//!
//! Records broadcast on the delivery tap for every accepted publish.

use serde::{Deserialize, Serialize};
use shared_types::Message;

/// A message accepted by a destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    /// Destination the message was published to.
    pub destination: String,
    /// Copy of the published message.
    pub message: Message,
}

/// Filter for tap observers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryFilter {
    /// Destinations to include. Empty means all destinations.
    pub destinations: Vec<String>,
}

impl DeliveryFilter {
    /// Create a filter that accepts all deliveries.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific destinations.
    #[must_use]
    pub fn destinations<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            destinations: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Check if a delivery matches this filter.
    #[must_use]
    pub fn matches(&self, delivery: &Delivery) -> bool {
        self.destinations.is_empty() || self.destinations.contains(&delivery.destination)
    }
}
