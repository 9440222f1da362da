//! Quantity selector held by a product card before the product is added.

use serde::{Deserialize, Serialize};

/// Local quantity state: starts at 1, never drops below 1, no ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantitySelector {
    value: u32,
}

impl QuantitySelector {
    pub const FLOOR: u32 = 1;

    pub fn new() -> Self {
        Self { value: Self::FLOOR }
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn increment(&mut self) -> u32 {
        self.value = self.value.saturating_add(1);
        self.value
    }

    /// Refuses to go below [`Self::FLOOR`]
    pub fn decrement(&mut self) -> u32 {
        if self.value > Self::FLOOR {
            self.value -= 1;
        }
        self.value
    }

    pub fn reset(&mut self) {
        self.value = Self::FLOOR;
    }

    /// Whether the "-" control should be greyed out
    pub fn at_floor(&self) -> bool {
        self.value == Self::FLOOR
    }
}

impl Default for QuantitySelector {
    fn default() -> Self {
        Self::new()
    }
}
