//! # Capacity Policy
//!
//! How many bookings a single slot may hold.
//!
//! ```text
//! allow_multiple = false             → effective max = 1
//! allow_multiple = true, max = N     → effective max = N
//! ```
//!
//! Lowering `max_per_slot` never evicts anything: reservations already above
//! the new limit stay, and the slot simply reports unavailable until enough
//! of them are cancelled.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::validation::validate_max_per_slot;

/// Per-business booking capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CapacityPolicy {
    pub allow_multiple: bool,
    pub max_per_slot: u32,
}

impl CapacityPolicy {
    /// One booking per slot.
    pub const fn single() -> Self {
        CapacityPolicy {
            allow_multiple: false,
            max_per_slot: 1,
        }
    }

    /// Up to `max_per_slot` simultaneous bookings per slot.
    pub fn multiple(max_per_slot: u32) -> Result<Self, ValidationError> {
        validate_max_per_slot(max_per_slot)?;
        Ok(CapacityPolicy {
            allow_multiple: true,
            max_per_slot,
        })
    }

    /// Maximum number of active reservations a slot may hold.
    #[inline]
    pub fn effective_max(&self) -> u32 {
        if self.allow_multiple {
            self.max_per_slot.max(1)
        } else {
            1
        }
    }

    /// Returns true if a slot with `occupied` reservations can take one more.
    #[inline]
    pub fn has_room(&self, occupied: u32) -> bool {
        occupied < self.effective_max()
    }
}

impl Default for CapacityPolicy {
    fn default() -> Self {
        CapacityPolicy::single()
    }
}
