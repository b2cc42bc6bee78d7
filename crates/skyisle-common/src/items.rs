//! Item stacks held by container blocks.

use serde::{Deserialize, Serialize};

/// Default maximum stack size.
pub const DEFAULT_MAX_STACK: u8 = 64;

/// A stack of one item type with its damage/variant value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemStack {
    /// Legacy numeric item id
    pub id: u16,
    /// Damage or variant value
    pub damage: u16,
    /// Number of items
    pub count: u8,
}

impl ItemStack {
    /// Creates a new item stack.
    #[must_use]
    pub const fn new(id: u16, damage: u16, count: u8) -> Self {
        Self { id, damage, count }
    }

    /// Whether the stack holds nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.id == 0 || self.count == 0
    }
}
