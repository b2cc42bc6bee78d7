//! Block states and legacy numeric block ids.

use serde::{Deserialize, Serialize};

/// Legacy numeric block ids used by structure templates and the world.
pub mod block_ids {
    /// Empty space
    pub const AIR: u16 = 0;
    /// Stone
    pub const STONE: u16 = 1;
    /// Grass block
    pub const GRASS: u16 = 2;
    /// Dirt
    pub const DIRT: u16 = 3;
    /// Cobblestone
    pub const COBBLESTONE: u16 = 4;
    /// Bedrock, the template anchor block
    pub const BEDROCK: u16 = 7;
    /// Water (flowing)
    pub const WATER: u16 = 8;
    /// Sand
    pub const SAND: u16 = 12;
    /// Oak log
    pub const LOG: u16 = 17;
    /// Oak leaves
    pub const LEAVES: u16 = 18;
    /// Chest
    pub const CHEST: u16 = 54;
    /// Standing sign
    pub const SIGN_POST: u16 = 63;
    /// Wall sign
    pub const WALL_SIGN: u16 = 68;
    /// Trapped chest
    pub const TRAPPED_CHEST: u16 = 146;
}

/// Block type plus auxiliary (damage/meta) data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BlockState {
    /// Block type id (12 bits in templates)
    pub id: u16,
    /// Auxiliary data nibble
    pub data: u8,
}

impl BlockState {
    /// The empty block.
    pub const AIR: Self = Self::new(block_ids::AIR, 0);

    /// Creates a new block state.
    #[must_use]
    pub const fn new(id: u16, data: u8) -> Self {
        Self { id, data }
    }

    /// Creates a block state with zero auxiliary data.
    #[must_use]
    pub const fn of(id: u16) -> Self {
        Self::new(id, 0)
    }

    /// Whether this is air.
    #[must_use]
    pub const fn is_air(self) -> bool {
        self.id == block_ids::AIR
    }

    /// Whether this block carries container state.
    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(self.id, block_ids::CHEST | block_ids::TRAPPED_CHEST)
    }

    /// Whether this block carries sign text.
    #[must_use]
    pub const fn is_sign(self) -> bool {
        matches!(self.id, block_ids::SIGN_POST | block_ids::WALL_SIGN)
    }
}

impl std::fmt::Display for BlockState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.id, self.data)
    }
}
