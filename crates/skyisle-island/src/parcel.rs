//! Parcel records and player profiles.

use serde::{Deserialize, Serialize};
use skyisle_common::{Biome, BlockPos, BlockRect, GridCellKey, OwnerId, TemplateId};

/// Lifecycle state of a parcel record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParcelState {
    /// Live island
    #[default]
    Active,
    /// Being torn down; the cell stays reserved until the teardown drains
    PendingTeardown,
}

/// A claimed island.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelRecord {
    /// Owner
    pub owner: OwnerId,
    /// Per-owner island slot (1-based)
    pub slot: u32,
    /// Grid cell
    pub key: GridCellKey,
    /// World name
    pub world: String,
    /// Island center (anchor position)
    pub center: BlockPos,
    /// Half side of the protected square
    pub protection_half: i32,
    /// Biome of the protected area
    pub biome: Biome,
    /// Display name
    pub name: String,
    /// Visitors are kept out
    pub locked: bool,
    /// Server spawn island
    pub spawn: bool,
    /// Home offset from the center
    pub home: BlockPos,
    /// Template it was built from (`None` = procedural)
    pub template: Option<TemplateId>,
    /// Lifecycle state
    pub state: ParcelState,
}

impl ParcelRecord {
    /// Protected square around the center.
    #[must_use]
    pub const fn protected_rect(&self) -> BlockRect {
        BlockRect::centered(self.center.x, self.center.z, self.protection_half)
    }

    /// Whether a column lies in the protected square.
    #[must_use]
    pub const fn in_protected_area(&self, x: i32, z: i32) -> bool {
        self.protected_rect().contains(x, z)
    }

    /// Absolute home position.
    #[must_use]
    pub const fn home_position(&self) -> BlockPos {
        self.center.add(self.home)
    }

    /// Whether the island is live.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == ParcelState::Active
    }
}

/// Per-owner profile fields the island core reads and updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProfile {
    /// Owner
    pub owner: OwnerId,
    /// Islands currently held
    pub homes: u32,
    /// Resets remaining; negative means unlimited
    pub resets_left: i32,
    /// Preferred locale
    pub locale: String,
}

impl PlayerProfile {
    /// A fresh profile.
    #[must_use]
    pub fn new(owner: OwnerId, resets: i32) -> Self {
        Self {
            owner,
            homes: 0,
            resets_left: resets,
            locale: "en_US".to_string(),
        }
    }

    /// Whether another reset is allowed.
    #[must_use]
    pub const fn can_reset(&self) -> bool {
        self.resets_left != 0
    }
}
