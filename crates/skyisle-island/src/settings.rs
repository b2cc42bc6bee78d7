//! Island settings.
//!
//! Grid spacing, heights, teardown pacing and creation limits. Embedded in
//! the server configuration file under `[island]`.

use serde::{Deserialize, Serialize};
use skyisle_common::{block_ids, Biome, ItemStack};
use skyisle_schematic::DecodeSettings;

/// Slots in a single chest.
pub const CHEST_SLOTS: usize = 27;

/// How the grid allocator walks the cell space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationStrategy {
    /// Random cell inside a square that grows each iteration
    #[default]
    Random,
    /// Outward spiral from the origin cell
    Spiral,
}

/// Island lifecycle settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IslandSettings {
    /// World islands are created in
    pub default_world: String,
    /// Cell spacing; one island per `island_distance` square
    pub island_distance: i32,
    /// Side of the protected square around an island center
    pub protection_range: i32,
    /// World height of the island base (anchor block)
    pub island_height: i32,
    /// Template air is written only below this height
    pub air_floor: i32,
    /// Teardown clears from this height upward
    pub sea_level: i32,
    /// World height limit
    pub world_height: i32,
    /// Teardown units (and biome chunks) processed per tick
    pub clean_rate: usize,
    /// Islands one owner may hold
    pub max_homes: u32,
    /// Resets per owner; negative means unlimited
    pub reset_limit: i32,
    /// Biome for islands without a template biome
    pub default_biome: Biome,
    /// Grid search bound
    pub search_iterations: u32,
    /// Seed for the random allocation strategy
    pub allocator_seed: Option<u64>,
    /// Grid search strategy
    pub allocation_strategy: AllocationStrategy,
    /// Chest contents for templates that honor the chest configuration
    pub chest_items: Vec<ItemStack>,
}

impl Default for IslandSettings {
    fn default() -> Self {
        Self {
            default_world: "SkyBlock".to_string(),
            island_distance: 100,
            protection_range: 100,
            island_height: 60,
            air_floor: 60,
            sea_level: 0,
            world_height: 256,
            clean_rate: 256,
            max_homes: 1,
            reset_limit: 3,
            default_biome: Biome::Plains,
            search_iterations: 1_000_000,
            allocator_seed: None,
            allocation_strategy: AllocationStrategy::Random,
            chest_items: vec![
                ItemStack::new(287, 0, 12),
                ItemStack::new(327, 0, 1),
                ItemStack::new(79, 0, 2),
                ItemStack::new(360, 0, 1),
                ItemStack::new(81, 0, 1),
                ItemStack::new(40, 0, 1),
                ItemStack::new(39, 0, 1),
                ItemStack::new(86, 0, 1),
                ItemStack::new(338, 0, 1),
            ],
        }
    }
}

impl IslandSettings {
    /// Validate and clamp values to sensible ranges.
    pub fn validate(&mut self) {
        // World
        self.world_height = self.world_height.clamp(16, 4096);
        self.island_height = self.island_height.clamp(0, self.world_height - 1);
        self.air_floor = self.air_floor.clamp(0, self.world_height);
        self.sea_level = self.sea_level.clamp(0, self.world_height - 1);

        // Grid
        self.island_distance = self.island_distance.clamp(16, 1 << 20);
        self.protection_range = self.protection_range.clamp(2, self.island_distance);
        self.search_iterations = self.search_iterations.max(1);

        // Pacing and limits
        self.clean_rate = self.clean_rate.clamp(1, 65_536);
        self.max_homes = self.max_homes.clamp(1, 64);
        self.chest_items.retain(|item| !item.is_empty());
        self.chest_items.truncate(CHEST_SLOTS);
    }

    /// Half side of the protected square.
    #[must_use]
    pub const fn protection_half(&self) -> i32 {
        self.protection_range / 2
    }

    /// Height filter used when decoding templates.
    #[must_use]
    pub const fn decode_settings(&self) -> DecodeSettings {
        DecodeSettings {
            island_height: self.island_height,
            air_floor: self.air_floor,
            world_height: self.world_height,
            anchor_block: block_ids::BEDROCK,
        }
    }

    /// Configured chest contents, one item per slot.
    #[must_use]
    pub fn chest_contents(&self) -> Vec<(u8, ItemStack)> {
        self.chest_items
            .iter()
            .take(CHEST_SLOTS)
            .enumerate()
            .map(|(slot, item)| (slot as u8, *item))
            .collect()
    }
}
