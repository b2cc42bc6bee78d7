//! # SkyIsle Island
//!
//! Island lifecycle for SkyIsle.
//!
//! This crate provides:
//! - Grid allocation of parcel cells (randomized or spiral search)
//! - Parcel records, player profiles and the parcel store contract
//! - The placement engine with best-effort rollback
//! - The procedural default island
//! - Budgeted teardown and biome update jobs on a tick scheduler
//! - The island manager tying it together

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod biome_update;
pub mod error;
pub mod grid;
pub mod manager;
pub mod parcel;
pub mod placement;
pub mod procedural;
pub mod scheduler;
pub mod settings;
pub mod store;
pub mod teardown;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::biome_update::BiomeUpdateJob;
    pub use crate::error::*;
    pub use crate::grid::{cell_key, GridAllocator};
    pub use crate::manager::{CreateRequest, CreatedIsland, IslandManager, TemplateChoice};
    pub use crate::parcel::{ParcelRecord, ParcelState, PlayerProfile};
    pub use crate::placement::{place, safe_home, PlacementOptions, PlacementReport};
    pub use crate::procedural::default_island;
    pub use crate::scheduler::*;
    pub use crate::settings::*;
    pub use crate::store::{MemoryParcelStore, ParcelStore};
    pub use crate::teardown::{plan_units, TeardownJob, WorkUnit};
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_fill_the_cell() {
        let settings = IslandSettings::default();
        assert_eq!(settings.protection_half() * 2, settings.island_distance);
        assert_eq!(settings.decode_settings().island_height, settings.island_height);
    }

    #[test]
    fn test_cell_key_matches_allocator() {
        let grid = GridAllocator::from_settings(&IslandSettings::default());
        assert_eq!(grid.cell_key(-1, 250), cell_key(-1, 250, 100));
    }
}
