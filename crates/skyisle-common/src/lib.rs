//! # SkyIsle Common
//!
//! Common types, utilities, and shared abstractions for SkyIsle.
//!
//! This crate provides foundational types used across all SkyIsle subsystems:
//! - Coordinate types (block, chunk, chunk-local) and block rectangles
//! - ID types (GridCellKey, TemplateId, OwnerId)
//! - Block states, the legacy block id table and item stacks
//! - Biomes
//! - World error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod biome;
pub mod blocks;
pub mod coords;
pub mod error;
pub mod ids;
pub mod items;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::biome::*;
    pub use crate::blocks::*;
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::items::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_to_chunk_conversion() {
        let pos = BlockPos::new(-1, 64, 33);
        assert_eq!(pos.chunk(), ChunkPos::new(-1, 2));

        let local = pos.local();
        assert_eq!(local, LocalPos::new(15, 64, 1));
    }

    #[test]
    fn test_block_state_air() {
        assert!(BlockState::AIR.is_air());
        assert!(!BlockState::new(block_ids::STONE, 0).is_air());
    }

    #[test]
    fn test_biome_lookup() {
        assert_eq!(Biome::from_name("plains"), Some(Biome::Plains));
        assert_eq!(Biome::from_id(Biome::Desert.id()), Some(Biome::Desert));
    }
}
