//! The world-mutation surface consumed by the island core.
//!
//! All methods take `&self`; implementations use interior mutability. The
//! contract is still single-writer: every mutating call must come from the
//! game-simulation thread.

use glam::DVec3;
use skyisle_common::{Biome, BlockPos, BlockState, ChunkPos, WorldResult};

use crate::chunk::BlockEntity;
use crate::readiness::ChunkReady;

/// A mobile entity to spawn into the world.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySpawn {
    /// Entity type name
    pub kind: String,
    /// Absolute position
    pub position: DVec3,
    /// Initial velocity
    pub motion: DVec3,
    /// Yaw in degrees
    pub yaw: f32,
    /// Pitch in degrees
    pub pitch: f32,
}

/// Block-level access to one named world.
pub trait World {
    /// World (level) name.
    fn name(&self) -> &str;

    /// Number of block layers; valid heights are `0..height()`.
    fn height(&self) -> i32;

    /// Whether a chunk is loaded and writable.
    fn is_chunk_resident(&self, chunk: ChunkPos) -> bool;

    /// Requests a chunk load. The ticket resolves once it is resident.
    fn load_chunk(&self, chunk: ChunkPos) -> ChunkReady;

    /// Reads a block.
    fn block(&self, pos: BlockPos) -> WorldResult<BlockState>;

    /// Writes a block. `update_physics = false` suppresses neighbour updates.
    fn set_block(&self, pos: BlockPos, state: BlockState, update_physics: bool) -> WorldResult<()>;

    /// Reads the biome of a column.
    fn biome(&self, x: i32, z: i32) -> WorldResult<Biome>;

    /// Writes the biome of a column.
    fn set_biome(&self, x: i32, z: i32, biome: Biome) -> WorldResult<()>;

    /// Reads the block entity at a position.
    fn block_entity(&self, pos: BlockPos) -> WorldResult<Option<BlockEntity>>;

    /// Attaches a block entity.
    fn set_block_entity(&self, pos: BlockPos, entity: BlockEntity) -> WorldResult<()>;

    /// Removes a block entity, returning it if one existed.
    fn remove_block_entity(&self, pos: BlockPos) -> WorldResult<Option<BlockEntity>>;

    /// Absolute positions of all block entities in a chunk.
    fn block_entities_in(&self, chunk: ChunkPos) -> WorldResult<Vec<BlockPos>>;

    /// Discards a chunk's contents and generates it afresh.
    fn regenerate_chunk(&self, chunk: ChunkPos) -> WorldResult<()>;

    /// Spawns a mobile entity.
    fn spawn_entity(&self, entity: &EntitySpawn) -> WorldResult<()>;
}
