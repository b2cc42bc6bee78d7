//! In-memory world used by the server binary and by tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use skyisle_common::{Biome, BlockPos, BlockState, ChunkPos, WorldError, WorldResult};
use tracing::{debug, info};

use crate::chunk::{BlockEntity, Chunk};
use crate::generation::{ChunkGenerator, VoidGenerator};
use crate::readiness::{ChunkReady, ChunkTickets};
use crate::surface::{EntitySpawn, World};

/// How chunk loads are materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Loads complete inside `load_chunk`.
    #[default]
    Immediate,
    /// Loads are queued and completed by [`MemoryWorld::tick`].
    Deferred,
}

/// In-memory world configuration.
#[derive(Debug, Clone)]
pub struct MemoryWorldConfig {
    /// World name
    pub name: String,
    /// Height in blocks
    pub height: i32,
    /// Load behaviour
    pub load_mode: LoadMode,
    /// Maximum deferred loads completed per tick
    pub loads_per_tick: usize,
}

impl Default for MemoryWorldConfig {
    fn default() -> Self {
        Self {
            name: "SkyBlock".to_string(),
            height: 256,
            load_mode: LoadMode::Immediate,
            loads_per_tick: 8,
        }
    }
}

/// A world whose chunks live in memory.
pub struct MemoryWorld {
    /// Configuration
    config: MemoryWorldConfig,
    /// Resident chunks
    chunks: DashMap<ChunkPos, Arc<RwLock<Chunk>>>,
    /// Chunk generator
    generator: Box<dyn ChunkGenerator>,
    /// Outstanding residency tickets
    tickets: ChunkTickets,
    /// Deferred loads in request order
    load_queue: Mutex<VecDeque<ChunkPos>>,
    /// Entities spawned so far
    spawned: Mutex<Vec<EntitySpawn>>,
    /// Number of chunk regenerations
    regenerations: AtomicUsize,
    /// Number of block writes
    writes: AtomicU64,
}

impl MemoryWorld {
    /// Creates a void world.
    #[must_use]
    pub fn new(config: MemoryWorldConfig) -> Self {
        Self::with_generator(config, Box::new(VoidGenerator::default()))
    }

    /// Creates a world backed by a custom generator.
    #[must_use]
    pub fn with_generator(config: MemoryWorldConfig, generator: Box<dyn ChunkGenerator>) -> Self {
        info!(
            "Created world '{}' (height {}, generator '{}')",
            config.name,
            config.height,
            generator.name()
        );
        Self {
            config,
            chunks: DashMap::new(),
            generator,
            tickets: ChunkTickets::new(),
            load_queue: Mutex::new(VecDeque::new()),
            spawned: Mutex::new(Vec::new()),
            regenerations: AtomicUsize::new(0),
            writes: AtomicU64::new(0),
        }
    }

    /// Completes queued loads. Returns how many chunks became resident.
    pub fn tick(&self) -> usize {
        let mut completed = 0;
        while completed < self.config.loads_per_tick {
            let Some(chunk) = self.load_queue.lock().pop_front() else {
                break;
            };
            self.materialize(chunk);
            let woken = self.tickets.resolve(chunk);
            debug!("Chunk {chunk} resident, woke {woken} waiters");
            completed += 1;
        }
        completed
    }

    /// Returns the number of resident chunks.
    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.chunks.len()
    }

    /// Returns the number of loads waiting for [`Self::tick`].
    #[must_use]
    pub fn pending_loads(&self) -> usize {
        self.load_queue.lock().len()
    }

    /// Returns how many times any chunk was regenerated.
    #[must_use]
    pub fn regeneration_count(&self) -> usize {
        self.regenerations.load(Ordering::Relaxed)
    }

    /// Returns the number of block writes performed.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Returns every entity spawned so far.
    #[must_use]
    pub fn spawned_entities(&self) -> Vec<EntitySpawn> {
        self.spawned.lock().clone()
    }

    /// Counts non-air blocks inside a chunk, if resident.
    #[must_use]
    pub fn non_air_in(&self, chunk: ChunkPos) -> Option<usize> {
        self.chunks.get(&chunk).map(|c| c.read().non_air_count())
    }

    fn materialize(&self, chunk: ChunkPos) {
        if self.chunks.contains_key(&chunk) {
            return;
        }
        let generated = self.generator.generate(chunk, self.config.height);
        self.chunks.insert(chunk, Arc::new(RwLock::new(generated)));
    }

    fn chunk_handle(&self, chunk: ChunkPos) -> WorldResult<Arc<RwLock<Chunk>>> {
        self.chunks
            .get(&chunk)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(WorldError::ChunkNotResident(chunk))
    }

    fn check_height(&self, pos: BlockPos) -> WorldResult<()> {
        if pos.y < 0 || pos.y >= self.config.height {
            return Err(WorldError::OutOfBounds(pos));
        }
        Ok(())
    }
}

impl World for MemoryWorld {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn height(&self) -> i32 {
        self.config.height
    }

    fn is_chunk_resident(&self, chunk: ChunkPos) -> bool {
        self.chunks.contains_key(&chunk)
    }

    fn load_chunk(&self, chunk: ChunkPos) -> ChunkReady {
        if self.is_chunk_resident(chunk) {
            return ChunkReady::ready(chunk);
        }
        match self.config.load_mode {
            LoadMode::Immediate => {
                self.materialize(chunk);
                ChunkReady::ready(chunk)
            },
            LoadMode::Deferred => {
                let (ticket, first) = self.tickets.subscribe(chunk);
                if first {
                    self.load_queue.lock().push_back(chunk);
                }
                ticket
            },
        }
    }

    fn block(&self, pos: BlockPos) -> WorldResult<BlockState> {
        self.check_height(pos)?;
        let handle = self.chunk_handle(pos.chunk())?;
        let chunk = handle.read();
        chunk.block(pos.local()).ok_or(WorldError::OutOfBounds(pos))
    }

    fn set_block(&self, pos: BlockPos, state: BlockState, _update_physics: bool) -> WorldResult<()> {
        self.check_height(pos)?;
        let handle = self.chunk_handle(pos.chunk())?;
        if !handle.write().set_block(pos.local(), state) {
            return Err(WorldError::OutOfBounds(pos));
        }
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn biome(&self, x: i32, z: i32) -> WorldResult<Biome> {
        let pos = BlockPos::new(x, 0, z);
        let handle = self.chunk_handle(pos.chunk())?;
        let biome = handle.read().biome(pos.local());
        Ok(biome)
    }

    fn set_biome(&self, x: i32, z: i32, biome: Biome) -> WorldResult<()> {
        let pos = BlockPos::new(x, 0, z);
        let handle = self.chunk_handle(pos.chunk())?;
        handle.write().set_biome(pos.local(), biome);
        Ok(())
    }

    fn block_entity(&self, pos: BlockPos) -> WorldResult<Option<BlockEntity>> {
        let handle = self.chunk_handle(pos.chunk())?;
        let entity = handle.read().block_entity(pos.local()).cloned();
        Ok(entity)
    }

    fn set_block_entity(&self, pos: BlockPos, entity: BlockEntity) -> WorldResult<()> {
        self.check_height(pos)?;
        let handle = self.chunk_handle(pos.chunk())?;
        handle.write().set_block_entity(pos.local(), entity);
        Ok(())
    }

    fn remove_block_entity(&self, pos: BlockPos) -> WorldResult<Option<BlockEntity>> {
        let handle = self.chunk_handle(pos.chunk())?;
        let removed = handle.write().remove_block_entity(pos.local());
        Ok(removed)
    }

    fn block_entities_in(&self, chunk: ChunkPos) -> WorldResult<Vec<BlockPos>> {
        let handle = self.chunk_handle(chunk)?;
        let positions = handle
            .read()
            .block_entity_positions()
            .into_iter()
            .map(|local| {
                BlockPos::new(
                    chunk.min_block_x() + i32::from(local.x),
                    local.y,
                    chunk.min_block_z() + i32::from(local.z),
                )
            })
            .collect();
        Ok(positions)
    }

    fn regenerate_chunk(&self, chunk: ChunkPos) -> WorldResult<()> {
        let fresh = self.generator.generate(chunk, self.config.height);
        if let Ok(handle) = self.chunk_handle(chunk) {
            *handle.write() = fresh;
        } else {
            self.chunks.insert(chunk, Arc::new(RwLock::new(fresh)));
        }
        self.regenerations.fetch_add(1, Ordering::Relaxed);
        debug!("Regenerated chunk {chunk}");
        Ok(())
    }

    fn spawn_entity(&self, entity: &EntitySpawn) -> WorldResult<()> {
        let pos = BlockPos::new(
            entity.position.x.floor() as i32,
            entity.position.y.floor() as i32,
            entity.position.z.floor() as i32,
        );
        self.chunk_handle(pos.chunk())?;
        self.spawned.lock().push(entity.clone());
        Ok(())
    }
}
