//! Chunk storage: blocks, column biomes and block entities.

use std::collections::HashMap;

use skyisle_common::{Biome, BlockState, ChunkPos, ItemStack, LocalPos, CHUNK_WIDTH};

/// Number of block columns in one chunk.
pub const COLUMNS_PER_CHUNK: usize = (CHUNK_WIDTH * CHUNK_WIDTH) as usize;

/// Extra state attached to a single block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockEntity {
    /// Container inventory, keyed by slot.
    Container {
        /// Items by slot index
        items: Vec<(u8, ItemStack)>,
    },
    /// Sign text, one entry per line.
    Sign {
        /// Text lines
        lines: Vec<String>,
    },
}

/// A 16x16 column of the world, `height` blocks tall.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Chunk coordinate
    pos: ChunkPos,
    /// Height in blocks
    height: i32,
    /// Block data, indexed `y * 256 + z * 16 + x`
    blocks: Vec<BlockState>,
    /// Per-column biome
    biomes: Vec<Biome>,
    /// Block entities keyed by local position
    block_entities: HashMap<(u8, i32, u8), BlockEntity>,
    /// Whether chunk has been modified since generation
    dirty: bool,
}

impl Chunk {
    /// Creates a new empty chunk.
    #[must_use]
    pub fn new(pos: ChunkPos, height: i32) -> Self {
        let height = height.max(1);
        Self {
            pos,
            height,
            blocks: vec![BlockState::AIR; height as usize * COLUMNS_PER_CHUNK],
            biomes: vec![Biome::default(); COLUMNS_PER_CHUNK],
            block_entities: HashMap::new(),
            dirty: false,
        }
    }

    /// Returns the chunk coordinate.
    #[must_use]
    pub const fn pos(&self) -> ChunkPos {
        self.pos
    }

    /// Returns the chunk height.
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Returns whether the chunk is dirty.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Marks the chunk as clean.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Gets the block at a local position.
    #[must_use]
    pub fn block(&self, local: LocalPos) -> Option<BlockState> {
        local
            .to_index(self.height)
            .and_then(|index| self.blocks.get(index).copied())
    }

    /// Sets the block at a local position. Returns `false` when out of range.
    pub fn set_block(&mut self, local: LocalPos, state: BlockState) -> bool {
        let Some(slot) = local
            .to_index(self.height)
            .and_then(|index| self.blocks.get_mut(index))
        else {
            return false;
        };
        *slot = state;
        self.dirty = true;
        true
    }

    /// Gets the biome of a column.
    #[must_use]
    pub fn biome(&self, local: LocalPos) -> Biome {
        self.biomes
            .get(local.column_index())
            .copied()
            .unwrap_or_default()
    }

    /// Sets the biome of a column.
    pub fn set_biome(&mut self, local: LocalPos, biome: Biome) {
        if let Some(slot) = self.biomes.get_mut(local.column_index()) {
            *slot = biome;
            self.dirty = true;
        }
    }

    /// Sets every column to the same biome.
    pub fn fill_biome(&mut self, biome: Biome) {
        self.biomes.fill(biome);
        self.dirty = true;
    }

    /// Gets the block entity at a local position.
    #[must_use]
    pub fn block_entity(&self, local: LocalPos) -> Option<&BlockEntity> {
        self.block_entities.get(&(local.x, local.y, local.z))
    }

    /// Attaches a block entity at a local position.
    pub fn set_block_entity(&mut self, local: LocalPos, entity: BlockEntity) {
        self.block_entities.insert((local.x, local.y, local.z), entity);
        self.dirty = true;
    }

    /// Removes and returns the block entity at a local position.
    pub fn remove_block_entity(&mut self, local: LocalPos) -> Option<BlockEntity> {
        let removed = self.block_entities.remove(&(local.x, local.y, local.z));
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    /// Local positions of every block entity in this chunk.
    #[must_use]
    pub fn block_entity_positions(&self) -> Vec<LocalPos> {
        let mut positions: Vec<LocalPos> = self
            .block_entities
            .keys()
            .map(|&(x, y, z)| LocalPos::new(x, y, z))
            .collect();
        positions.sort_by_key(|p| (p.y, p.z, p.x));
        positions
    }

    /// Number of non-air blocks.
    #[must_use]
    pub fn non_air_count(&self) -> usize {
        self.blocks.iter().filter(|b| !b.is_air()).count()
    }

    /// Number of block entities.
    #[must_use]
    pub fn block_entity_count(&self) -> usize {
        self.block_entities.len()
    }
}
