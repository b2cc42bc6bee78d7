//! Budgeted biome rewrite over a parcel's protected square.

use std::collections::VecDeque;

use skyisle_common::{Biome, BlockRect, ChunkPos, GridCellKey, WorldResult};
use skyisle_world::World;
use tracing::{debug, info, warn};

/// Rewrites every column of a protected square to one biome, a few chunks
/// per tick.
#[derive(Debug, Clone)]
pub struct BiomeUpdateJob {
    key: GridCellKey,
    area: BlockRect,
    biome: Biome,
    pending: VecDeque<ChunkPos>,
    budget: usize,
    processed: usize,
}

impl BiomeUpdateJob {
    /// Plans a rewrite of `area` to `biome`.
    #[must_use]
    pub fn new(key: GridCellKey, area: BlockRect, biome: Biome, budget: usize) -> Self {
        Self {
            key,
            area,
            biome,
            pending: area.chunks().into(),
            budget: budget.max(1),
            processed: 0,
        }
    }

    /// Cell being updated.
    #[must_use]
    pub const fn key(&self) -> GridCellKey {
        self.key
    }

    /// Target biome.
    #[must_use]
    pub const fn biome(&self) -> Biome {
        self.biome
    }

    /// Chunks still waiting.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    /// Chunks completed so far.
    #[must_use]
    pub const fn processed(&self) -> usize {
        self.processed
    }

    /// Whether all chunks were rewritten.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.pending.is_empty()
    }

    /// Rewrites up to `budget` chunks. Returns how many were completed.
    pub fn tick<W: World + ?Sized>(&mut self, world: &W) -> usize {
        let mut completed = 0;
        for _ in 0..self.budget {
            let Some(chunk) = self.pending.pop_front() else {
                break;
            };
            if !world.is_chunk_resident(chunk) {
                drop(world.load_chunk(chunk));
                if !world.is_chunk_resident(chunk) {
                    debug!("Chunk {} not resident yet, requeueing", chunk);
                    self.pending.push_back(chunk);
                    continue;
                }
            }
            if let Err(e) = self.rewrite(world, chunk) {
                warn!("Biome update of cell {} skipped chunk {}: {}", self.key, chunk, e);
            }
            self.processed += 1;
            completed += 1;
        }
        if self.is_done() {
            info!("Biome of cell {} set to {}", self.key, self.biome);
        }
        completed
    }

    fn rewrite<W: World + ?Sized>(&self, world: &W, chunk: ChunkPos) -> WorldResult<()> {
        let bounds = chunk.bounds();
        for x in bounds.min_x..bounds.max_x {
            for z in bounds.min_z..bounds.max_z {
                if self.area.contains(x, z) {
                    world.set_biome(x, z, self.biome)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use skyisle_world::{MemoryWorld, MemoryWorldConfig};

    use super::*;

    #[test]
    fn test_rewrites_only_the_area() {
        let world = MemoryWorld::new(MemoryWorldConfig {
            height: 16,
            ..Default::default()
        });
        let area = BlockRect::centered(20, 20, 10);
        let mut job = BiomeUpdateJob::new(GridCellKey::from_cell(0, 0), area, Biome::Desert, 2);
        let total = job.remaining();
        assert_eq!(total, 4);

        let mut ticks = 0;
        while !job.is_done() {
            job.tick(&world);
            ticks += 1;
        }
        assert_eq!(ticks, 2);
        assert_eq!(job.processed(), total);

        assert_eq!(world.biome(10, 10).expect("read failed"), Biome::Desert);
        assert_eq!(world.biome(29, 29).expect("read failed"), Biome::Desert);
        assert_ne!(world.biome(30, 30).expect("read failed"), Biome::Desert);
        assert_ne!(world.biome(9, 20).expect("read failed"), Biome::Desert);
    }
}
