//! Budgeted teardown of a parcel's footprint.
//!
//! The protected square is grown by the inter-parcel spacing into a buffer
//! square. Every chunk overlapping the buffer is classified:
//! - **Regenerate**: the chunk lies entirely inside the buffer; all voxels
//!   from the floor up are zeroed, block entities removed, then the chunk is
//!   regenerated
//! - **Clear**: the chunk only partly overlaps the protected square and the
//!   spacing is narrower than a chunk, so a neighbour may own the rest; only
//!   the columns inside the protected square are zeroed
//!
//! Each tick processes at most `budget` units, regeneration units first.
//! Clearing is idempotent, so a job re-created after a restart is safe.

use std::collections::VecDeque;

use skyisle_common::{BlockPos, BlockRect, BlockState, ChunkPos, GridCellKey, WorldResult, CHUNK_WIDTH};
use skyisle_world::World;
use tracing::{debug, info, warn};

use crate::parcel::ParcelRecord;
use crate::settings::IslandSettings;

/// One chunk's worth of teardown work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkUnit {
    /// Zero the whole chunk and regenerate it
    Regenerate(ChunkPos),
    /// Zero only the columns inside `area`
    Clear {
        /// Chunk being cleared
        chunk: ChunkPos,
        /// Columns to clear (inside the chunk)
        area: BlockRect,
    },
}

impl WorkUnit {
    /// Chunk this unit touches.
    #[must_use]
    pub const fn chunk(&self) -> ChunkPos {
        match *self {
            Self::Regenerate(chunk) | Self::Clear { chunk, .. } => chunk,
        }
    }
}

/// Splits a footprint into regeneration and clear units.
#[must_use]
pub fn plan_units(protected: BlockRect, spacing: i32) -> (Vec<ChunkPos>, Vec<WorkUnit>) {
    let buffer = protected.expand(spacing.max(0));
    let mut full = Vec::new();
    let mut clear = Vec::new();
    for chunk in buffer.chunks() {
        let bounds = chunk.bounds();
        if buffer.contains_rect(&bounds) {
            full.push(chunk);
        } else if spacing < CHUNK_WIDTH && bounds.intersects(&protected) {
            clear.push(WorkUnit::Clear {
                chunk,
                area: intersection(&bounds, &protected),
            });
        }
    }
    (full, clear)
}

const fn intersection(a: &BlockRect, b: &BlockRect) -> BlockRect {
    BlockRect::new(
        if a.min_x > b.min_x { a.min_x } else { b.min_x },
        if a.min_z > b.min_z { a.min_z } else { b.min_z },
        if a.max_x < b.max_x { a.max_x } else { b.max_x },
        if a.max_z < b.max_z { a.max_z } else { b.max_z },
    )
}

/// Incremental teardown of one parcel.
#[derive(Debug, Clone)]
pub struct TeardownJob {
    key: GridCellKey,
    full: VecDeque<ChunkPos>,
    clear: VecDeque<WorkUnit>,
    budget: usize,
    floor: i32,
    /// Units completed so far (never decreases)
    processed: usize,
    total: usize,
    failed: usize,
}

impl TeardownJob {
    /// Plans the teardown of a parcel.
    #[must_use]
    pub fn begin(parcel: &ParcelRecord, settings: &IslandSettings) -> Self {
        let protected = parcel.protected_rect();
        let spacing = settings.island_distance - parcel.protection_half * 2;
        let (full, clear) = plan_units(protected, spacing);
        info!(
            "Teardown of cell {} planned: {} regenerate, {} clear units",
            parcel.key,
            full.len(),
            clear.len()
        );
        Self::from_units(parcel.key, full, clear, settings.clean_rate, settings.sea_level)
    }

    /// Creates a job from explicit units.
    #[must_use]
    pub fn from_units(
        key: GridCellKey,
        full: Vec<ChunkPos>,
        clear: Vec<WorkUnit>,
        budget: usize,
        floor: i32,
    ) -> Self {
        let total = full.len() + clear.len();
        Self {
            key,
            full: full.into(),
            clear: clear.into(),
            budget: budget.max(1),
            floor,
            processed: 0,
            total,
            failed: 0,
        }
    }

    /// Cell being torn down.
    #[must_use]
    pub const fn key(&self) -> GridCellKey {
        self.key
    }

    /// Units completed (including failed ones).
    #[must_use]
    pub const fn processed(&self) -> usize {
        self.processed
    }

    /// Units planned.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.total
    }

    /// Units that failed and were skipped.
    #[must_use]
    pub const fn failed(&self) -> usize {
        self.failed
    }

    /// Units left in both queues.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.full.len() + self.clear.len()
    }

    /// Whether both queues are empty.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.full.is_empty() && self.clear.is_empty()
    }

    /// Processes up to `budget` units. Returns how many were completed.
    ///
    /// A unit whose chunk is not resident is requested, requeued and still
    /// counted against this tick's budget.
    pub fn tick<W: World + ?Sized>(&mut self, world: &W) -> usize {
        let mut completed = 0;
        for _ in 0..self.budget {
            let unit = match self.full.pop_front() {
                Some(chunk) => WorkUnit::Regenerate(chunk),
                None => match self.clear.pop_front() {
                    Some(unit) => unit,
                    None => break,
                },
            };

            let chunk = unit.chunk();
            if !world.is_chunk_resident(chunk) {
                drop(world.load_chunk(chunk));
                if !world.is_chunk_resident(chunk) {
                    debug!("Chunk {} not resident yet, requeueing", chunk);
                    self.requeue(unit);
                    continue;
                }
            }

            if let Err(e) = self.process(world, unit) {
                warn!("Teardown of cell {} skipped chunk {}: {}", self.key, chunk, e);
                self.failed += 1;
            }
            self.processed += 1;
            completed += 1;
        }
        if self.is_done() {
            info!(
                "Teardown of cell {} finished: {} units, {} failed",
                self.key, self.processed, self.failed
            );
        }
        completed
    }

    fn requeue(&mut self, unit: WorkUnit) {
        match unit {
            WorkUnit::Regenerate(chunk) => self.full.push_back(chunk),
            clear @ WorkUnit::Clear { .. } => self.clear.push_back(clear),
        }
    }

    fn process<W: World + ?Sized>(&self, world: &W, unit: WorkUnit) -> WorldResult<()> {
        match unit {
            WorkUnit::Regenerate(chunk) => {
                clear_columns(world, chunk.bounds(), self.floor)?;
                for pos in world.block_entities_in(chunk)? {
                    world.remove_block_entity(pos)?;
                }
                world.regenerate_chunk(chunk)
            },
            WorkUnit::Clear { chunk, area } => {
                clear_columns(world, area, self.floor)?;
                for pos in world.block_entities_in(chunk)? {
                    if area.contains(pos.x, pos.z) && pos.y >= self.floor {
                        world.remove_block_entity(pos)?;
                    }
                }
                Ok(())
            },
        }
    }
}

/// Sets every non-air voxel in `area` from `floor` up to air.
fn clear_columns<W: World + ?Sized>(world: &W, area: BlockRect, floor: i32) -> WorldResult<()> {
    let height = world.height();
    for x in area.min_x..area.max_x {
        for z in area.min_z..area.max_z {
            for y in floor.max(0)..height {
                let pos = BlockPos::new(x, y, z);
                if !world.block(pos)?.is_air() {
                    world.set_block(pos, BlockState::AIR, false)?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use futures::executor::block_on;
    use skyisle_common::block_ids;
    use skyisle_world::{BlockEntity, LoadMode, MemoryWorld, MemoryWorldConfig};

    use super::*;

    fn world() -> MemoryWorld {
        MemoryWorld::new(MemoryWorldConfig {
            height: 32,
            ..Default::default()
        })
    }

    #[test]
    fn test_forty_units_four_ticks() {
        let world = world();
        let full: Vec<ChunkPos> = (0..25).map(|i| ChunkPos::new(i % 5, i / 5)).collect();
        let clear: Vec<WorkUnit> = (0..15)
            .map(|i| {
                let chunk = ChunkPos::new(10 + i, 0);
                WorkUnit::Clear {
                    chunk,
                    area: chunk.bounds(),
                }
            })
            .collect();
        let mut job = TeardownJob::from_units(GridCellKey::from_cell(0, 0), full, clear, 10, 0);
        assert_eq!(job.total(), 40);

        let mut ticks = 0;
        let mut per_tick = Vec::new();
        while !job.is_done() {
            per_tick.push(job.tick(&world));
            ticks += 1;
            assert!(ticks <= 10, "teardown did not terminate");
        }
        assert_eq!(ticks, 4);
        assert_eq!(per_tick, vec![10, 10, 10, 10]);
        assert_eq!(job.processed(), 40);
        assert_eq!(world.regeneration_count(), 25);
        assert_eq!(job.tick(&world), 0);
    }

    #[test]
    fn test_plan_exact_fit() {
        // 32x32 protected square aligned to chunks, no spacing
        let protected = BlockRect::new(0, 0, 32, 32);
        let (full, clear) = plan_units(protected, 0);
        assert_eq!(full.len(), 4);
        assert!(clear.is_empty());
    }

    #[test]
    fn test_plan_unaligned_footprint() {
        // 100x100 around (50, 50): chunks 0..=6 per axis, edges partial
        let protected = BlockRect::centered(50, 50, 50);
        let (full, clear) = plan_units(protected, 0);
        assert_eq!(full.len(), 36);
        assert_eq!(clear.len(), 13);
        let chunks: HashSet<ChunkPos> = full
            .iter()
            .copied()
            .chain(clear.iter().map(WorkUnit::chunk))
            .collect();
        assert_eq!(chunks.len(), 49);
        for unit in &clear {
            if let WorkUnit::Clear { area, .. } = unit {
                assert!(protected.contains_rect(area));
            }
        }
    }

    #[test]
    fn test_wide_spacing_skips_partial_chunks() {
        let protected = BlockRect::centered(50, 50, 40);
        let (full, clear) = plan_units(protected, 20);
        assert!(clear.is_empty());
        let buffer = protected.expand(20);
        assert!(full.iter().all(|chunk| buffer.contains_rect(&chunk.bounds())));
    }

    #[test]
    fn test_clear_unit_respects_area() {
        let world = world();
        block_on(world.load_chunk(ChunkPos::new(0, 0))).expect("load failed");
        let inside = BlockPos::new(2, 5, 2);
        let outside = BlockPos::new(12, 5, 12);
        for pos in [inside, outside] {
            world.set_block(pos, BlockState::of(block_ids::CHEST), false).expect("write failed");
            world
                .set_block_entity(pos, BlockEntity::Container { items: Vec::new() })
                .expect("entity failed");
        }
        let unit = WorkUnit::Clear {
            chunk: ChunkPos::new(0, 0),
            area: BlockRect::new(0, 0, 8, 8),
        };
        let mut job = TeardownJob::from_units(GridCellKey::from_cell(0, 0), Vec::new(), vec![unit], 4, 0);
        assert_eq!(job.tick(&world), 1);

        assert!(world.block(inside).expect("read failed").is_air());
        assert_eq!(world.block_entity(inside).expect("read failed"), None);
        assert!(!world.block(outside).expect("read failed").is_air());
        assert!(world.block_entity(outside).expect("read failed").is_some());
    }

    #[test]
    fn test_deferred_chunks_are_requeued() {
        let world = MemoryWorld::new(MemoryWorldConfig {
            height: 32,
            load_mode: LoadMode::Deferred,
            loads_per_tick: 8,
            ..Default::default()
        });
        let mut job = TeardownJob::from_units(
            GridCellKey::from_cell(0, 0),
            vec![ChunkPos::new(0, 0), ChunkPos::new(1, 0)],
            Vec::new(),
            2,
            0,
        );
        assert_eq!(job.tick(&world), 0);
        assert_eq!(job.remaining(), 2);
        world.tick();
        assert_eq!(job.tick(&world), 2);
        assert!(job.is_done());
    }
}
