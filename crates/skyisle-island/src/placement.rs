//! Template placement with best-effort rollback.
//!
//! Every op is written at `anchor + (offset - template anchor)`, so the
//! template's anchor block lands exactly on the requested anchor position.
//! No voxel is written before its chunk is resident: non-resident chunks are
//! requested and awaited through their readiness ticket.
//!
//! On a failed write, every voxel written by this invocation is reset to air
//! and its block entity removed. Rollback is not transactional; voxels that
//! cannot be reset are reported in [`PlacementError::RollbackIncomplete`].

use ahash::AHashSet;
use glam::DVec3;
use skyisle_common::{Biome, BlockPos, BlockState, ItemStack, WorldError};
use skyisle_schematic::{PlacementOp, StructureTemplate};
use skyisle_world::{BlockEntity, EntitySpawn, World};
use tracing::{debug, error, warn};

use crate::error::{PlacementError, PlacementResult};

/// Per-placement choices that do not live in the template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlacementOptions {
    /// Biome written under every placed column
    pub biome: Biome,
    /// Replaces stored container contents when set
    pub chest_items: Option<Vec<(u8, ItemStack)>>,
    /// Spawn the template's mobile entities
    pub paste_entities: bool,
}

impl PlacementOptions {
    /// Options derived from a template's metadata.
    ///
    /// `chest_items` is used only if the template honors the chest configuration.
    #[must_use]
    pub fn for_template(template: &StructureTemplate, biome: Biome, chest_items: Vec<(u8, ItemStack)>) -> Self {
        Self {
            biome,
            chest_items: template.meta.use_config_chest.then_some(chest_items),
            paste_entities: template.meta.paste_entities,
        }
    }
}

/// Summary of a successful placement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlacementReport {
    /// Voxels written
    pub voxels: usize,
    /// Block entities created
    pub block_entities: usize,
    /// Mobile entities spawned
    pub entities: usize,
    /// Chunks that had to be loaded
    pub chunks_loaded: usize,
}

/// World position of a template-local offset.
#[must_use]
pub const fn world_position(anchor: BlockPos, template_anchor: BlockPos, offset: BlockPos) -> BlockPos {
    anchor.add(offset.sub(template_anchor))
}

/// Pastes a template so that its anchor block lands on `anchor`.
pub async fn place<W: World + ?Sized>(
    world: &W,
    template: &StructureTemplate,
    anchor: BlockPos,
    options: &PlacementOptions,
) -> PlacementResult<PlacementReport> {
    let origin = template.anchor_or_origin();
    let mut report = PlacementReport::default();
    let mut placed = Vec::with_capacity(template.ops.len());
    let mut columns = AHashSet::new();

    for op in &template.ops {
        let pos = world_position(anchor, origin, op.offset);
        if let Err(source) = write_op(world, op, pos, options, &mut placed, &mut columns, &mut report).await {
            return Err(rollback(world, &placed, pos, source));
        }
    }

    if options.paste_entities {
        let shift = as_dvec(anchor) - as_dvec(origin);
        for entity in &template.entities {
            let spawn = EntitySpawn {
                kind: entity.kind.clone(),
                position: entity.position + shift,
                motion: entity.motion,
                yaw: entity.yaw,
                pitch: entity.pitch,
            };
            let chunk = BlockPos::new(
                spawn.position.x.floor() as i32,
                spawn.position.y.floor() as i32,
                spawn.position.z.floor() as i32,
            )
            .chunk();
            let ready = if world.is_chunk_resident(chunk) {
                Ok(())
            } else {
                world.load_chunk(chunk).await
            };
            match ready.and_then(|()| world.spawn_entity(&spawn)) {
                Ok(()) => report.entities += 1,
                Err(e) => warn!("Skipping template entity {}: {}", spawn.kind, e),
            }
        }
    }

    debug!(
        "Placed template {} at {}: {} voxels, {} block entities, {} entities",
        template.id, anchor, report.voxels, report.block_entities, report.entities
    );
    Ok(report)
}

async fn write_op<W: World + ?Sized>(
    world: &W,
    op: &PlacementOp,
    pos: BlockPos,
    options: &PlacementOptions,
    placed: &mut Vec<BlockPos>,
    columns: &mut AHashSet<(i32, i32)>,
    report: &mut PlacementReport,
) -> Result<(), WorldError> {
    let chunk = pos.chunk();
    if !world.is_chunk_resident(chunk) {
        world.load_chunk(chunk).await?;
        report.chunks_loaded += 1;
    }

    world.set_block(pos, op.block, false)?;
    placed.push(pos);
    report.voxels += 1;

    if columns.insert((pos.x, pos.z)) {
        world.set_biome(pos.x, pos.z, options.biome)?;
    }

    let entity = if let Some(stored) = &op.contents {
        let items = options.chest_items.clone().unwrap_or_else(|| stored.clone());
        Some(BlockEntity::Container { items })
    } else {
        op.text.clone().map(|lines| BlockEntity::Sign { lines })
    };
    if let Some(entity) = entity {
        world.set_block_entity(pos, entity)?;
        report.block_entities += 1;
    }
    Ok(())
}

/// Resets every placed voxel (newest first) and removes its block entity.
fn rollback<W: World + ?Sized>(
    world: &W,
    placed: &[BlockPos],
    failed_at: BlockPos,
    source: WorldError,
) -> PlacementError {
    warn!(
        "Placement failed at {}: {}; rolling back {} voxels",
        failed_at,
        source,
        placed.len()
    );
    let mut stuck = Vec::new();
    for &pos in placed.iter().rev() {
        let reset = world
            .set_block(pos, BlockState::AIR, false)
            .and_then(|()| world.remove_block_entity(pos).map(|_| ()));
        if let Err(e) = reset {
            warn!("Rollback could not reset {}: {}", pos, e);
            stuck.push(pos);
        }
    }
    if stuck.is_empty() {
        PlacementError::RolledBack {
            failed_at,
            rolled_back: placed.len(),
            source,
        }
    } else {
        error!("Rollback left {} voxels in place near {}", stuck.len(), failed_at);
        PlacementError::RollbackIncomplete {
            failed_at,
            stuck,
            source,
        }
    }
}

fn as_dvec(pos: BlockPos) -> DVec3 {
    DVec3::new(f64::from(pos.x), f64::from(pos.y), f64::from(pos.z))
}

/// Finds a standing spot in the column above `from`: solid floor, two air
/// blocks above it.
pub fn safe_home<W: World + ?Sized>(world: &W, from: BlockPos) -> Option<BlockPos> {
    let top = world.height() - 1;
    (from.y.max(1)..top).find_map(|y| {
        let floor = world.block(BlockPos::new(from.x, y - 1, from.z)).ok()?;
        let feet = world.block(BlockPos::new(from.x, y, from.z)).ok()?;
        let head = world.block(BlockPos::new(from.x, y + 1, from.z)).ok()?;
        (!floor.is_air() && feet.is_air() && head.is_air()).then_some(BlockPos::new(from.x, y, from.z))
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use futures::executor::{block_on, LocalPool};
    use futures::task::LocalSpawnExt;
    use skyisle_common::{block_ids, ChunkPos, TemplateId, WorldResult};
    use skyisle_schematic::{TemplateEntity, TemplateMeta};
    use skyisle_world::{ChunkReady, LoadMode, MemoryWorld, MemoryWorldConfig};

    use super::*;

    fn template(ops: Vec<PlacementOp>, anchor: Option<BlockPos>) -> StructureTemplate {
        StructureTemplate {
            id: TemplateId::new(1),
            width: 4,
            length: 4,
            height: 4,
            ops,
            anchor,
            entities: Vec::new(),
            meta: TemplateMeta::default(),
            skipped_items: 0,
        }
    }

    fn column(n: i32) -> Vec<PlacementOp> {
        (0..n)
            .map(|y| PlacementOp::block(BlockPos::new(0, y, 0), BlockState::of(block_ids::DIRT)))
            .collect()
    }

    /// Fails writes after a number of successful ones, optionally refusing
    /// rollback writes to a position or to every position.
    pub(crate) struct FlakyWorld {
        inner: MemoryWorld,
        writes_left: Cell<usize>,
        stuck_at: Option<BlockPos>,
        stuck_everywhere: bool,
        failing: Cell<bool>,
    }

    impl FlakyWorld {
        fn new(writes: usize, stuck_at: Option<BlockPos>) -> Self {
            Self {
                inner: MemoryWorld::new(MemoryWorldConfig::default()),
                writes_left: Cell::new(writes),
                stuck_at,
                stuck_everywhere: false,
                failing: Cell::new(false),
            }
        }

        /// Every write fails once `writes` solid blocks have been written,
        /// until [`FlakyWorld::repair`].
        pub(crate) fn broken_after(inner: MemoryWorld, writes: usize) -> Self {
            Self {
                inner,
                writes_left: Cell::new(writes),
                stuck_at: None,
                stuck_everywhere: true,
                failing: Cell::new(false),
            }
        }

        pub(crate) fn repair(&self) {
            self.failing.set(false);
            self.writes_left.set(usize::MAX);
        }
    }

    impl World for FlakyWorld {
        fn name(&self) -> &str {
            self.inner.name()
        }
        fn height(&self) -> i32 {
            self.inner.height()
        }
        fn is_chunk_resident(&self, chunk: ChunkPos) -> bool {
            self.inner.is_chunk_resident(chunk)
        }
        fn load_chunk(&self, chunk: ChunkPos) -> ChunkReady {
            self.inner.load_chunk(chunk)
        }
        fn block(&self, pos: BlockPos) -> WorldResult<BlockState> {
            self.inner.block(pos)
        }
        fn set_block(&self, pos: BlockPos, state: BlockState, physics: bool) -> WorldResult<()> {
            if self.failing.get() && (self.stuck_everywhere || Some(pos) == self.stuck_at) {
                return Err(WorldError::WriteFailed {
                    pos,
                    reason: "locked".into(),
                });
            }
            if !state.is_air() {
                if self.writes_left.get() == 0 {
                    self.failing.set(true);
                    return Err(WorldError::WriteFailed {
                        pos,
                        reason: "injected".into(),
                    });
                }
                self.writes_left.set(self.writes_left.get() - 1);
            }
            self.inner.set_block(pos, state, physics)
        }
        fn biome(&self, x: i32, z: i32) -> WorldResult<Biome> {
            self.inner.biome(x, z)
        }
        fn set_biome(&self, x: i32, z: i32, biome: Biome) -> WorldResult<()> {
            self.inner.set_biome(x, z, biome)
        }
        fn block_entity(&self, pos: BlockPos) -> WorldResult<Option<BlockEntity>> {
            self.inner.block_entity(pos)
        }
        fn set_block_entity(&self, pos: BlockPos, entity: BlockEntity) -> WorldResult<()> {
            self.inner.set_block_entity(pos, entity)
        }
        fn remove_block_entity(&self, pos: BlockPos) -> WorldResult<Option<BlockEntity>> {
            self.inner.remove_block_entity(pos)
        }
        fn block_entities_in(&self, chunk: ChunkPos) -> WorldResult<Vec<BlockPos>> {
            self.inner.block_entities_in(chunk)
        }
        fn regenerate_chunk(&self, chunk: ChunkPos) -> WorldResult<()> {
            self.inner.regenerate_chunk(chunk)
        }
        fn spawn_entity(&self, entity: &EntitySpawn) -> WorldResult<()> {
            self.inner.spawn_entity(entity)
        }
    }

    #[test]
    fn test_anchor_alignment() {
        let world = MemoryWorld::new(MemoryWorldConfig::default());
        let mut ops = column(3);
        ops[1].block = BlockState::of(block_ids::BEDROCK);
        let template = template(ops, Some(BlockPos::new(0, 1, 0)));
        let anchor = BlockPos::new(150, 60, -50);

        let report = block_on(place(&world, &template, anchor, &PlacementOptions::default()))
            .expect("place failed");
        assert_eq!(report.voxels, 3);
        assert_eq!(
            world.block(anchor).expect("read failed"),
            BlockState::of(block_ids::BEDROCK)
        );
        assert_eq!(
            world.block(anchor.offset(0, -1, 0)).expect("read failed"),
            BlockState::of(block_ids::DIRT)
        );
    }

    #[test]
    fn test_waits_for_chunk_residency() {
        let world = Rc::new(MemoryWorld::new(MemoryWorldConfig {
            load_mode: LoadMode::Deferred,
            ..Default::default()
        }));
        let template = template(column(2), None);
        let anchor = BlockPos::new(8, 60, 8);
        let outcome = Rc::new(RefCell::new(None));

        let mut pool = LocalPool::new();
        {
            let world = Rc::clone(&world);
            let outcome = Rc::clone(&outcome);
            pool.spawner()
                .spawn_local(async move {
                    let result = place(&*world, &template, anchor, &PlacementOptions::default()).await;
                    *outcome.borrow_mut() = Some(result);
                })
                .expect("spawn failed");
        }

        pool.run_until_stalled();
        assert!(outcome.borrow().is_none());
        assert_eq!(world.write_count(), 0);
        assert_eq!(world.pending_loads(), 1);

        world.tick();
        pool.run_until_stalled();
        let report = outcome
            .borrow_mut()
            .take()
            .expect("placement did not finish")
            .expect("place failed");
        assert_eq!(report.voxels, 2);
        assert_eq!(report.chunks_loaded, 1);
    }

    #[test]
    fn test_rollback_restores_air() {
        let world = FlakyWorld::new(3, None);
        let mut ops = column(5);
        ops[1].contents = Some(vec![(0, ItemStack::new(1, 0, 1))]);
        ops[1].block = BlockState::of(block_ids::CHEST);
        let template = template(ops, None);
        let anchor = BlockPos::new(0, 60, 0);

        let err = block_on(place(&world, &template, anchor, &PlacementOptions::default()))
            .expect_err("placement should fail");
        assert!(matches!(
            err,
            PlacementError::RolledBack { rolled_back: 3, .. }
        ));
        assert_eq!(err.failed_at(), BlockPos::new(0, 63, 0));
        for y in 60..65 {
            let pos = BlockPos::new(0, y, 0);
            assert!(world.block(pos).expect("read failed").is_air());
            assert_eq!(world.block_entity(pos).expect("read failed"), None);
        }
    }

    #[test]
    fn test_rollback_incomplete_is_reported() {
        let stuck = BlockPos::new(0, 61, 0);
        let world = FlakyWorld::new(3, Some(stuck));
        let template = template(column(5), None);

        let err = block_on(place(&world, &template, BlockPos::new(0, 60, 0), &PlacementOptions::default()))
            .expect_err("placement should fail");
        match err {
            PlacementError::RollbackIncomplete { stuck: left, .. } => assert_eq!(left, vec![stuck]),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!world.block(stuck).expect("read failed").is_air());
    }

    #[test]
    fn test_config_chest_and_entities() {
        let world = MemoryWorld::new(MemoryWorldConfig::default());
        let mut chest = PlacementOp::block(BlockPos::new(0, 0, 0), BlockState::of(block_ids::CHEST));
        chest.contents = Some(vec![(0, ItemStack::new(1, 0, 1))]);
        let mut template = template(vec![chest], None);
        template.meta.use_config_chest = true;
        template.meta.paste_entities = true;
        template.entities.push(TemplateEntity {
            kind: "Cow".into(),
            position: DVec3::new(0.5, 1.0, 0.5),
            motion: DVec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
        });

        let options = PlacementOptions::for_template(
            &template,
            Biome::Desert,
            vec![(3, ItemStack::new(264, 0, 2))],
        );
        let anchor = BlockPos::new(20, 60, 20);
        let report = block_on(place(&world, &template, anchor, &options)).expect("place failed");
        assert_eq!(report.entities, 1);
        assert_eq!(
            world.block_entity(anchor).expect("read failed"),
            Some(BlockEntity::Container {
                items: vec![(3, ItemStack::new(264, 0, 2))]
            })
        );
        assert_eq!(world.biome(20, 20).expect("read failed"), Biome::Desert);
        assert_eq!(world.spawned_entities()[0].position, DVec3::new(20.5, 61.0, 20.5));
    }

    #[test]
    fn test_safe_home() {
        let world = MemoryWorld::new(MemoryWorldConfig::default());
        block_on(place(&world, &template(column(3), None), BlockPos::new(4, 60, 4), &PlacementOptions::default()))
            .expect("place failed");
        assert_eq!(safe_home(&world, BlockPos::new(4, 60, 4)), Some(BlockPos::new(4, 63, 4)));
    }
}
