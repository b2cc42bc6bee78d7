//! Built-in island used when no template is configured.
//!
//! A bedrock core under a rounded dirt platform topped with grass, a sand
//! column through the middle, an oak tree on top and a starter chest. The
//! layout is produced as a [`StructureTemplate`] so it goes through the same
//! placement and rollback path as decoded templates.

use std::collections::BTreeMap;

use skyisle_common::{block_ids, BlockPos, BlockState, TemplateId};
use skyisle_schematic::{PlacementOp, StructureTemplate, TemplateMeta};

/// Height of the tree base above the bedrock core.
pub const TREE_BASE: i32 = 7;

/// Offset of the starter chest from the bedrock core.
pub const CHEST_OFFSET: BlockPos = BlockPos::new(-1, TREE_BASE, 0);

/// Home offset from the bedrock core.
pub const HOME_OFFSET: BlockPos = BlockPos::new(1, TREE_BASE, 1);

/// Oak trunk data value.
const OAK: u8 = 0;

/// Builds the default island layout around `(0, 0, 0)` (the bedrock core).
///
/// `seed` varies the tree.
#[must_use]
pub fn default_island(seed: u64) -> StructureTemplate {
    let mut blocks: BTreeMap<(i32, i32, i32), BlockState> = BTreeMap::new();
    let mut put = |x: i32, y: i32, z: i32, block: BlockState| {
        // keyed (y, z, x) so iteration follows placement order
        blocks.insert((y, z, x), block);
    };
    let dirt = BlockState::of(block_ids::DIRT);

    put(0, 0, 0, BlockState::of(block_ids::BEDROCK));
    for (radius, layers) in [(1, [1, 2]), (2, [3, 4])] {
        for x in -radius..=radius {
            for z in -radius..=radius {
                for y in layers {
                    put(x, y, z, dirt);
                }
            }
        }
    }
    for x in -3..=3 {
        for z in -3..=3 {
            put(x, 5, z, dirt);
            put(x, 6, z, BlockState::of(block_ids::GRASS));
        }
    }

    // Round the silhouette by cutting the corners of each tier.
    for (radius, layers) in [(3, &[5, 6][..]), (2, &[3][..]), (1, &[1][..])] {
        for x in [-radius, radius] {
            for z in [-radius, radius] {
                for &y in layers {
                    blocks.remove(&(y, z, x));
                }
            }
        }
    }

    for y in 1..=5 {
        blocks.insert((y, 0, 0), BlockState::of(block_ids::SAND));
    }

    let mut rng = fastrand::Rng::with_seed(seed);
    grow_oak(&mut blocks, &mut rng);

    let mut ops: Vec<PlacementOp> = blocks
        .into_iter()
        .map(|((y, z, x), block)| PlacementOp::block(BlockPos::new(x, y, z), block))
        .collect();
    ops.push(PlacementOp {
        offset: CHEST_OFFSET,
        block: BlockState::of(block_ids::CHEST),
        contents: Some(Vec::new()),
        text: None,
    });

    StructureTemplate {
        id: TemplateId::new(0),
        width: 7,
        length: 7,
        height: 16,
        ops,
        anchor: Some(BlockPos::new(0, 0, 0)),
        entities: Vec::new(),
        meta: TemplateMeta {
            use_config_chest: true,
            ..TemplateMeta::default()
        },
        skipped_items: 0,
    }
}

/// Small oak: a 4-6 block trunk with a two-tier canopy and a cross on top.
fn grow_oak(blocks: &mut BTreeMap<(i32, i32, i32), BlockState>, rng: &mut fastrand::Rng) {
    let trunk = rng.i32(4..=6);
    let top = TREE_BASE + trunk - 1;
    let leaves = BlockState::new(block_ids::LEAVES, OAK);

    for y in top - 2..=top + 1 {
        let radius: i32 = if y >= top { 1 } else { 2 };
        for x in -radius..=radius {
            for z in -radius..=radius {
                let corner = x.abs() == radius && z.abs() == radius;
                if corner && (y > top || rng.bool()) {
                    continue;
                }
                blocks.entry((y, z, x)).or_insert(leaves);
            }
        }
    }
    for y in TREE_BASE..=top {
        blocks.insert((y, 0, 0), BlockState::new(block_ids::LOG, OAK));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_at(template: &StructureTemplate, pos: BlockPos) -> Option<BlockState> {
        template.ops.iter().find(|op| op.offset == pos).map(|op| op.block)
    }

    #[test]
    fn test_core_layers() {
        let island = default_island(1);
        assert_eq!(block_at(&island, BlockPos::new(0, 0, 0)), Some(BlockState::of(block_ids::BEDROCK)));
        for y in 1..=5 {
            assert_eq!(block_at(&island, BlockPos::new(0, y, 0)), Some(BlockState::of(block_ids::SAND)));
        }
        assert_eq!(block_at(&island, BlockPos::new(2, 6, -2)), Some(BlockState::of(block_ids::GRASS)));
        assert_eq!(
            block_at(&island, BlockPos::new(0, TREE_BASE, 0)).map(|b| b.id),
            Some(block_ids::LOG)
        );
    }

    #[test]
    fn test_corners_cut() {
        let island = default_island(1);
        assert_eq!(block_at(&island, BlockPos::new(3, 6, 3)), None);
        assert_eq!(block_at(&island, BlockPos::new(-3, 5, 3)), None);
        assert_eq!(block_at(&island, BlockPos::new(2, 3, -2)), None);
        assert_eq!(block_at(&island, BlockPos::new(1, 1, 1)), None);
        assert_eq!(block_at(&island, BlockPos::new(2, 4, 2)), Some(BlockState::of(block_ids::DIRT)));
    }

    #[test]
    fn test_canopy_shape() {
        for seed in 0..16 {
            let island = default_island(seed);
            let leaves: Vec<BlockPos> = island
                .ops
                .iter()
                .filter(|op| op.block.id == block_ids::LEAVES)
                .map(|op| op.offset)
                .collect();
            let top = leaves.iter().map(|p| p.y).max().expect("no leaves");
            assert!(leaves.iter().all(|p| p.x.abs() <= 2 && p.z.abs() <= 2));
            // The crown is a plus sign one block wide.
            assert!(leaves
                .iter()
                .filter(|p| p.y == top)
                .all(|p| p.x.abs() + p.z.abs() <= 1));
            assert!(leaves.iter().filter(|p| p.y >= top - 1).all(|p| p.x.abs() <= 1 && p.z.abs() <= 1));
        }
    }

    #[test]
    fn test_no_duplicate_positions() {
        let island = default_island(42);
        let mut seen = std::collections::HashSet::new();
        assert!(island.ops.iter().all(|op| seen.insert(op.offset)));
        assert_eq!(island.block_entity_ops().count(), 1);
    }

    #[test]
    fn test_seed_is_deterministic() {
        assert_eq!(default_island(9), default_island(9));
    }
}
