//! Decoded structure templates.
//!
//! A [`StructureTemplate`] is produced once per template file and shared
//! (behind an `Arc`) by every placement of that template.

use glam::DVec3;
use skyisle_common::{Biome, BlockPos, BlockState, ItemStack, TemplateId};

/// Default display name of a template.
pub const DEFAULT_TEMPLATE_NAME: &str = "Island";

/// Default template description.
pub const DEFAULT_DESCRIPTION: &str = "The island";

/// One voxel to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementOp {
    /// Template-local position
    pub offset: BlockPos,
    /// Block type and auxiliary data
    pub block: BlockState,
    /// Container contents by slot
    pub contents: Option<Vec<(u8, ItemStack)>>,
    /// Sign text lines
    pub text: Option<Vec<String>>,
}

impl PlacementOp {
    /// Creates a plain block op.
    #[must_use]
    pub const fn block(offset: BlockPos, block: BlockState) -> Self {
        Self {
            offset,
            block,
            contents: None,
            text: None,
        }
    }

    /// Whether this op creates block-entity state.
    #[must_use]
    pub const fn has_block_entity(&self) -> bool {
        self.contents.is_some() || self.text.is_some()
    }
}

/// A mobile entity stored in a template.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateEntity {
    /// Entity type name
    pub kind: String,
    /// Template-local position
    pub position: DVec3,
    /// Velocity
    pub motion: DVec3,
    /// Yaw in degrees
    pub yaw: f32,
    /// Pitch in degrees
    pub pitch: f32,
}

/// Per-template configuration merged on after geometry decode.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateMeta {
    /// Display name
    pub name: String,
    /// Description
    pub description: String,
    /// Permission required to choose it (empty = none)
    pub permission: String,
    /// Biome written under the parcel
    pub biome: Biome,
    /// Difficulty rating
    pub rating: f64,
    /// Candidate for the default template
    pub default_priority: bool,
    /// Fill containers from the external chest configuration
    pub use_config_chest: bool,
    /// Spawn stored mobile entities on placement
    pub paste_entities: bool,
    /// Block marking the player spawn point
    pub block_spawn: Option<BlockState>,
}

impl Default for TemplateMeta {
    fn default() -> Self {
        Self {
            name: DEFAULT_TEMPLATE_NAME.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            permission: String::new(),
            biome: Biome::Plains,
            rating: 0.0,
            default_priority: false,
            use_config_chest: false,
            paste_entities: false,
            block_spawn: None,
        }
    }
}

/// A decoded, immutable structure template.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureTemplate {
    /// Registry id
    pub id: TemplateId,
    /// X extent
    pub width: u16,
    /// Z extent
    pub length: u16,
    /// Y extent
    pub height: u16,
    /// Voxels to write, in (y, z, x) order
    pub ops: Vec<PlacementOp>,
    /// Highest anchor block, template-local
    pub anchor: Option<BlockPos>,
    /// Stored mobile entities
    pub entities: Vec<TemplateEntity>,
    /// Merged configuration
    pub meta: TemplateMeta,
    /// Container items dropped during decode
    pub skipped_items: usize,
}

impl StructureTemplate {
    /// Anchor position, or the template origin when it has no anchor block.
    #[must_use]
    pub fn anchor_or_origin(&self) -> BlockPos {
        self.anchor.unwrap_or(BlockPos::new(0, 0, 0))
    }

    /// Assigns the registry id and merged metadata.
    #[must_use]
    pub fn with_meta(mut self, id: TemplateId, meta: TemplateMeta) -> Self {
        self.id = id;
        self.meta = meta;
        self
    }

    /// Ops that carry block-entity state.
    pub fn block_entity_ops(&self) -> impl Iterator<Item = &PlacementOp> {
        self.ops.iter().filter(|op| op.has_block_entity())
    }

    /// Position of the first spawn block, template-local.
    #[must_use]
    pub fn spawn_offset(&self) -> Option<BlockPos> {
        let spawn = self.meta.block_spawn?;
        self.ops
            .iter()
            .find(|op| op.block.id == spawn.id && (spawn.data == 0 || op.block.data == spawn.data))
            .map(|op| op.offset)
    }
}
