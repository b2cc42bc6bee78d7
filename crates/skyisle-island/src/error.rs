//! Island lifecycle errors.
//!
//! Failures are isolated at the smallest unit that can absorb them (one
//! item, one template, one chunk unit). Whatever cannot be absorbed surfaces
//! as an [`IslandError`] for the caller to report; nothing here panics.

use skyisle_common::{BlockPos, GridCellKey, OwnerId, WorldError};
use skyisle_schematic::RegistryError;
use thiserror::Error;

/// No free cell was found within the search bound.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("No free cell found within {iterations} search iterations")]
pub struct AllocationExhausted {
    /// Iterations performed
    pub iterations: u32,
}

/// A world write failed while pasting a template.
#[derive(Debug, Error)]
pub enum PlacementError {
    /// Every voxel written by this placement was reset
    #[error("Placement failed at {failed_at} ({source}); rolled back {rolled_back} voxels")]
    RolledBack {
        /// Position whose write failed
        failed_at: BlockPos,
        /// Voxels reset to empty
        rolled_back: usize,
        /// Underlying world error
        #[source]
        source: WorldError,
    },
    /// Some voxels could not be reset; the parcel is partially placed
    #[error("Placement failed at {failed_at} ({source}); rollback left {} voxels in place", .stuck.len())]
    RollbackIncomplete {
        /// Position whose write failed
        failed_at: BlockPos,
        /// Voxels that could not be reset
        stuck: Vec<BlockPos>,
        /// Underlying world error
        #[source]
        source: WorldError,
    },
}

impl PlacementError {
    /// Position whose write triggered the rollback.
    #[must_use]
    pub const fn failed_at(&self) -> BlockPos {
        match self {
            Self::RolledBack { failed_at, .. } | Self::RollbackIncomplete { failed_at, .. } => {
                *failed_at
            },
        }
    }
}

/// Result type for placement.
pub type PlacementResult<T> = Result<T, PlacementError>;

/// Parcel store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A parcel already owns this cell
    #[error("Cell {0} is already claimed")]
    CellTaken(GridCellKey),
    /// No parcel owns this cell
    #[error("No parcel at cell {0}")]
    NotFound(GridCellKey),
    /// Snapshot file error
    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Snapshot encoding error
    #[error("Snapshot format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A teardown finished but its parcel record was already gone.
///
/// The footprint may have been reused in between; this is reported, not
/// repaired.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("Teardown of cell {key} finished but its parcel record was already removed")]
pub struct TeardownInconsistency {
    /// Cell that was torn down
    pub key: GridCellKey,
}

/// Errors surfaced to the command layer.
#[derive(Debug, Error)]
pub enum IslandError {
    /// Grid search exhausted
    #[error(transparent)]
    Allocation(#[from] AllocationExhausted),
    /// Paste failed (after rollback)
    #[error(transparent)]
    Placement(#[from] PlacementError),
    /// Store failure
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Template lookup or decode failure
    #[error(transparent)]
    Template(#[from] RegistryError),
    /// World access failure outside a placement
    #[error(transparent)]
    World(#[from] WorldError),
    /// Owner reached the island limit
    #[error("{owner} already owns {count} of {max} islands")]
    HomeLimit {
        /// Owner
        owner: OwnerId,
        /// Islands owned
        count: u32,
        /// Configured maximum
        max: u32,
    },
    /// Owner has no island in this slot
    #[error("{owner} has no island in slot {slot}")]
    NoSuchIsland {
        /// Owner
        owner: OwnerId,
        /// Island slot
        slot: u32,
    },
    /// Island is already being torn down
    #[error("Island at cell {0} is being removed")]
    TeardownPending(GridCellKey),
    /// Owner used up their resets
    #[error("{0} has no resets left")]
    NoResetsLeft(OwnerId),
    /// No template matches the requested name
    #[error("No island template named '{0}'")]
    UnknownTemplate(String),
    /// A home must lie inside the protected area
    #[error("{0} is outside the island")]
    HomeOutsideIsland(BlockPos),
}

/// Result type for island operations.
pub type IslandResult<T> = Result<T, IslandError>;
