//! Error types shared by the world surface and its callers.

use thiserror::Error;

use crate::coords::{BlockPos, ChunkPos};

/// Errors raised by the world-mutation surface.
#[derive(Debug, Error)]
pub enum WorldError {
    /// Chunk is not resident
    #[error("Chunk not resident at {0}")]
    ChunkNotResident(ChunkPos),

    /// Chunk load failed
    #[error("Failed to load chunk {chunk}: {reason}")]
    LoadFailed {
        /// Chunk that failed to load
        chunk: ChunkPos,
        /// Failure description
        reason: String,
    },

    /// Position outside the world's vertical range
    #[error("Position {0} is out of bounds")]
    OutOfBounds(BlockPos),

    /// Block write rejected
    #[error("Failed to write block at {pos}: {reason}")]
    WriteFailed {
        /// Target position
        pos: BlockPos,
        /// Failure description
        reason: String,
    },

    /// Chunk regeneration failed
    #[error("Failed to regenerate chunk {chunk}: {reason}")]
    RegenerateFailed {
        /// Chunk being regenerated
        chunk: ChunkPos,
        /// Failure description
        reason: String,
    },

    /// Named world does not exist
    #[error("Unknown world: {0}")]
    UnknownWorld(String),
}

/// Result type alias for world operations.
pub type WorldResult<T> = Result<T, WorldError>;
