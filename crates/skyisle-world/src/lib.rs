//! # SkyIsle World
//!
//! World management for SkyIsle.
//!
//! This crate handles:
//! - The world-mutation surface the island core writes through
//! - Chunk storage (blocks, biomes, block entities)
//! - Chunk residency tickets (asynchronous "chunk ready" notifications)
//! - Void chunk generation and regeneration
//! - An in-memory reference world

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod chunk;
pub mod generation;
pub mod memory;
pub mod readiness;
pub mod surface;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::chunk::*;
    pub use crate::generation::*;
    pub use crate::memory::*;
    pub use crate::readiness::*;
    pub use crate::surface::*;
}

pub use prelude::*;
