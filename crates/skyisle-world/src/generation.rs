//! Chunk generation for island worlds.

use skyisle_common::{Biome, ChunkPos};

use crate::chunk::Chunk;

/// Produces fresh chunk contents, used both for first load and regeneration.
pub trait ChunkGenerator: Send + Sync {
    /// Generates a chunk at the given coordinate.
    fn generate(&self, pos: ChunkPos, height: i32) -> Chunk;

    /// Generator name.
    fn name(&self) -> &str;
}

/// Generator configuration.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Biome written to every column
    pub biome: Biome,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            biome: Biome::Plains,
        }
    }
}

/// Empty-sky generator: no blocks, a single biome everywhere.
#[derive(Debug, Clone, Default)]
pub struct VoidGenerator {
    /// Configuration
    config: GeneratorConfig,
}

impl VoidGenerator {
    /// Creates a new generator with the given config.
    #[must_use]
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// Returns the generator configuration.
    #[must_use]
    pub const fn config(&self) -> &GeneratorConfig {
        &self.config
    }
}

impl ChunkGenerator for VoidGenerator {
    fn generate(&self, pos: ChunkPos, height: i32) -> Chunk {
        let mut chunk = Chunk::new(pos, height);
        chunk.fill_biome(self.config.biome);
        chunk.mark_clean(); // Generated chunks start clean
        chunk
    }

    fn name(&self) -> &str {
        "island"
    }
}
