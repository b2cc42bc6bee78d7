//! Coordinate types for block, chunk, and chunk-local positions.

use serde::{Deserialize, Serialize};

/// Width of a chunk column along X and Z, in blocks.
pub const CHUNK_WIDTH: i32 = 16;

/// Bit shift equivalent of [`CHUNK_WIDTH`].
pub const CHUNK_SHIFT: i32 = 4;

/// Absolute block position in world space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct BlockPos {
    /// X coordinate in world space
    pub x: i32,
    /// Y coordinate (height) in world space
    pub y: i32,
    /// Z coordinate in world space
    pub z: i32,
}

impl BlockPos {
    /// Creates a new block position.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Returns this position shifted by the given deltas.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }

    /// Adds another position component-wise.
    #[must_use]
    pub const fn add(self, other: Self) -> Self {
        self.offset(other.x, other.y, other.z)
    }

    /// Subtracts another position component-wise.
    #[must_use]
    pub const fn sub(self, other: Self) -> Self {
        self.offset(-other.x, -other.y, -other.z)
    }

    /// Converts to the coordinate of the chunk containing this block.
    #[must_use]
    pub const fn chunk(self) -> ChunkPos {
        ChunkPos {
            x: self.x >> CHUNK_SHIFT,
            z: self.z >> CHUNK_SHIFT,
        }
    }

    /// Converts to a position local to the containing chunk.
    #[must_use]
    pub const fn local(self) -> LocalPos {
        LocalPos {
            x: self.x.rem_euclid(CHUNK_WIDTH) as u8,
            y: self.y,
            z: self.z.rem_euclid(CHUNK_WIDTH) as u8,
        }
    }
}

impl std::fmt::Display for BlockPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Chunk coordinate (identifies a 16-wide column of the world).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkPos {
    /// X coordinate in chunk space
    pub x: i32,
    /// Z coordinate in chunk space
    pub z: i32,
}

impl ChunkPos {
    /// Creates a new chunk coordinate.
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// X coordinate of the first block column in this chunk.
    #[must_use]
    pub const fn min_block_x(self) -> i32 {
        self.x << CHUNK_SHIFT
    }

    /// Z coordinate of the first block column in this chunk.
    #[must_use]
    pub const fn min_block_z(self) -> i32 {
        self.z << CHUNK_SHIFT
    }

    /// Block-space footprint of this chunk.
    #[must_use]
    pub const fn bounds(self) -> BlockRect {
        BlockRect::new(
            self.min_block_x(),
            self.min_block_z(),
            self.min_block_x() + CHUNK_WIDTH,
            self.min_block_z() + CHUNK_WIDTH,
        )
    }
}

impl std::fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.x, self.z)
    }
}

/// Position within a chunk: X/Z in `0..16`, Y unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalPos {
    /// X coordinate within chunk
    pub x: u8,
    /// Height
    pub y: i32,
    /// Z coordinate within chunk
    pub z: u8,
}

impl LocalPos {
    /// Creates a new local coordinate.
    #[must_use]
    pub const fn new(x: u8, y: i32, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Index of this position's column within the chunk (`z * 16 + x`).
    #[must_use]
    pub const fn column_index(self) -> usize {
        (self.z as usize) * (CHUNK_WIDTH as usize) + (self.x as usize)
    }

    /// Converts to a linear index for a chunk of the given height.
    ///
    /// Returns `None` when the height is outside `0..height`.
    #[must_use]
    pub const fn to_index(self, height: i32) -> Option<usize> {
        if self.y < 0 || self.y >= height {
            return None;
        }
        Some((self.y as usize) * (CHUNK_WIDTH * CHUNK_WIDTH) as usize + self.column_index())
    }
}

/// Half-open axis-aligned rectangle on the X/Z plane: `[min, max)` on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockRect {
    /// Inclusive minimum X
    pub min_x: i32,
    /// Inclusive minimum Z
    pub min_z: i32,
    /// Exclusive maximum X
    pub max_x: i32,
    /// Exclusive maximum Z
    pub max_z: i32,
}

impl BlockRect {
    /// Creates a new rectangle from its corners.
    #[must_use]
    pub const fn new(min_x: i32, min_z: i32, max_x: i32, max_z: i32) -> Self {
        Self {
            min_x,
            min_z,
            max_x,
            max_z,
        }
    }

    /// Square rectangle of side `2 * half` centred on a column.
    #[must_use]
    pub const fn centered(center_x: i32, center_z: i32, half: i32) -> Self {
        Self::new(
            center_x - half,
            center_z - half,
            center_x + half,
            center_z + half,
        )
    }

    /// Grows the rectangle by `amount` on every side.
    #[must_use]
    pub const fn expand(self, amount: i32) -> Self {
        Self::new(
            self.min_x - amount,
            self.min_z - amount,
            self.max_x + amount,
            self.max_z + amount,
        )
    }

    /// Whether the rectangle covers no columns.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.min_x >= self.max_x || self.min_z >= self.max_z
    }

    /// Whether the column `(x, z)` lies inside.
    #[must_use]
    pub const fn contains(&self, x: i32, z: i32) -> bool {
        x >= self.min_x && x < self.max_x && z >= self.min_z && z < self.max_z
    }

    /// Whether `other` lies entirely inside this rectangle.
    #[must_use]
    pub const fn contains_rect(&self, other: &Self) -> bool {
        other.min_x >= self.min_x
            && other.max_x <= self.max_x
            && other.min_z >= self.min_z
            && other.max_z <= self.max_z
    }

    /// Whether the two rectangles share at least one column.
    #[must_use]
    pub const fn intersects(&self, other: &Self) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min_x < other.max_x
            && other.min_x < self.max_x
            && self.min_z < other.max_z
            && other.min_z < self.max_z
    }

    /// Every chunk that overlaps this rectangle, row by row.
    #[must_use]
    pub fn chunks(&self) -> Vec<ChunkPos> {
        if self.is_empty() {
            return Vec::new();
        }
        let min_cx = self.min_x >> CHUNK_SHIFT;
        let min_cz = self.min_z >> CHUNK_SHIFT;
        let max_cx = (self.max_x - 1) >> CHUNK_SHIFT;
        let max_cz = (self.max_z - 1) >> CHUNK_SHIFT;

        let mut chunks = Vec::with_capacity(((max_cx - min_cx + 1) * (max_cz - min_cz + 1)) as usize);
        for cz in min_cz..=max_cz {
            for cx in min_cx..=max_cx {
                chunks.push(ChunkPos::new(cx, cz));
            }
        }
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_block_maps_to_negative_chunk() {
        assert_eq!(BlockPos::new(-16, 0, -17).chunk(), ChunkPos::new(-1, -2));
        assert_eq!(BlockPos::new(-17, 0, 0).local().x, 15);
    }

    #[test]
    fn test_local_index_bounds() {
        let local = LocalPos::new(3, 10, 2);
        assert_eq!(local.to_index(256), Some(10 * 256 + 2 * 16 + 3));
        assert_eq!(LocalPos::new(0, -1, 0).to_index(256), None);
        assert_eq!(LocalPos::new(0, 256, 0).to_index(256), None);
    }

    #[test]
    fn test_rect_chunk_cover() {
        let rect = BlockRect::new(0, 0, 16, 16);
        assert_eq!(rect.chunks(), vec![ChunkPos::new(0, 0)]);

        let rect = BlockRect::new(-1, 0, 17, 1);
        assert_eq!(rect.chunks().len(), 3);
    }

    #[test]
    fn test_rect_containment() {
        let outer = BlockRect::centered(50, 50, 50);
        assert!(outer.contains(0, 0));
        assert!(!outer.contains(100, 50));
        assert!(outer.contains_rect(&ChunkPos::new(0, 0).bounds()));
        assert!(!outer.contains_rect(&ChunkPos::new(6, 0).bounds()));
        assert!(outer.intersects(&ChunkPos::new(6, 0).bounds()));
        assert!(!outer.intersects(&ChunkPos::new(7, 0).bounds()));
    }
}
