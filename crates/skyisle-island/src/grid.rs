//! Grid allocation of island cells.
//!
//! The world is divided into `spacing x spacing` cells, one island per cell.
//! Islands sit at cell centers. The free-cell search is bounded; exhausting
//! the bound is fatal for that creation request.

use skyisle_common::{BlockRect, GridCellKey};
use tracing::debug;

use crate::error::AllocationExhausted;
use crate::settings::{AllocationStrategy, IslandSettings};

/// Cell key of a column: `floor(x / spacing) + floor(z / spacing) * 2^32`.
#[must_use]
pub const fn cell_key(x: i32, z: i32, spacing: i32) -> GridCellKey {
    GridCellKey::from_cell(x.div_euclid(spacing), z.div_euclid(spacing))
}

/// Bounded free-cell search over the island grid.
#[derive(Debug, Clone)]
pub struct GridAllocator {
    spacing: i32,
    max_iterations: u32,
    strategy: AllocationStrategy,
    rng: fastrand::Rng,
}

impl GridAllocator {
    /// Creates an allocator. A `seed` makes the random strategy reproducible.
    #[must_use]
    pub fn new(spacing: i32, max_iterations: u32, strategy: AllocationStrategy, seed: Option<u64>) -> Self {
        Self {
            spacing: spacing.max(1),
            max_iterations: max_iterations.max(1),
            strategy,
            rng: seed.map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed),
        }
    }

    /// Creates an allocator from island settings.
    #[must_use]
    pub fn from_settings(settings: &IslandSettings) -> Self {
        Self::new(
            settings.island_distance,
            settings.search_iterations,
            settings.allocation_strategy,
            settings.allocator_seed,
        )
    }

    /// Cell spacing.
    #[must_use]
    pub const fn spacing(&self) -> i32 {
        self.spacing
    }

    /// Search strategy.
    #[must_use]
    pub const fn strategy(&self) -> AllocationStrategy {
        self.strategy
    }

    /// Cell key of a column.
    #[must_use]
    pub const fn cell_key(&self, x: i32, z: i32) -> GridCellKey {
        cell_key(x, z, self.spacing)
    }

    /// Center column of a cell.
    #[must_use]
    pub const fn cell_center(&self, key: GridCellKey) -> (i32, i32) {
        let (cx, cz) = key.cell();
        (
            cx * self.spacing + self.spacing / 2,
            cz * self.spacing + self.spacing / 2,
        )
    }

    /// Full extent of a cell.
    #[must_use]
    pub const fn cell_bounds(&self, key: GridCellKey) -> BlockRect {
        let (cx, cz) = key.cell();
        BlockRect::new(
            cx * self.spacing,
            cz * self.spacing,
            (cx + 1) * self.spacing,
            (cz + 1) * self.spacing,
        )
    }

    /// Finds the center of a cell for which `is_occupied` is false.
    ///
    /// The caller must commit the cell before anything else can claim it.
    pub fn find_free_cell(
        &mut self,
        is_occupied: impl Fn(GridCellKey) -> bool,
    ) -> Result<(i32, i32), AllocationExhausted> {
        let found = match self.strategy {
            AllocationStrategy::Random => self.search_random(&is_occupied),
            AllocationStrategy::Spiral => self.search_spiral(&is_occupied),
        };
        match found {
            Some((x, z, iterations)) => {
                debug!("Found free cell at ({}, {}) after {} iterations", x, z, iterations + 1);
                Ok((x, z))
            },
            None => Err(AllocationExhausted {
                iterations: self.max_iterations,
            }),
        }
    }

    /// Random candidate inside a square of side `i * 2 * spacing`, snapped
    /// to the cell center.
    fn search_random(&mut self, is_occupied: &impl Fn(GridCellKey) -> bool) -> Option<(i32, i32, u32)> {
        let spacing = i64::from(self.spacing);
        for i in 0..self.max_iterations {
            let width = i64::from(i) * 2 * spacing;
            let (wx, wz) = if width == 0 {
                (0, 0)
            } else {
                (self.rng.i64(0..width), self.rng.i64(0..width))
            };
            let snap = |v: i64| v - v % spacing + spacing / 2;
            let (Ok(x), Ok(z)) = (i32::try_from(snap(wx)), i32::try_from(snap(wz))) else {
                return None;
            };
            if !is_occupied(self.cell_key(x, z)) {
                return Some((x, z, i));
            }
        }
        None
    }

    /// Cells in rings of growing Chebyshev radius around the origin cell.
    fn search_spiral(&self, is_occupied: &impl Fn(GridCellKey) -> bool) -> Option<(i32, i32, u32)> {
        let mut iterations = 0u32;
        let mut ring = 0i32;
        loop {
            for (cx, cz) in ring_cells(ring) {
                if iterations >= self.max_iterations {
                    return None;
                }
                let key = GridCellKey::from_cell(cx, cz);
                if !is_occupied(key) {
                    let (x, z) = self.cell_center(key);
                    return Some((x, z, iterations));
                }
                iterations += 1;
            }
            ring = ring.checked_add(1)?;
        }
    }
}

/// Cells at Chebyshev distance `ring` from the origin cell.
fn ring_cells(ring: i32) -> Vec<(i32, i32)> {
    if ring == 0 {
        return vec![(0, 0)];
    }
    let mut cells = Vec::with_capacity(8 * ring as usize);
    for x in -ring..ring {
        cells.push((x, -ring));
    }
    for z in -ring..ring {
        cells.push((ring, z));
    }
    for x in (-ring + 1..=ring).rev() {
        cells.push((x, ring));
    }
    for z in (-ring + 1..=ring).rev() {
        cells.push((-ring, z));
    }
    cells
}
