//! ID types for cells, templates and owners.

use serde::{Deserialize, Serialize};

/// Key of one grid cell. Two columns share a key iff they lie in the same
/// spacing-by-spacing cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCellKey(i64);

impl GridCellKey {
    /// Multiplier applied to the Z cell index.
    ///
    /// Cell indices are `i32`, so the X index spans exactly `2^32` values and
    /// every `(cx, cz)` pair maps to a distinct key, negative cells included.
    pub const Z_MULTIPLIER: i64 = 1 << 32;

    /// Builds a key from cell indices.
    #[must_use]
    pub const fn from_cell(cell_x: i32, cell_z: i32) -> Self {
        Self((cell_x as i64).wrapping_add((cell_z as i64).wrapping_mul(Self::Z_MULTIPLIER)))
    }

    /// Creates a key from a raw value (for deserialization).
    #[must_use]
    pub const fn from_raw(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw key value.
    #[must_use]
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Recovers the `(cell_x, cell_z)` indices encoded in this key.
    #[must_use]
    pub const fn cell(self) -> (i32, i32) {
        let cell_x = self.0 as i32;
        let cell_z = self.0.wrapping_sub(cell_x as i64) >> 32;
        (cell_x, cell_z as i32)
    }
}

impl std::fmt::Display for GridCellKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a loaded structure template (1-based, in load order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TemplateId(u32);

impl TemplateId {
    /// Creates a template ID from a raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for TemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of a parcel owner. Matched case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerId(String);

impl OwnerId {
    /// Creates an owner ID.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the owner name as given.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for OwnerId {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for OwnerId {}

impl std::hash::Hash for OwnerId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        for byte in self.0.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
