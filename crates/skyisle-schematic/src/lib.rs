//! # SkyIsle Schematic
//!
//! Structure template decoding for SkyIsle.
//!
//! This crate provides:
//! - The schematic decoder producing ordered placement ops, on top of
//!   `quartz_nbt` for the tag format itself
//! - Item resolution for numeric and namespaced item ids
//! - The per-template configuration overlay
//! - A template registry with an explicit decode cache

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod error;
pub mod items;
pub mod registry;
pub mod schematic;
pub mod template;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::{TemplateConfig, TemplateEntry, CONFIG_FILE};
    pub use crate::error::*;
    pub use crate::items::*;
    pub use crate::registry::*;
    pub use crate::schematic::{decode_schematic, DecodeSettings};
    pub use crate::template::*;
}

pub use prelude::*;
pub use quartz_nbt;
