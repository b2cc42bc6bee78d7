//! Template configuration overlay.
//!
//! `configuration.toml` in the template directory lists which files to load
//! and carries per-template metadata:
//!
//! ```toml
//! enable = true
//!
//! [schematic.classic]
//! file_name = "classic.schematic"
//! name = "&aClassic"
//! biome = "Plains"
//! default_priority = true
//! block_spawn = "54:0"
//! ```

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use skyisle_common::{Biome, BlockState};
use tracing::warn;

use crate::error::{RegistryError, RegistryResult};
use crate::template::{TemplateMeta, DEFAULT_DESCRIPTION, DEFAULT_TEMPLATE_NAME};

/// Configuration file name inside the template directory.
pub const CONFIG_FILE: &str = "configuration.toml";

/// Parsed template configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Load templates at all; otherwise the procedural island is used
    pub enable: bool,
    /// Entries keyed by configuration key, in file order
    pub schematic: IndexMap<String, TemplateEntry>,
}

/// One `[schematic.<key>]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateEntry {
    /// Template file, relative to the template directory
    pub file_name: String,
    /// Display name (`&` colour codes allowed)
    pub name: Option<String>,
    /// Description
    pub description: Option<String>,
    /// Required permission
    pub permission: Option<String>,
    /// Biome name
    pub biome: Option<String>,
    /// Difficulty rating
    pub rating: Option<f64>,
    /// Candidate for the default template
    pub default_priority: bool,
    /// Fill containers from the external chest configuration
    pub use_config_chest: bool,
    /// Spawn stored mobile entities
    pub paste_entities: bool,
    /// Spawn marker block as `"id"` or `"id:data"`
    pub block_spawn: Option<String>,
}

impl TemplateConfig {
    /// Loads the configuration from a template directory.
    ///
    /// A missing file yields `Ok(None)`.
    pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> RegistryResult<Option<Self>> {
        let path = dir.as_ref().join(CONFIG_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path).map_err(|source| RegistryError::Io {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&contents)
            .map(Some)
            .map_err(|source| RegistryError::Config { path, source })
    }
}

impl TemplateEntry {
    /// Metadata with absent keys replaced by defaults.
    #[must_use]
    pub fn to_meta(&self) -> TemplateMeta {
        let biome = match self.biome.as_deref() {
            None => Biome::Plains,
            Some(name) => Biome::from_name(name).unwrap_or_else(|| {
                warn!("Unknown biome '{}' for template {}, using Plains", name, self.file_name);
                Biome::Plains
            }),
        };
        TemplateMeta {
            name: self
                .name
                .as_deref()
                .unwrap_or(DEFAULT_TEMPLATE_NAME)
                .replace('&', "\u{a7}"),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            permission: self.permission.clone().unwrap_or_default(),
            biome,
            rating: self.rating.unwrap_or(0.0),
            default_priority: self.default_priority,
            use_config_chest: self.use_config_chest,
            paste_entities: self.paste_entities,
            block_spawn: self.block_spawn.as_deref().and_then(parse_block_spawn),
        }
    }
}

/// Parses `"id"` or `"id:data"`. Anything non-numeric yields `None`.
#[must_use]
pub fn parse_block_spawn(text: &str) -> Option<BlockState> {
    let mut parts = text.trim().split(':');
    let id = parts.next()?.trim().parse::<u16>().ok()?;
    let data = match parts.next() {
        Some(data) => data.trim().parse::<u8>().ok()?,
        None => 0,
    };
    Some(BlockState::new(id, data))
}

/// Strips `§`/`&` colour codes from a display name.
#[must_use]
pub fn strip_colour_codes(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars();
    while let Some(c) = chars.next() {
        if c == '\u{a7}' || c == '&' {
            chars.next();
        } else {
            out.push(c);
        }
    }
    out
}
