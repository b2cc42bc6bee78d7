//! Template registry with an explicit decode cache.
//!
//! The registry owns the list of configured templates (id, file, metadata)
//! for the life of the process. Decoded geometry lives in a bounded
//! least-recently-used cache; a miss re-decodes the file from disk.
//! [`TemplateRegistry::reload`] re-reads the configuration and every file.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use skyisle_common::TemplateId;
use tracing::{debug, info, warn};

use crate::config::{strip_colour_codes, TemplateConfig};
use crate::error::{RegistryError, RegistryResult};
use crate::items::{BuiltinItemRegistry, ItemRegistry};
use crate::schematic::{decode_schematic, DecodeSettings};
use crate::template::{StructureTemplate, TemplateMeta};

/// Default number of decoded templates kept in memory.
pub const DEFAULT_CACHE_CAPACITY: usize = 8;

/// A configured template file.
#[derive(Debug, Clone)]
pub struct TemplateSource {
    /// Assigned id (1-based, in configuration order)
    pub id: TemplateId,
    /// Configuration key
    pub key: String,
    /// Absolute file path
    pub path: PathBuf,
    /// Merged metadata
    pub meta: TemplateMeta,
}

/// Bounded least-recently-used cache of decoded templates.
#[derive(Debug)]
pub struct TemplateCache {
    capacity: usize,
    /// Most recently used first
    entries: VecDeque<(TemplateId, Arc<StructureTemplate>)>,
}

impl TemplateCache {
    /// Creates a cache holding at most `capacity` templates (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
        }
    }

    /// Looks a template up and marks it most recently used.
    pub fn get(&mut self, id: TemplateId) -> Option<Arc<StructureTemplate>> {
        let index = self.entries.iter().position(|(cached, _)| *cached == id)?;
        let entry = self.entries.remove(index)?;
        let template = Arc::clone(&entry.1);
        self.entries.push_front(entry);
        Some(template)
    }

    /// Inserts a template, evicting the least recently used one when full.
    pub fn insert(&mut self, id: TemplateId, template: Arc<StructureTemplate>) {
        self.entries.retain(|(cached, _)| *cached != id);
        while self.entries.len() >= self.capacity {
            if let Some((evicted, _)) = self.entries.pop_back() {
                debug!("Evicted template {} from cache", evicted);
            }
        }
        self.entries.push_front((id, template));
    }

    /// Whether a template is currently cached.
    #[must_use]
    pub fn contains(&self, id: TemplateId) -> bool {
        self.entries.iter().any(|(cached, _)| *cached == id)
    }

    /// Number of cached templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every cached template.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Registry of configured structure templates.
pub struct TemplateRegistry {
    dir: Option<PathBuf>,
    settings: DecodeSettings,
    items: Box<dyn ItemRegistry + Send + Sync>,
    sources: Vec<TemplateSource>,
    default_id: Option<TemplateId>,
    cache: Mutex<TemplateCache>,
    decodes: AtomicUsize,
}

impl std::fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRegistry")
            .field("dir", &self.dir)
            .field("templates", &self.sources.len())
            .field("default_id", &self.default_id)
            .finish_non_exhaustive()
    }
}

impl TemplateRegistry {
    /// A registry with no templates; placement falls back to the procedural island.
    #[must_use]
    pub fn empty(settings: DecodeSettings) -> Self {
        Self {
            dir: None,
            settings,
            items: Box::new(BuiltinItemRegistry::new()),
            sources: Vec::new(),
            default_id: None,
            cache: Mutex::new(TemplateCache::new(DEFAULT_CACHE_CAPACITY)),
            decodes: AtomicUsize::new(0),
        }
    }

    /// Loads every configured template from a directory.
    ///
    /// Never fails: an absent or disabled configuration yields an empty
    /// registry, and each unreadable template is skipped with a warning.
    pub fn load_dir<P: AsRef<Path>>(dir: P, settings: DecodeSettings) -> Self {
        let mut registry = Self::empty(settings);
        registry.dir = Some(dir.as_ref().to_path_buf());
        registry.reload();
        registry
    }

    /// Replaces the item registry used for container contents.
    #[must_use]
    pub fn with_items(mut self, items: Box<dyn ItemRegistry + Send + Sync>) -> Self {
        self.items = items;
        self.reload();
        self
    }

    /// Sets the cache capacity.
    #[must_use]
    pub fn with_cache_capacity(self, capacity: usize) -> Self {
        let mut cache = TemplateCache::new(capacity);
        {
            let mut current = self.cache.lock();
            let keep = cache.capacity.min(current.len());
            for (id, template) in current.entries.drain(..keep).rev() {
                cache.insert(id, template);
            }
            *current = cache;
        }
        self
    }

    /// Re-reads the configuration and decodes every template again.
    ///
    /// Returns the number of templates now registered.
    pub fn reload(&mut self) -> usize {
        self.sources.clear();
        self.default_id = None;
        self.cache.lock().clear();

        let Some(dir) = self.dir.clone() else {
            return 0;
        };
        let config = match TemplateConfig::load_from_dir(&dir) {
            Ok(Some(config)) if config.enable => config,
            Ok(Some(_)) => {
                info!("Templates disabled in {}, using the built-in island", dir.display());
                return 0;
            },
            Ok(None) => {
                info!("No template configuration in {}, using the built-in island", dir.display());
                return 0;
            },
            Err(e) => {
                warn!("{e}");
                return 0;
            },
        };

        for (key, entry) in &config.schematic {
            if entry.file_name.is_empty() {
                warn!("Template '{}' has no file name, skipping", key);
                continue;
            }
            let path = dir.join(&entry.file_name);
            let id = TemplateId::new(self.sources.len() as u32 + 1);
            let meta = entry.to_meta();
            match self.decode_file(&path) {
                Ok(template) => {
                    debug!(
                        "Decoded template {} ({} ops, {} skipped items)",
                        entry.file_name,
                        template.ops.len(),
                        template.skipped_items
                    );
                    let template = template.with_meta(id, meta.clone());
                    self.cache.lock().insert(id, Arc::new(template));
                },
                Err(e) => {
                    warn!("{e}");
                    continue;
                },
            }
            if meta.default_priority && self.default_id.is_none() {
                self.default_id = Some(id);
            }
            self.sources.push(TemplateSource {
                id,
                key: key.clone(),
                path,
                meta,
            });
        }

        info!("Loaded {} templates from {}", self.sources.len(), dir.display());
        self.sources.len()
    }

    /// Returns a decoded template, decoding it again on a cache miss.
    pub fn get(&self, id: TemplateId) -> RegistryResult<Arc<StructureTemplate>> {
        if let Some(template) = self.cache.lock().get(id) {
            return Ok(template);
        }
        let source = self.source(id).ok_or(RegistryError::UnknownTemplate(id))?;
        debug!("Template {} not cached, decoding {}", id, source.path.display());
        let template = Arc::new(self.decode_file(&source.path)?.with_meta(id, source.meta.clone()));
        self.cache.lock().insert(id, Arc::clone(&template));
        Ok(template)
    }

    fn decode_file(&self, path: &Path) -> RegistryResult<StructureTemplate> {
        let bytes = fs::read(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.decodes.fetch_add(1, Ordering::Relaxed);
        decode_schematic(&bytes, &self.settings, self.items.as_ref()).map_err(|source| {
            RegistryError::Decode {
                file: path.display().to_string(),
                source,
            }
        })
    }

    /// Configured template for an id.
    #[must_use]
    pub fn source(&self, id: TemplateId) -> Option<&TemplateSource> {
        self.sources.iter().find(|s| s.id == id)
    }

    /// Metadata for an id.
    #[must_use]
    pub fn meta(&self, id: TemplateId) -> Option<&TemplateMeta> {
        self.source(id).map(|s| &s.meta)
    }

    /// Looks a template up by display name, ignoring case and colour codes.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<TemplateId> {
        let wanted = strip_colour_codes(name);
        self.sources
            .iter()
            .find(|s| strip_colour_codes(&s.meta.name).eq_ignore_ascii_case(&wanted))
            .map(|s| s.id)
    }

    /// Display names in id order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.meta.name.as_str()).collect()
    }

    /// Registered ids in order.
    #[must_use]
    pub fn ids(&self) -> Vec<TemplateId> {
        self.sources.iter().map(|s| s.id).collect()
    }

    /// The first template flagged as default candidate.
    #[must_use]
    pub const fn default_template(&self) -> Option<TemplateId> {
        self.default_id
    }

    /// Whether placement must use the procedural island.
    #[must_use]
    pub fn uses_procedural(&self) -> bool {
        self.sources.is_empty()
    }

    /// Number of registered templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether no template is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Decode settings in effect.
    #[must_use]
    pub const fn settings(&self) -> &DecodeSettings {
        &self.settings
    }

    /// Number of file decodes performed so far.
    #[must_use]
    pub fn decode_count(&self) -> usize {
        self.decodes.load(Ordering::Relaxed)
    }
}
