//! Island lifecycle: create, delete, reset and parcel settings.
//!
//! The manager owns the allocator, the template registry and the tick
//! scheduler, and shares the parcel store with its teardown tasks. A free
//! cell is claimed in the store before placement starts awaiting chunk loads,
//! so nothing else can take it in between. A placement that rolled back
//! cleanly releases it; one that left debris keeps it pending a teardown.

use std::sync::Arc;

use skyisle_common::{Biome, BlockPos, GridCellKey, OwnerId, TemplateId};
use skyisle_schematic::{StructureTemplate, TemplateRegistry};
use skyisle_world::World;
use tracing::{error, info, warn};

use crate::biome_update::BiomeUpdateJob;
use crate::error::{IslandError, IslandResult, PlacementError};
use crate::grid::GridAllocator;
use crate::parcel::{ParcelRecord, ParcelState, PlayerProfile};
use crate::placement::{place, safe_home, PlacementOptions, PlacementReport};
use crate::procedural::{default_island, HOME_OFFSET};
use crate::scheduler::{BiomeTask, TaskId, TeardownTask, TickScheduler};
use crate::settings::IslandSettings;
use crate::store::ParcelStore;
use crate::teardown::TeardownJob;

/// Which layout a new island uses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TemplateChoice {
    /// The registry's default template, or the procedural island
    #[default]
    Default,
    /// The procedural island, regardless of loaded templates
    Procedural,
    /// A template by id
    Id(TemplateId),
    /// A template by display name
    Name(String),
}

/// Parameters of an island creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateRequest {
    /// Layout
    pub template: TemplateChoice,
    /// Display name (defaults to "<owner>'s island")
    pub name: Option<String>,
    /// Start locked
    pub locked: bool,
    /// Biome override
    pub biome: Option<Biome>,
    /// Mark as the server spawn island
    pub spawn: bool,
}

/// Outcome of a successful creation.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedIsland {
    /// Stored record
    pub parcel: ParcelRecord,
    /// What the placement wrote
    pub report: PlacementReport,
}

/// Coordinates island creation, teardown and settings.
pub struct IslandManager<S: ParcelStore + 'static> {
    settings: IslandSettings,
    grid: GridAllocator,
    store: Arc<S>,
    templates: TemplateRegistry,
    scheduler: TickScheduler,
}

impl<S: ParcelStore + 'static> IslandManager<S> {
    /// Creates a manager. Settings are validated first.
    pub fn new(mut settings: IslandSettings, store: Arc<S>, templates: TemplateRegistry) -> Self {
        settings.validate();
        let grid = GridAllocator::from_settings(&settings);
        info!(
            "Island manager ready: spacing {}, {} templates, {:?} allocation",
            settings.island_distance,
            templates.len(),
            settings.allocation_strategy
        );
        Self {
            settings,
            grid,
            store,
            templates,
            scheduler: TickScheduler::new(),
        }
    }

    /// Active settings.
    #[must_use]
    pub const fn settings(&self) -> &IslandSettings {
        &self.settings
    }

    /// Shared parcel store.
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Template registry.
    #[must_use]
    pub const fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    /// Template registry, for reloads.
    pub fn templates_mut(&mut self) -> &mut TemplateRegistry {
        &mut self.templates
    }

    /// Teardown and biome tasks still running.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.scheduler.len()
    }

    /// Runs one tick of every background task.
    pub fn tick(&mut self, world: &dyn World) -> usize {
        self.scheduler.tick(world)
    }

    /// Allocates a cell, pastes a layout and stores the new parcel.
    pub async fn create_island<W: World + ?Sized>(
        &mut self,
        world: &W,
        owner: &OwnerId,
        request: CreateRequest,
    ) -> IslandResult<CreatedIsland> {
        let owned: Vec<ParcelRecord> = self.store.parcels_of(owner);
        let active = owned.iter().filter(|p| p.is_active()).count() as u32;
        if active >= self.settings.max_homes {
            return Err(IslandError::HomeLimit {
                owner: owner.clone(),
                count: active,
                max: self.settings.max_homes,
            });
        }
        let template = self.resolve_template(&request.template)?;

        let store = Arc::clone(&self.store);
        let (x, z) = self.grid.find_free_cell(|key| store.parcel_by_cell(key).is_some())?;
        let key = self.grid.cell_key(x, z);
        let center = BlockPos::new(x, self.settings.island_height, z);
        let biome = request
            .biome
            .or_else(|| template.as_ref().map(|t| t.meta.biome))
            .unwrap_or(self.settings.default_biome);

        let mut parcel = ParcelRecord {
            owner: owner.clone(),
            slot: next_slot(&owned),
            key,
            world: world.name().to_string(),
            center,
            protection_half: self.settings.protection_half(),
            biome,
            name: request.name.unwrap_or_else(|| format!("{owner}'s island")),
            locked: request.locked,
            spawn: request.spawn,
            home: HOME_OFFSET,
            template: template.as_ref().map(|t| t.id),
            state: ParcelState::Active,
        };
        // Claim before the first await.
        self.store.insert(parcel.clone())?;

        let layout = match &template {
            Some(template) => Arc::clone(template),
            None => Arc::new(default_island(key.raw() as u64)),
        };
        let options = PlacementOptions::for_template(&layout, biome, self.settings.chest_contents());
        let report = match place(world, &layout, center, &options).await {
            Ok(report) => report,
            Err(e) => {
                error!("Island creation for {} failed at cell {}: {}", owner, key, e);
                match e {
                    PlacementError::RolledBack { .. } => {
                        if let Err(release) = self.store.delete(key) {
                            warn!("Could not release cell {}: {}", key, release);
                        }
                    },
                    PlacementError::RollbackIncomplete { .. } => {
                        // Debris is left in the cell; keep it claimed until a teardown clears it.
                        parcel.state = ParcelState::PendingTeardown;
                        if let Err(mark) = self.store.update(parcel.clone()) {
                            warn!("Could not mark cell {} for teardown: {}", key, mark);
                        }
                        self.schedule_teardown(&parcel);
                    },
                }
                return Err(e.into());
            },
        };

        parcel.home = home_offset(world, template.as_deref(), center);
        self.store.update(parcel.clone())?;

        let mut profile = self.profile(owner);
        profile.homes = active + 1;
        self.store.update_profile(profile)?;

        info!(
            "Created island {} for {} at cell {} ({}, {}): {} voxels",
            parcel.slot, owner, key, x, z, report.voxels
        );
        Ok(CreatedIsland { parcel, report })
    }

    /// Starts tearing an island down.
    ///
    /// The record stays in the store, marked pending, until the teardown
    /// drains; its cell cannot be reallocated in the meantime.
    pub fn delete_island(&mut self, owner: &OwnerId, slot: u32) -> IslandResult<TaskId> {
        let mut parcel = self.active_parcel(owner, slot)?;
        parcel.state = ParcelState::PendingTeardown;
        self.store.update(parcel.clone())?;

        let mut profile = self.profile(owner);
        profile.homes = profile.homes.saturating_sub(1);
        self.store.update_profile(profile)?;

        info!("Deleting island {} of {} at cell {}", slot, owner, parcel.key);
        Ok(self.schedule_teardown(&parcel))
    }

    /// Deletes an island and creates a fresh one, spending one reset.
    pub async fn reset_island<W: World + ?Sized>(
        &mut self,
        world: &W,
        owner: &OwnerId,
        slot: u32,
        request: CreateRequest,
    ) -> IslandResult<CreatedIsland> {
        let mut profile = self.profile(owner);
        if !profile.can_reset() {
            return Err(IslandError::NoResetsLeft(owner.clone()));
        }
        self.delete_island(owner, slot)?;

        profile = self.profile(owner);
        if profile.resets_left > 0 {
            profile.resets_left -= 1;
        }
        self.store.update_profile(profile)?;
        self.create_island(world, owner, request).await
    }

    /// Re-creates teardown jobs for records left pending by a previous run.
    pub fn resume_pending_teardowns(&mut self) -> usize {
        let pending = self.store.pending_teardowns();
        for parcel in &pending {
            info!("Resuming teardown of cell {} ({})", parcel.key, parcel.owner);
            self.schedule_teardown(parcel);
        }
        pending.len()
    }

    /// Renames an island.
    pub fn rename(&self, owner: &OwnerId, slot: u32, name: impl Into<String>) -> IslandResult<()> {
        let mut parcel = self.active_parcel(owner, slot)?;
        parcel.name = name.into();
        self.store.update(parcel)?;
        Ok(())
    }

    /// Locks or unlocks an island.
    pub fn set_locked(&self, owner: &OwnerId, slot: u32, locked: bool) -> IslandResult<()> {
        let mut parcel = self.active_parcel(owner, slot)?;
        parcel.locked = locked;
        self.store.update(parcel)?;
        Ok(())
    }

    /// Changes an island's biome and schedules the column rewrite.
    pub fn set_biome(&mut self, owner: &OwnerId, slot: u32, biome: Biome) -> IslandResult<TaskId> {
        let mut parcel = self.active_parcel(owner, slot)?;
        parcel.biome = biome;
        self.store.update(parcel.clone())?;

        let job = BiomeUpdateJob::new(parcel.key, parcel.protected_rect(), biome, self.settings.clean_rate);
        Ok(self.scheduler.register(Box::new(BiomeTask::new(job))))
    }

    /// Moves an island's home to an absolute position inside it.
    pub fn set_home(&self, owner: &OwnerId, slot: u32, home: BlockPos) -> IslandResult<()> {
        let mut parcel = self.active_parcel(owner, slot)?;
        if !parcel.in_protected_area(home.x, home.z) {
            return Err(IslandError::HomeOutsideIsland(home));
        }
        parcel.home = home.sub(parcel.center);
        self.store.update(parcel)?;
        Ok(())
    }

    /// Parcel whose cell contains a column.
    #[must_use]
    pub fn island_at(&self, x: i32, z: i32) -> Option<ParcelRecord> {
        self.store.parcel_by_cell(self.cell_key(x, z))
    }

    /// Whether a column lies in some island's protected square.
    #[must_use]
    pub fn in_protected_area(&self, x: i32, z: i32) -> bool {
        self.island_at(x, z)
            .is_some_and(|parcel| parcel.in_protected_area(x, z))
    }

    /// Cell key of a column.
    #[must_use]
    pub const fn cell_key(&self, x: i32, z: i32) -> GridCellKey {
        self.grid.cell_key(x, z)
    }

    fn profile(&self, owner: &OwnerId) -> PlayerProfile {
        self.store
            .profile(owner)
            .unwrap_or_else(|| PlayerProfile::new(owner.clone(), self.settings.reset_limit))
    }

    fn active_parcel(&self, owner: &OwnerId, slot: u32) -> IslandResult<ParcelRecord> {
        let parcel = self.store.parcel(owner, slot).ok_or_else(|| IslandError::NoSuchIsland {
            owner: owner.clone(),
            slot,
        })?;
        if !parcel.is_active() {
            return Err(IslandError::TeardownPending(parcel.key));
        }
        Ok(parcel)
    }

    fn resolve_template(&self, choice: &TemplateChoice) -> IslandResult<Option<Arc<StructureTemplate>>> {
        let id = match choice {
            TemplateChoice::Procedural => return Ok(None),
            TemplateChoice::Default => {
                if self.templates.uses_procedural() {
                    return Ok(None);
                }
                match self.templates.default_template() {
                    Some(id) => id,
                    None => match self.templates.ids().first() {
                        Some(id) => *id,
                        None => return Ok(None),
                    },
                }
            },
            TemplateChoice::Id(id) => *id,
            TemplateChoice::Name(name) => self
                .templates
                .by_name(name)
                .ok_or_else(|| IslandError::UnknownTemplate(name.clone()))?,
        };
        Ok(Some(self.templates.get(id)?))
    }

    fn schedule_teardown(&mut self, parcel: &ParcelRecord) -> TaskId {
        let job = TeardownJob::begin(parcel, &self.settings);
        self.scheduler
            .register(Box::new(TeardownTask::new(job, Arc::clone(&self.store))))
    }
}

/// Lowest slot number not used by any of the owner's records.
fn next_slot(owned: &[ParcelRecord]) -> u32 {
    (1..)
        .find(|slot| owned.iter().all(|p| p.slot != *slot))
        .unwrap_or(1)
}

/// Home offset from the island center.
fn home_offset<W: World + ?Sized>(world: &W, template: Option<&StructureTemplate>, center: BlockPos) -> BlockPos {
    let Some(template) = template else {
        return HOME_OFFSET;
    };
    if let Some(spawn) = template.spawn_offset() {
        return spawn.sub(template.anchor_or_origin());
    }
    safe_home(world, center).map_or(BlockPos::new(0, 1, 0), |home| home.sub(center))
}
