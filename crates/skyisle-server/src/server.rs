//! Headless island server: owns the world, the parcel store and the island
//! manager, and drives them on a fixed tick.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use skyisle_common::OwnerId;
use skyisle_island::{CreateRequest, IslandManager, MemoryParcelStore, ParcelStore};
use skyisle_schematic::TemplateRegistry;
use skyisle_world::{MemoryWorld, MemoryWorldConfig};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;

/// Running server state.
pub struct Server {
    config: ServerConfig,
    world: MemoryWorld,
    store: Arc<MemoryParcelStore>,
    manager: IslandManager<MemoryParcelStore>,
    ticks: u64,
}

impl Server {
    /// Loads templates and the parcel snapshot.
    pub fn new(config: ServerConfig) -> Result<Self> {
        let world = MemoryWorld::new(MemoryWorldConfig {
            name: config.island.default_world.clone(),
            height: config.island.world_height,
            ..Default::default()
        });

        let templates = TemplateRegistry::load_dir(&config.template_dir, config.island.decode_settings());
        if templates.uses_procedural() {
            info!("No island templates loaded, using the procedural island");
        } else {
            info!("Loaded island templates: {}", templates.names().join(", "));
        }

        let store = MemoryParcelStore::load_from(&config.store_path)
            .with_context(|| format!("Failed to load parcels from {}", config.store_path.display()))?;
        info!("Loaded {} parcels from {}", store.len(), config.store_path.display());
        let store = Arc::new(store);

        let manager = IslandManager::new(config.island.clone(), Arc::clone(&store), templates);
        Ok(Self {
            config,
            world,
            store,
            manager,
            ticks: 0,
        })
    }

    /// Resumes interrupted teardowns and creates the spawn island if needed.
    pub async fn bootstrap(&mut self) -> Result<()> {
        let resumed = self.manager.resume_pending_teardowns();
        if resumed > 0 {
            info!("Resumed {resumed} interrupted teardowns");
        }

        if self.config.create_spawn_island {
            let owner = OwnerId::new(self.config.spawn_owner.clone());
            if self.store.parcels_of(&owner).is_empty() {
                let request = CreateRequest {
                    name: Some("Spawn".to_string()),
                    spawn: true,
                    ..Default::default()
                };
                let created = self
                    .manager
                    .create_island(&self.world, &owner, request)
                    .await
                    .context("Failed to create the spawn island")?;
                info!("Spawn island created at {}", created.parcel.center);
            }
        }
        Ok(())
    }

    /// Runs one simulation tick.
    pub fn tick(&mut self) {
        self.ticks += 1;
        let loaded = self.world.tick();
        let finished = self.manager.tick(&self.world);
        if loaded > 0 || finished > 0 {
            debug!("Tick {}: {} chunks loaded, {} tasks finished", self.ticks, loaded, finished);
        }
    }

    /// Writes the parcel snapshot.
    pub fn save(&self) -> Result<()> {
        self.store
            .save_to(&self.config.store_path)
            .with_context(|| format!("Failed to save parcels to {}", self.config.store_path.display()))?;
        debug!("Saved {} parcels", self.store.len());
        Ok(())
    }

    /// Ticks until `shutdown` resolves, then saves.
    pub async fn run(&mut self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let mut ticker = interval(Duration::from_millis(self.config.tick_millis()));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let save_every = Duration::from_secs(u64::from(self.config.save_interval));
        let mut last_save = Instant::now();
        tokio::pin!(shutdown);

        info!("Ticking at {} Hz", self.config.tick_rate);
        loop {
            tokio::select! {
                () = &mut shutdown => break,
                _ = ticker.tick() => {
                    self.tick();
                    if !save_every.is_zero() && last_save.elapsed() >= save_every {
                        if let Err(e) = self.save() {
                            warn!("{e:#}");
                        }
                        last_save = Instant::now();
                    }
                },
            }
        }

        let pending = self.manager().pending_tasks();
        if pending > 0 {
            info!("{pending} background tasks still running; they resume on next start");
        }
        self.save()?;
        info!("Server stopped after {} ticks", self.ticks());
        Ok(())
    }

    /// Island manager.
    #[must_use]
    pub const fn manager(&self) -> &IslandManager<MemoryParcelStore> {
        &self.manager
    }

    /// Ticks run so far.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyisle_island::ParcelState;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> ServerConfig {
        let mut config = ServerConfig {
            tick_rate: 100,
            template_dir: dir.path().join("schematics"),
            store_path: dir.path().join("parcels.json"),
            ..Default::default()
        };
        config.island.world_height = 96;
        config.island.clean_rate = 64;
        config
    }

    #[tokio::test]
    async fn test_bootstrap_creates_spawn_island_once() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let mut server = Server::new(config(&dir)).expect("Failed to start");
        server.bootstrap().await.expect("Bootstrap failed");
        server.bootstrap().await.expect("Bootstrap failed");

        let spawn = server.store.parcels_of(&OwnerId::new("server"));
        assert_eq!(spawn.len(), 1);
        assert!(spawn[0].spawn);
        assert_eq!(spawn[0].name, "Spawn");
    }

    #[tokio::test]
    async fn test_run_saves_on_shutdown() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let config = config(&dir);
        let store_path = config.store_path.clone();

        let mut server = Server::new(config.clone()).expect("Failed to start");
        server.bootstrap().await.expect("Bootstrap failed");
        server
            .run(tokio::time::sleep(Duration::from_millis(60)))
            .await
            .expect("Run failed");
        assert!(server.ticks() > 0);

        let restarted = Server::new(config).expect("Failed to restart");
        assert_eq!(restarted.store.len(), 1);
        assert!(store_path.exists());
    }

    #[tokio::test]
    async fn test_pending_teardown_survives_restart() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let mut config = config(&dir);
        config.create_spawn_island = false;

        let owner = OwnerId::new("ada");
        let key = {
            let mut server = Server::new(config.clone()).expect("Failed to start");
            let created = server
                .manager
                .create_island(&server.world, &owner, CreateRequest::default())
                .await
                .expect("Creation failed");
            server.manager.delete_island(&owner, 1).expect("Delete failed");
            server.save().expect("Save failed");
            created.parcel.key
        };

        let mut server = Server::new(config).expect("Failed to restart");
        assert_eq!(
            server.store.parcel_by_cell(key).map(|p| p.state),
            Some(ParcelState::PendingTeardown)
        );
        server.bootstrap().await.expect("Bootstrap failed");
        assert_eq!(server.manager().pending_tasks(), 1);
        while server.manager().pending_tasks() > 0 {
            server.tick();
        }
        assert!(server.store.parcel_by_cell(key).is_none());
    }
}
