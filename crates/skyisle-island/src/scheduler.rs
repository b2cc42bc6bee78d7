//! Repeating tasks driven once per server tick.
//!
//! Tasks run on the simulation thread, in registration order, and
//! deregister themselves by returning [`TaskStatus::Finished`].

use std::sync::Arc;

use skyisle_common::GridCellKey;
use skyisle_world::World;
use tracing::{debug, error, info};

use crate::biome_update::BiomeUpdateJob;
use crate::error::{StoreError, TeardownInconsistency};
use crate::store::ParcelStore;
use crate::teardown::TeardownJob;

/// Handle of a registered task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    /// Raw value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Outcome of one task run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Run again next tick
    Continue,
    /// Deregister
    Finished,
}

/// A callback invoked once per tick until it finishes.
pub trait RepeatingTask {
    /// Runs one tick's worth of work.
    fn run(&mut self, world: &dyn World) -> TaskStatus;

    /// Short name for logging.
    fn name(&self) -> &str;
}

/// Runs registered tasks once per tick.
#[derive(Default)]
pub struct TickScheduler {
    tasks: Vec<(TaskId, Box<dyn RepeatingTask>)>,
    next_id: u64,
    ticks: u64,
}

impl TickScheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a task; it first runs on the next tick.
    pub fn register(&mut self, task: Box<dyn RepeatingTask>) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        debug!("Registered task {} ({})", id.0, task.name());
        self.tasks.push((id, task));
        id
    }

    /// Runs every task once and drops the finished ones. Returns how many finished.
    pub fn tick(&mut self, world: &dyn World) -> usize {
        self.ticks += 1;
        let before = self.tasks.len();
        self.tasks.retain_mut(|(id, task)| match task.run(world) {
            TaskStatus::Continue => true,
            TaskStatus::Finished => {
                debug!("Task {} ({}) finished", id.0, task.name());
                false
            },
        });
        before - self.tasks.len()
    }

    /// Whether a task is still registered.
    #[must_use]
    pub fn is_registered(&self, id: TaskId) -> bool {
        self.tasks.iter().any(|(task_id, _)| *task_id == id)
    }

    /// Number of registered tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether no task is registered.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Ticks run so far.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }
}

/// Drives a [`TeardownJob`] and removes the parcel record once it drains.
pub struct TeardownTask<S: ParcelStore> {
    job: TeardownJob,
    store: Arc<S>,
    name: String,
}

impl<S: ParcelStore> TeardownTask<S> {
    /// Wraps a job.
    #[must_use]
    pub fn new(job: TeardownJob, store: Arc<S>) -> Self {
        let name = format!("teardown {}", job.key());
        Self { job, store, name }
    }

    fn finish(&self) {
        let key: GridCellKey = self.job.key();
        match self.store.delete(key) {
            Ok(record) => info!(
                "Island {} of {} removed after teardown of cell {}",
                record.slot, record.owner, key
            ),
            Err(StoreError::NotFound(_)) => error!("{}", TeardownInconsistency { key }),
            Err(e) => error!("Failed to remove record of cell {}: {}", key, e),
        }
    }
}

impl<S: ParcelStore> RepeatingTask for TeardownTask<S> {
    fn run(&mut self, world: &dyn World) -> TaskStatus {
        self.job.tick(world);
        if self.job.is_done() {
            self.finish();
            TaskStatus::Finished
        } else {
            TaskStatus::Continue
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Drives a [`BiomeUpdateJob`].
pub struct BiomeTask {
    job: BiomeUpdateJob,
    name: String,
}

impl BiomeTask {
    /// Wraps a job.
    #[must_use]
    pub fn new(job: BiomeUpdateJob) -> Self {
        let name = format!("biome {}", job.key());
        Self { job, name }
    }
}

impl RepeatingTask for BiomeTask {
    fn run(&mut self, world: &dyn World) -> TaskStatus {
        self.job.tick(world);
        if self.job.is_done() {
            TaskStatus::Finished
        } else {
            TaskStatus::Continue
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use skyisle_common::{BlockPos, ChunkPos, OwnerId};
    use skyisle_world::{MemoryWorld, MemoryWorldConfig};

    use super::*;
    use crate::parcel::tests::record;
    use crate::parcel::ParcelState;
    use crate::store::MemoryParcelStore;

    struct Countdown {
        left: u32,
        runs: Arc<parking_lot::Mutex<u32>>,
    }

    impl RepeatingTask for Countdown {
        fn run(&mut self, _world: &dyn World) -> TaskStatus {
            *self.runs.lock() += 1;
            self.left -= 1;
            if self.left == 0 {
                TaskStatus::Finished
            } else {
                TaskStatus::Continue
            }
        }

        fn name(&self) -> &str {
            "countdown"
        }
    }

    fn world() -> MemoryWorld {
        MemoryWorld::new(MemoryWorldConfig {
            height: 16,
            ..Default::default()
        })
    }

    #[test]
    fn test_tasks_deregister_themselves() {
        let world = world();
        let runs = Arc::new(parking_lot::Mutex::new(0));
        let mut scheduler = TickScheduler::new();
        let short = scheduler.register(Box::new(Countdown {
            left: 1,
            runs: Arc::clone(&runs),
        }));
        let long = scheduler.register(Box::new(Countdown {
            left: 3,
            runs: Arc::clone(&runs),
        }));

        assert_eq!(scheduler.tick(&world), 1);
        assert!(!scheduler.is_registered(short));
        assert!(scheduler.is_registered(long));
        scheduler.tick(&world);
        assert_eq!(scheduler.tick(&world), 1);
        assert!(scheduler.is_idle());
        assert_eq!(*runs.lock(), 4);
        assert_eq!(scheduler.ticks(), 3);
    }

    #[test]
    fn test_teardown_task_deletes_record() {
        let world = world();
        let store = Arc::new(MemoryParcelStore::new());
        let mut parcel = record("alice", BlockPos::new(50, 60, 50));
        parcel.state = ParcelState::PendingTeardown;
        let key = parcel.key;
        store.insert(parcel).expect("insert failed");

        let job = TeardownJob::from_units(key, vec![ChunkPos::new(0, 0), ChunkPos::new(1, 0)], Vec::new(), 1, 0);
        let mut scheduler = TickScheduler::new();
        scheduler.register(Box::new(TeardownTask::new(job, Arc::clone(&store))));

        scheduler.tick(&world);
        assert!(store.parcel_by_cell(key).is_some());
        scheduler.tick(&world);
        assert!(scheduler.is_idle());
        assert!(store.parcel_by_cell(key).is_none());
        assert!(store.parcels_of(&OwnerId::new("alice")).is_empty());
    }

    #[test]
    fn test_teardown_task_tolerates_missing_record() {
        let world = world();
        let store = Arc::new(MemoryParcelStore::new());
        let job = TeardownJob::from_units(GridCellKey::from_cell(3, 3), vec![ChunkPos::new(0, 0)], Vec::new(), 4, 0);
        let mut task = TeardownTask::new(job, store);
        assert_eq!(task.run(&world), TaskStatus::Finished);
    }
}
