use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use tareas_api::v1::{NewTask, Task, TaskUpdate, TrashEmptied};

use crate::error::TaskError;

/// Shared application state: the task store plus snapshot bookkeeping.
///
/// A task lives in exactly one of two logical states, distinguished by its
/// `deleted_at` field: active (`None`) or trashed (`Some`). Every lifecycle
/// transition is a single mutation under one lock, so a task can never be
/// observed in both states or in neither.
#[derive(Debug)]
pub struct AppState {
    generation: AtomicU64,
    flushed: AtomicU64,
    tasks: Mutex<HashMap<Uuid, Task>>,
    data_file: PathBuf,
}

impl AppState {
    /// Empty state backed by the given snapshot file.
    pub fn new(data_file: PathBuf) -> Self {
        Self {
            generation: AtomicU64::new(0),
            flushed: AtomicU64::new(0),
            tasks: Mutex::new(HashMap::new()),
            data_file,
        }
    }

    /// Load state from the snapshot file, treating a missing file as an
    /// empty store.
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(Self::new(path.to_owned()));
            }
            Err(err) => eyre::bail!(err),
        };

        let data: DataOwned = ron::de::from_reader(file)?;

        match data {
            DataOwned::V1 { tasks } => Ok(Self {
                generation: AtomicU64::new(0),
                flushed: AtomicU64::new(0),
                tasks: Mutex::new(tasks),
                data_file: path.to_owned(),
            }),
        }
    }

    fn increment_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed)
    }

    /// Write a snapshot, but only if a mutation happened since the last
    /// flush.
    pub async fn store_if_dirty(&self) -> eyre::Result<()> {
        let generation = self.generation.load(Ordering::Relaxed);

        if generation == self.flushed.load(Ordering::Relaxed) {
            return Ok(());
        }

        self.store().await?;
        self.flushed.store(generation, Ordering::Relaxed);

        Ok(())
    }

    pub async fn store(&self) -> eyre::Result<()> {
        let tasks = self.tasks.lock().await;
        let data = DataBorrowed::V1 { tasks: &tasks };

        let file = fs::File::create(&self.data_file)?;
        let mut ser = ron::Serializer::new(file, Some(Default::default()))?;
        data.serialize(&mut ser)?;

        Ok(())
    }

    pub async fn create(&self, input: NewTask) -> Result<Task, TaskError> {
        let task = Task::new(input)?;

        let mut tasks = self.tasks.lock().await;
        tasks.insert(task.id, task.clone());
        self.increment_generation();

        Ok(task)
    }

    /// All active tasks, newest first.
    pub async fn list(&self) -> Vec<Task> {
        let tasks = self.tasks.lock().await;
        let mut tasks: Vec<_> = tasks
            .values()
            .filter(|task| !task.is_deleted())
            .cloned()
            .collect();
        tasks.sort_unstable_by(|a, b| a.created_at.cmp(&b.created_at).reverse());
        tasks
    }

    pub async fn get(&self, id: Uuid) -> Result<Task, TaskError> {
        let tasks = self.tasks.lock().await;
        tasks
            .get(&id)
            .filter(|task| !task.is_deleted())
            .cloned()
            .ok_or(TaskError::NotFound(id))
    }

    pub async fn update(&self, id: Uuid, patch: TaskUpdate) -> Result<Task, TaskError> {
        let mut tasks = self.tasks.lock().await;
        let task = tasks
            .get_mut(&id)
            .filter(|task| !task.is_deleted())
            .ok_or(TaskError::NotFound(id))?;

        task.apply(patch)?;
        let task = task.clone();
        self.increment_generation();

        Ok(task)
    }

    /// Move an active task to the trash by stamping `deleted_at`.
    pub async fn soft_delete(&self, id: Uuid) -> Result<Task, TaskError> {
        let mut tasks = self.tasks.lock().await;
        let task = tasks
            .get_mut(&id)
            .filter(|task| !task.is_deleted())
            .ok_or(TaskError::NotFound(id))?;

        task.deleted_at = Some(Utc::now());
        let task = task.clone();
        self.increment_generation();

        Ok(task)
    }

    /// All trashed tasks, most recently deleted first.
    pub async fn list_trash(&self) -> Vec<Task> {
        let tasks = self.tasks.lock().await;
        let mut tasks: Vec<_> = tasks
            .values()
            .filter(|task| task.is_deleted())
            .cloned()
            .collect();
        tasks.sort_unstable_by(|a, b| a.deleted_at.cmp(&b.deleted_at).reverse());
        tasks
    }

    /// Move a trashed task back to the active state. The id and
    /// `created_at` are kept; `updated_at` is refreshed.
    pub async fn restore(&self, id: Uuid) -> Result<Task, TaskError> {
        let mut tasks = self.tasks.lock().await;
        let task = tasks
            .get_mut(&id)
            .filter(|task| task.is_deleted())
            .ok_or(TaskError::NotFound(id))?;

        task.deleted_at = None;
        task.updated_at = Utc::now();
        let task = task.clone();
        self.increment_generation();

        Ok(task)
    }

    /// Permanently remove a trashed task. An active id is not purgeable.
    pub async fn purge(&self, id: Uuid) -> Result<Task, TaskError> {
        let mut tasks = self.tasks.lock().await;

        if !tasks.get(&id).is_some_and(|task| task.is_deleted()) {
            return Err(TaskError::NotFound(id));
        }

        let task = tasks.remove(&id).ok_or(TaskError::NotFound(id))?;
        self.increment_generation();

        Ok(task)
    }

    /// Permanently remove every trashed task, reporting how many there
    /// were.
    pub async fn empty_trash(&self) -> TrashEmptied {
        let mut tasks = self.tasks.lock().await;
        let before = tasks.len();
        tasks.retain(|_, task| !task.is_deleted());
        let removed = before - tasks.len();

        if removed > 0 {
            self.increment_generation();
        }

        TrashEmptied { removed }
    }
}

#[derive(Serialize)]
enum DataBorrowed<'a> {
    V1 { tasks: &'a HashMap<Uuid, Task> },
}

#[derive(Deserialize)]
enum DataOwned {
    V1 { tasks: HashMap<Uuid, Task> },
}
