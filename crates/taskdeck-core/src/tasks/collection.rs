use tracing::{debug, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::{NewTask, Task, TaskFilter, TaskId, TaskUpdate};

/// Tasks matching `filter`, in their original order
pub fn visible_tasks<'a, I>(tasks: I, filter: TaskFilter) -> impl Iterator<Item = &'a Task>
where
    I: IntoIterator<Item = &'a Task>,
{
    tasks.into_iter().filter(move |task| filter.matches(task))
}

/// Handle for an issued task-list fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a load ticket must be passed back to apply_load"]
pub struct LoadTicket(u64);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskCounts {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
}

impl TaskCounts {
    /// Share of completed tasks as a whole percentage, rounded half up.
    /// An empty list is 0%.
    pub fn completion_percent(&self) -> usize {
        if self.total == 0 {
            return 0;
        }
        (self.completed * 100 + self.total / 2) / self.total
    }
}

/// Locally cached task list plus the dashboard's view state.
///
/// The list only changes in response to confirmed server operations, and
/// always takes the server's copy of a task over what was sent.
#[derive(Debug, Default)]
pub struct TaskCollection {
    tasks: Vec<Task>,
    filter: TaskFilter,
    loading: bool,
    error: Option<String>,
    next_seq: u64,
    pending_load: Option<u64>,
    last_change: u64,
}

impl TaskCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn filter(&self) -> TaskFilter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: TaskFilter) {
        self.filter = filter;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn visible(&self) -> Vec<&Task> {
        visible_tasks(&self.tasks, self.filter).collect()
    }

    pub fn counts(&self) -> TaskCounts {
        let completed = self.tasks.iter().filter(|t| t.completed).count();
        TaskCounts {
            total: self.tasks.len(),
            pending: self.tasks.len() - completed,
            completed,
        }
    }

    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn record_change(&mut self) {
        self.last_change = self.next_seq();
    }

    // ===== Loading =====

    /// Start a fetch of the full list. Supersedes any fetch still in flight.
    pub fn begin_load(&mut self) -> LoadTicket {
        let seq = self.next_seq();
        self.pending_load = Some(seq);
        self.loading = true;
        LoadTicket(seq)
    }

    /// Apply the outcome of a fetch started with `begin_load`.
    ///
    /// `Ok(true)` means the list was replaced. Results for superseded tickets
    /// are dropped (`Ok(false)`), as are lists fetched before a later
    /// confirmed change. A failed fetch keeps the current list, records the
    /// error and hands it back.
    pub fn apply_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Vec<Task>, ApiError>,
    ) -> Result<bool, ApiError> {
        if self.pending_load != Some(ticket.0) {
            debug!(ticket = ticket.0, "Dropping superseded task list");
            return Ok(false);
        }
        self.pending_load = None;
        self.loading = false;

        match result {
            Ok(_) if ticket.0 < self.last_change => {
                debug!(ticket = ticket.0, "Dropping task list fetched before a local change");
                Ok(false)
            }
            Ok(tasks) => {
                debug!(count = tasks.len(), "Loaded tasks");
                self.tasks = tasks;
                self.filter = TaskFilter::All;
                self.error = None;
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "Failed to load tasks");
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Fetch and apply the full list
    pub async fn load(&mut self, api: &ApiClient) -> Result<bool, ApiError> {
        let ticket = self.begin_load();
        let result = api.list_tasks().await;
        self.apply_load(ticket, result)
    }

    // ===== Confirmed changes =====

    /// Put a newly created task at the head of the list
    pub fn apply_created(&mut self, task: Task) {
        self.tasks.retain(|t| t.id != task.id);
        self.tasks.insert(0, task);
        self.record_change();
    }

    /// Swap in the server's copy of an existing task.
    /// Returns false, dropping the task, if its id is not in the list.
    pub fn apply_updated(&mut self, task: Task) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(slot) => {
                *slot = task;
                self.record_change();
                true
            }
            None => {
                debug!(id = task.id, "Dropping update for a task not in the list");
                false
            }
        }
    }

    pub fn apply_deleted(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        let removed = self.tasks.len() != before;
        if removed {
            self.record_change();
        }
        removed
    }

    fn fail(&mut self, action: &str, err: ApiError) -> ApiError {
        warn!(error = %err, action, "Task operation failed");
        self.error = Some(format!("Failed to {} task: {}", action, err));
        err
    }

    // ===== Server operations =====

    pub async fn create(&mut self, api: &ApiClient, task: &NewTask) -> Result<Task, ApiError> {
        match api.create_task(task).await {
            Ok(created) => {
                self.apply_created(created.clone());
                Ok(created)
            }
            Err(e) => Err(self.fail("create", e)),
        }
    }

    pub async fn update(
        &mut self,
        api: &ApiClient,
        id: TaskId,
        update: &TaskUpdate,
    ) -> Result<Task, ApiError> {
        match api.update_task(id, update).await {
            Ok(task) => {
                self.apply_updated(task.clone());
                Ok(task)
            }
            Err(e) => Err(self.fail("update", e)),
        }
    }

    pub async fn toggle_complete(
        &mut self,
        api: &ApiClient,
        id: TaskId,
        completed: bool,
    ) -> Result<Task, ApiError> {
        match api.toggle_complete(id, completed).await {
            Ok(task) => {
                self.apply_updated(task.clone());
                Ok(task)
            }
            Err(e) => Err(self.fail("update", e)),
        }
    }

    /// Delete on the server, then locally. A failed delete keeps the entry.
    pub async fn delete(&mut self, api: &ApiClient, id: TaskId) -> Result<(), ApiError> {
        match api.delete_task(id).await {
            Ok(()) => {
                self.apply_deleted(id);
                Ok(())
            }
            Err(e) => Err(self.fail("delete", e)),
        }
    }
}
