use crate::error::StorageError;
use crate::storage::Storage;
use crate::task::{StatusFilter, Task, TaskStatus};
use serde::Deserialize;
use tracing::{debug, info, warn};

pub const TASKS_KEY: &str = "tasks";
/// Unparseable task data is copied here before the list starts over empty.
pub const CORRUPT_TASKS_KEY: &str = "tasks.corrupt";

/// How new task ids are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdPolicy {
    /// Counter seeded from the highest stored id; never reuses a live id.
    #[default]
    Monotonic,
    /// `len + 1`, matching lists written by the browser version. Collides after deletes.
    SequenceLength,
}

/// Owns the task list and writes it through to storage after every change.
#[derive(Debug)]
pub struct TaskStore<S: Storage> {
    tasks: Vec<Task>,
    storage: S,
    id_policy: IdPolicy,
    /// `None` once the id space is used up.
    next_id: Option<u64>,
}

impl<S: Storage> TaskStore<S> {
    /// Loads the stored list. Missing or unreadable data starts an empty list;
    /// unparseable data is kept under `CORRUPT_TASKS_KEY` first.
    pub fn hydrate(mut storage: S, id_policy: IdPolicy) -> Self {
        let tasks = match storage.get(TASKS_KEY) {
            Ok(Some(data)) => match serde_json::from_str::<Vec<Task>>(&data) {
                Ok(tasks) => tasks,
                Err(err) => {
                    warn!(error = %err, "stored tasks are malformed; starting empty");
                    if let Err(err) = storage.set(CORRUPT_TASKS_KEY, &data) {
                        warn!(error = %err, "failed to back up malformed tasks");
                    }
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(error = %err, "failed to read stored tasks; starting empty");
                Vec::new()
            }
        };
        let next_id = match tasks.iter().map(|t| t.id).max() {
            Some(max) => max.checked_add(1),
            None => Some(1),
        };
        info!(count = tasks.len(), ?id_policy, "hydrated tasks");
        Self {
            tasks,
            storage,
            id_policy,
            next_id,
        }
    }

    pub fn persist(&mut self) -> Result<(), StorageError> {
        let data = serde_json::to_string(&self.tasks)?;
        self.storage.set(TASKS_KEY, &data)
    }

    /// Appends a pending task. Blank descriptions are ignored and yield `Ok(None)`.
    pub fn add(&mut self, description: &str) -> Result<Option<u64>, StorageError> {
        if description.trim().is_empty() {
            return Ok(None);
        }
        let id = self.allocate_id().ok_or(StorageError::IdsExhausted)?;
        self.tasks.push(Task {
            id,
            description: description.to_string(),
            status: TaskStatus::Pending,
        });
        debug!(id, "added task");
        self.persist()?;
        Ok(Some(id))
    }

    /// `None` means the edit was cancelled.
    pub fn edit(&mut self, id: u64, new_description: Option<&str>) -> Result<(), StorageError> {
        let Some(description) = new_description else {
            return Ok(());
        };
        for task in self.tasks.iter_mut().filter(|t| t.id == id) {
            task.description = description.to_string();
        }
        debug!(id, "edited task");
        self.persist()
    }

    pub fn remove(&mut self, id: u64) -> Result<(), StorageError> {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        debug!(id, removed = before - self.tasks.len(), "removed task");
        self.persist()
    }

    /// Sets the status without checking the transition; the menu is the only gate.
    pub fn change_status(&mut self, id: u64, status: TaskStatus) -> Result<(), StorageError> {
        for task in self.tasks.iter_mut().filter(|t| t.id == id) {
            task.status = status;
        }
        debug!(id, %status, "changed task status");
        self.persist()
    }

    pub fn visible_tasks(&self, filter: StatusFilter) -> Vec<&Task> {
        visible_tasks(&self.tasks, filter)
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Task counts in `TaskStatus::ALL` order.
    pub fn counts(&self) -> [usize; 3] {
        TaskStatus::ALL.map(|status| self.tasks.iter().filter(|t| t.status == status).count())
    }

    fn allocate_id(&mut self) -> Option<u64> {
        match self.id_policy {
            IdPolicy::SequenceLength => u64::try_from(self.tasks.len()).ok()?.checked_add(1),
            IdPolicy::Monotonic => {
                let id = self.next_id?;
                self.next_id = id.checked_add(1);
                Some(id)
            }
        }
    }
}

pub fn visible_tasks(tasks: &[Task], filter: StatusFilter) -> Vec<&Task> {
    tasks.iter().filter(|t| filter.matches(t.status)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStorage, MemoryStorage};
    use tempfile::TempDir;

    fn empty_store() -> TaskStore<MemoryStorage> {
        TaskStore::hydrate(MemoryStorage::new(), IdPolicy::Monotonic)
    }

    fn ids(tasks: &[&Task]) -> Vec<u64> {
        tasks.iter().map(|t| t.id).collect()
    }

    #[test]
    fn add_creates_pending_task() {
        let mut store = empty_store();
        let id = store.add("Buy milk").unwrap();
        assert_eq!(id, Some(1));
        assert_eq!(store.len(), 1);
        assert_eq!(store.tasks()[0].description, "Buy milk");
        assert_eq!(store.tasks()[0].status, TaskStatus::Pending);
    }

    #[test]
    fn add_rejects_blank() {
        let mut store = empty_store();
        assert_eq!(store.add("   ").unwrap(), None);
        assert_eq!(store.add("").unwrap(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn edit_cancelled_is_noop() {
        let mut store = empty_store();
        store.add("A").unwrap();
        store.edit(1, None).unwrap();
        assert_eq!(store.tasks()[0].description, "A");
    }

    #[test]
    fn edit_allows_empty_description() {
        let mut store = empty_store();
        store.add("A").unwrap();
        store.edit(1, Some("")).unwrap();
        assert_eq!(store.tasks()[0].description, "");
        store.edit(99, Some("ghost")).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn change_status_touches_only_target() {
        let mut store = empty_store();
        store.add("A").unwrap();
        store.add("B").unwrap();
        store.add("C").unwrap();
        store.change_status(2, TaskStatus::Completed).unwrap();
        let statuses: Vec<_> = store.tasks().iter().map(|t| t.status).collect();
        assert_eq!(
            statuses,
            vec![TaskStatus::Pending, TaskStatus::Completed, TaskStatus::Pending]
        );
    }

    #[test]
    fn remove_present_and_absent() {
        let mut store = empty_store();
        store.add("A").unwrap();
        store.add("B").unwrap();
        store.remove(1).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.get(1).is_none());
        store.remove(42).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn filtering_is_stable_and_idempotent() {
        let mut store = empty_store();
        for name in ["A", "B", "C", "D"] {
            store.add(name).unwrap();
        }
        store.change_status(2, TaskStatus::InProgress).unwrap();
        let filter = StatusFilter::from(TaskStatus::Pending);
        let once: Vec<Task> = store.visible_tasks(filter).into_iter().cloned().collect();
        let twice = visible_tasks(&once, filter);
        assert_eq!(ids(&twice), vec![1, 3, 4]);
        assert_eq!(ids(&store.visible_tasks(StatusFilter::All)), vec![1, 2, 3, 4]);
    }

    #[test]
    fn every_mutation_is_persisted() {
        let dir = TempDir::new().unwrap();
        let mut store =
            TaskStore::hydrate(FileStorage::open(dir.path()).unwrap(), IdPolicy::Monotonic);
        store.add("A").unwrap();
        store.add("B").unwrap();
        store.change_status(1, TaskStatus::InProgress).unwrap();
        store.edit(2, Some("B2")).unwrap();
        let expected = store.tasks().to_vec();

        let reloaded =
            TaskStore::hydrate(FileStorage::open(dir.path()).unwrap(), IdPolicy::Monotonic);
        assert_eq!(reloaded.tasks(), expected.as_slice());
    }

    #[test]
    fn hydrate_malformed_starts_empty() {
        let storage = MemoryStorage::with_value(TASKS_KEY, "{not json");
        let store = TaskStore::hydrate(storage, IdPolicy::Monotonic);
        assert!(store.is_empty());
    }

    #[test]
    fn hydrate_malformed_keeps_a_copy() {
        let storage = MemoryStorage::with_value(TASKS_KEY, r#"[{"id":-1}]"#);
        let mut store = TaskStore::hydrate(storage, IdPolicy::Monotonic);
        store.add("A").unwrap();
        assert_eq!(
            store.storage_mut().get(CORRUPT_TASKS_KEY).unwrap().as_deref(),
            Some(r#"[{"id":-1}]"#)
        );
    }

    #[test]
    fn hydrate_with_max_id_does_not_panic() {
        let storage = MemoryStorage::with_value(
            TASKS_KEY,
            r#"[{"id":18446744073709551615,"description":"A","status":"pending"}]"#,
        );
        let mut store = TaskStore::hydrate(storage, IdPolicy::Monotonic);
        assert_eq!(store.len(), 1);
        assert!(matches!(store.add("B"), Err(StorageError::IdsExhausted)));
        assert_eq!(store.len(), 1);
        store.change_status(u64::MAX, TaskStatus::Completed).unwrap();
        assert_eq!(store.tasks()[0].status, TaskStatus::Completed);
    }

    #[test]
    fn hydrate_accepts_ids_beyond_32_bits() {
        let storage = MemoryStorage::with_value(
            TASKS_KEY,
            r#"[{"id":4294967295,"description":"A","status":"pending"}]"#,
        );
        let mut store = TaskStore::hydrate(storage, IdPolicy::Monotonic);
        assert_eq!(store.add("B").unwrap(), Some(4_294_967_296));
    }

    #[test]
    fn hydrate_reads_browser_format() {
        let storage = MemoryStorage::with_value(
            TASKS_KEY,
            r#"[{"id":1,"description":"A","status":"inProgress"},{"id":3,"description":"B","status":"pending"}]"#,
        );
        let mut store = TaskStore::hydrate(storage, IdPolicy::Monotonic);
        assert_eq!(store.len(), 2);
        assert_eq!(store.tasks()[0].status, TaskStatus::InProgress);
        assert_eq!(store.add("C").unwrap(), Some(4));
    }

    #[test]
    fn monotonic_ids_do_not_collide_after_delete() {
        let mut store = empty_store();
        store.add("A").unwrap();
        store.add("B").unwrap();
        store.remove(1).unwrap();
        assert_eq!(store.add("C").unwrap(), Some(3));
    }

    #[test]
    fn sequence_length_ids_reproduce_collision() {
        let mut store = TaskStore::hydrate(MemoryStorage::new(), IdPolicy::SequenceLength);
        store.add("A").unwrap();
        store.add("B").unwrap();
        store.remove(1).unwrap();
        assert_eq!(store.add("C").unwrap(), Some(2));
        store.change_status(2, TaskStatus::Completed).unwrap();
        assert!(store
            .tasks()
            .iter()
            .all(|t| t.status == TaskStatus::Completed));
        store.remove(2).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn write_failure_keeps_memory_state() {
        let mut storage = MemoryStorage::new();
        storage.fail_writes(true);
        let mut store = TaskStore::hydrate(storage, IdPolicy::Monotonic);
        assert!(store.add("A").is_err());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn end_to_end_scenario() {
        let mut store = empty_store();
        assert_eq!(store.add("A").unwrap(), Some(1));
        assert_eq!(store.add("B").unwrap(), Some(2));
        assert!(store.tasks().iter().all(|t| t.status == TaskStatus::Pending));
        store.change_status(1, TaskStatus::InProgress).unwrap();
        assert_eq!(
            ids(&store.visible_tasks(TaskStatus::Pending.into())),
            vec![2]
        );
        assert_eq!(
            ids(&store.visible_tasks(TaskStatus::InProgress.into())),
            vec![1]
        );
        store.remove(2).unwrap();
        assert_eq!(ids(&store.visible_tasks(StatusFilter::All)), vec![1]);
    }

    #[test]
    fn counts_by_status() {
        let mut store = empty_store();
        store.add("A").unwrap();
        store.add("B").unwrap();
        store.change_status(2, TaskStatus::Completed).unwrap();
        assert_eq!(store.counts(), [1, 0, 1]);
    }
}
