use crate::task::{StatusFilter, TaskStatus};
use tracing::debug;

/// Three-way status selector. Knows nothing about tasks; the owner is told
/// about every activation through the listener passed to `select`.
#[derive(Debug, Default, Clone)]
pub struct FilterSelector {
    selected: Option<TaskStatus>,
}

impl FilterSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn choices(&self) -> &'static [TaskStatus] {
        &TaskStatus::ALL
    }

    pub fn selected(&self) -> Option<TaskStatus> {
        self.selected
    }

    pub fn is_active(&self, status: TaskStatus) -> bool {
        self.selected == Some(status)
    }

    /// Calls `listener` exactly once, even when `status` is already selected.
    pub fn select<F>(&mut self, status: TaskStatus, listener: F)
    where
        F: FnOnce(StatusFilter),
    {
        self.selected = Some(status);
        debug!(%status, "filter selected");
        listener(StatusFilter::from(status));
    }

    pub fn cycle<F>(&mut self, listener: F)
    where
        F: FnOnce(StatusFilter),
    {
        let next = match self.selected {
            None | Some(TaskStatus::Completed) => TaskStatus::Pending,
            Some(TaskStatus::Pending) => TaskStatus::InProgress,
            Some(TaskStatus::InProgress) => TaskStatus::Completed,
        };
        self.select(next, listener);
    }

    /// Clears the highlight when the owner goes back to showing everything.
    pub fn reset_all(&mut self) {
        self.selected = None;
    }
}
