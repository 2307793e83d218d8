use crate::task::{Task, TaskStatus};
use std::time::{Duration, Instant};
use tracing::debug;

pub const DEFAULT_HIDE_AFTER: Duration = Duration::from_secs(3);

/// Which task's status menu is open, if any, plus its pending auto-hide.
///
/// Time is passed in by the caller so the event loop owns the clock.
#[derive(Debug)]
pub struct OptionsMenu {
    open: Option<u64>,
    cursor: usize,
    hide_at: Option<Instant>,
    hide_after: Duration,
}

impl Default for OptionsMenu {
    fn default() -> Self {
        Self::new(DEFAULT_HIDE_AFTER)
    }
}

impl OptionsMenu {
    pub fn new(hide_after: Duration) -> Self {
        Self {
            open: None,
            cursor: 0,
            hide_at: None,
            hide_after,
        }
    }

    pub fn open_for(&self) -> Option<u64> {
        self.open
    }

    pub fn is_open_for(&self, id: u64) -> bool {
        self.open == Some(id)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Opens on `task`, replacing any other open menu. Completed tasks have no menu.
    pub fn open(&mut self, task: &Task) -> bool {
        if task.status.next_statuses().is_empty() {
            return false;
        }
        self.open = Some(task.id);
        self.cursor = 0;
        self.hide_at = None;
        debug!(id = task.id, "options menu opened");
        true
    }

    pub fn pointer_enter(&mut self, id: u64) {
        if self.open == Some(id) {
            self.hide_at = None;
        }
    }

    pub fn pointer_leave(&mut self, now: Instant) {
        if self.open.is_some() {
            self.hide_at = Some(now + self.hide_after);
        }
    }

    /// Closes the menu once its hide deadline has passed.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.hide_at {
            Some(deadline) if now >= deadline => {
                debug!(id = ?self.open, "options menu timed out");
                self.close();
                true
            }
            _ => false,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.hide_at
    }

    pub fn move_cursor(&mut self, task: &Task, delta: isize) {
        let offered = task.status.next_statuses().len();
        if offered == 0 {
            return;
        }
        self.cursor = (self.cursor as isize + delta).clamp(0, offered as isize - 1) as usize;
    }

    /// The highlighted status, if the menu is open on `task`. Closes the menu.
    pub fn choose(&mut self, task: &Task) -> Option<TaskStatus> {
        if self.open != Some(task.id) {
            return None;
        }
        let choice = task.status.next_statuses().get(self.cursor).copied();
        self.close();
        choice
    }

    pub fn close(&mut self) {
        self.open = None;
        self.cursor = 0;
        self.hide_at = None;
    }

    pub fn teardown(&mut self) {
        self.hide_at = None;
        self.close();
    }
}
