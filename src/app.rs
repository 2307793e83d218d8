use crate::error::StorageError;
use crate::filter::FilterSelector;
use crate::options_menu::OptionsMenu;
use crate::storage::Storage;
use crate::task::{StatusFilter, Task, TaskStatus};
use crate::task_store::TaskStore;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::time::{Duration, Instant};
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    Adding(String),
    Editing { id: u64, buffer: String },
}

pub struct App<S: Storage> {
    pub store: TaskStore<S>,
    pub filter: StatusFilter,
    pub selector: FilterSelector,
    pub menu: OptionsMenu,
    pub mode: InputMode,
    pub message: Option<String>,
    pub should_quit: bool,
    selected: usize,
}

impl<S: Storage> App<S> {
    pub fn new(store: TaskStore<S>, menu_hide_after: Duration) -> Self {
        Self {
            store,
            filter: StatusFilter::All,
            selector: FilterSelector::new(),
            menu: OptionsMenu::new(menu_hide_after),
            mode: InputMode::Normal,
            message: None,
            should_quit: false,
            selected: 0,
        }
    }

    pub fn visible(&self) -> Vec<&Task> {
        self.store.visible_tasks(self.filter)
    }

    pub fn selected_index(&self) -> Option<usize> {
        let len = self.visible().len();
        (len > 0).then(|| self.selected.min(len - 1))
    }

    pub fn selected_task(&self) -> Option<&Task> {
        let index = self.selected_index()?;
        self.visible().get(index).copied()
    }

    pub fn tick(&mut self, now: Instant) {
        self.menu.tick(now);
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.quit();
            return;
        }
        match std::mem::take(&mut self.mode) {
            InputMode::Normal => self.handle_normal(key, now),
            InputMode::Adding(buffer) => self.handle_adding(key, buffer),
            InputMode::Editing { id, buffer } => self.handle_editing(key, id, buffer),
        }
    }

    fn handle_normal(&mut self, key: KeyEvent, now: Instant) {
        let current = self.selected_task().cloned();
        let menu_on_current = current
            .as_ref()
            .is_some_and(|task| self.menu.is_open_for(task.id));

        match key.code {
            KeyCode::Char('q') => self.quit(),
            KeyCode::Char('a') => {
                self.message = None;
                self.mode = InputMode::Adding(String::new());
            }
            KeyCode::Char('e') => {
                if let Some(task) = current {
                    self.mode = InputMode::Editing {
                        id: task.id,
                        buffer: task.description,
                    };
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(task) = current {
                    if self.menu.is_open_for(task.id) {
                        self.menu.close();
                    }
                    let result = self.store.remove(task.id);
                    self.report(result);
                    self.clamp_cursor();
                }
            }
            KeyCode::Enter if menu_on_current => {
                if let Some(task) = current {
                    if let Some(status) = self.menu.choose(&task) {
                        let result = self.store.change_status(task.id, status);
                        self.report(result);
                        self.clamp_cursor();
                    }
                }
            }
            KeyCode::Char('o') | KeyCode::Enter => {
                if let Some(task) = current {
                    self.menu.open(&task);
                }
            }
            KeyCode::Esc => self.menu.close(),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1, now),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1, now),
            KeyCode::Left | KeyCode::Char('h') => {
                if let Some(task) = current.filter(|_| menu_on_current) {
                    self.menu.move_cursor(&task, -1);
                }
            }
            KeyCode::Right | KeyCode::Char('l') => {
                if let Some(task) = current.filter(|_| menu_on_current) {
                    self.menu.move_cursor(&task, 1);
                }
            }
            KeyCode::Char(c @ '1'..='3') => {
                let status = TaskStatus::ALL[c as usize - '1' as usize];
                self.selector.select(status, |filter| self.filter = filter);
                self.after_filter_change(current.map(|t| t.id), now);
            }
            KeyCode::Tab => {
                self.selector.cycle(|filter| self.filter = filter);
                self.after_filter_change(current.map(|t| t.id), now);
            }
            KeyCode::Char('0') => {
                self.selector.reset_all();
                self.filter = StatusFilter::All;
                self.after_filter_change(current.map(|t| t.id), now);
            }
            _ => {}
        }
    }

    fn handle_adding(&mut self, key: KeyEvent, mut buffer: String) {
        match key.code {
            KeyCode::Enter => match self.store.add(&buffer) {
                Ok(Some(id)) => {
                    info!(id, "task created");
                    self.report(Ok(()));
                    return;
                }
                Ok(None) => {}
                Err(err) => {
                    self.report(Err(err));
                    return;
                }
            },
            KeyCode::Esc => return,
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Char(c) => buffer.push(c),
            _ => {}
        }
        self.mode = InputMode::Adding(buffer);
    }

    fn handle_editing(&mut self, key: KeyEvent, id: u64, mut buffer: String) {
        match key.code {
            KeyCode::Enter => {
                let result = self.store.edit(id, Some(&buffer));
                self.report(result);
                return;
            }
            KeyCode::Esc => {
                // A cancelled edit writes nothing, so an earlier failure stays on screen.
                if let Err(err) = self.store.edit(id, None) {
                    self.report(Err(err));
                }
                return;
            }
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Char(c) => buffer.push(c),
            _ => {}
        }
        self.mode = InputMode::Editing { id, buffer };
    }

    fn move_selection(&mut self, delta: isize, now: Instant) {
        let len = self.visible().len();
        if len == 0 {
            return;
        }
        let before = self.selected_task().map(|t| t.id);
        self.selected = (self.selected.min(len - 1) as isize + delta).clamp(0, len as isize - 1)
            as usize;
        self.sync_pointer(before, now);
    }

    fn after_filter_change(&mut self, before: Option<u64>, now: Instant) {
        self.clamp_cursor();
        self.sync_pointer(before, now);
    }

    /// The list cursor stands in for the mouse pointer over a task's menu affordance.
    fn sync_pointer(&mut self, before: Option<u64>, now: Instant) {
        let after = self.selected_task().map(|t| t.id);
        if before == after {
            return;
        }
        match (self.menu.open_for(), after) {
            (Some(open), Some(id)) if open == id => self.menu.pointer_enter(id),
            (Some(open), _) if before == Some(open) => self.menu.pointer_leave(now),
            _ => {}
        }
    }

    fn clamp_cursor(&mut self) {
        let len = self.visible().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    /// A successful write persists the whole list, so it clears an earlier failure.
    fn report(&mut self, result: Result<(), StorageError>) {
        match result {
            Ok(()) => self.message = None,
            Err(err) => {
                error!(error = %err, "failed to save tasks");
                self.message = Some(format!("Could not save tasks: {err}"));
            }
        }
    }

    fn quit(&mut self) {
        self.menu.teardown();
        self.should_quit = true;
    }
}
