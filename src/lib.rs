//! Terminal task list: a persisted task store, a status filter selector and
//! a per-task options menu, wired together by [`app::App`].

pub mod app;
pub mod config;
pub mod error;
pub mod filter;
pub mod logging;
pub mod options_menu;
pub mod storage;
pub mod task;
pub mod task_store;
pub mod ui;
