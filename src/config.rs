use crate::task_store::IdPolicy;
use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

const APP_DIR: &str = "tasklist";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub data_dir: PathBuf,
    pub menu_hide_after_ms: u64,
    pub id_policy: IdPolicy,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            menu_hide_after_ms: 3000,
            id_policy: IdPolicy::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Reads `path`, or the per-user config file when `path` is `None`.
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed reading {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("failed parsing {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn menu_hide_after(&self) -> Duration {
        Duration::from_millis(self.menu_hide_after_ms)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
}

fn default_data_dir() -> PathBuf {
    match dirs::data_dir() {
        Some(dir) => dir.join(APP_DIR),
        None => {
            warn!("no user data directory; storing tasks in the working directory");
            PathBuf::from(format!(".{APP_DIR}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.menu_hide_after(), Duration::from_secs(3));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = Config::parse(
            r#"
data_dir = "/tmp/tasks"
id_policy = "sequence-length"
"#,
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/tasks"));
        assert_eq!(config.id_policy, IdPolicy::SequenceLength);
        assert_eq!(config.menu_hide_after_ms, 3000);
        assert_eq!(config.log_dir(), PathBuf::from("/tmp/tasks/logs"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "menu_hide_after_ms = \"soon\"").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }
}
