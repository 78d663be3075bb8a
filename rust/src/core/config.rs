use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

pub(crate) const CONFIG_FILE_NAME: &str = "shopfloor_config.json";

const DEFAULT_HISTORY_PAGE_SIZE: u32 = 20;
const DEFAULT_TOAST_DISMISS_SECS: u64 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub(crate) struct AppConfig {
    pub history_page_size: u32,
    pub toast_dismiss_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            history_page_size: DEFAULT_HISTORY_PAGE_SIZE,
            toast_dismiss_secs: DEFAULT_TOAST_DISMISS_SECS,
        }
    }
}

impl AppConfig {
    fn normalized(mut self) -> Self {
        self.history_page_size = self.history_page_size.max(1);
        self
    }
}

pub(crate) fn config_path(data_dir: &str) -> PathBuf {
    Path::new(data_dir).join(CONFIG_FILE_NAME)
}

fn read_app_config(path: &Path) -> anyhow::Result<Option<AppConfig>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err).with_context(|| format!("read {}", path.display())),
    };
    let config: AppConfig =
        serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))?;
    Ok(Some(config))
}

/// Missing file means defaults; a broken one is logged and ignored.
pub(crate) fn load_app_config(data_dir: &str) -> AppConfig {
    let path = config_path(data_dir);
    match read_app_config(&path) {
        Ok(Some(config)) => config.normalized(),
        Ok(None) => AppConfig::default(),
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "invalid app config, using defaults");
            AppConfig::default()
        }
    }
}
