use std::path::{Path, PathBuf};

use serde::Deserialize;

const APP_DIR: &str = "picsum-editor";
const APP_CONFIG_FILE: &str = "config.json";

pub const DEFAULT_API_BASE_URL: &str = "https://picsum.photos";
pub const DEFAULT_PAGE_SIZE: usize = 6;
pub const DEFAULT_TOTAL_PAGES: u32 = 10;
/// Largest `limit` the catalog endpoint honours
pub const MAX_PAGE_SIZE: usize = 100;

/// Application-level settings from `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub page_size: usize,
    pub total_pages: u32,
    /// Pause before a saved edit is revealed, in milliseconds
    pub save_delay_ms: u64,
    pub user_agent: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            total_pages: DEFAULT_TOTAL_PAGES,
            save_delay_ms: 0,
            user_agent: concat!("picsum-editor/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

pub fn load_app_config() -> AppConfig {
    match app_config_path(dirs::config_dir().as_deref()) {
        Some(path) => load_app_config_from(&path),
        None => AppConfig::default(),
    }
}

fn load_app_config_from(path: &Path) -> AppConfig {
    if !path.exists() {
        return AppConfig::default();
    }
    let config = match std::fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
            tracing::warn!(?err, ?path, "failed to parse config.json; using defaults");
            AppConfig::default()
        }),
        Err(err) => {
            tracing::warn!(?err, ?path, "failed to read config.json; using defaults");
            AppConfig::default()
        }
    };
    config.sanitized()
}

impl AppConfig {
    /// Replace pagination values the catalog cannot serve with the defaults
    fn sanitized(mut self) -> Self {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            tracing::warn!(page_size = self.page_size, "page_size out of range; using default");
            self.page_size = DEFAULT_PAGE_SIZE;
        }
        if self.total_pages == 0 {
            tracing::warn!("total_pages must be at least 1; using default");
            self.total_pages = DEFAULT_TOTAL_PAGES;
        }
        self
    }
}

fn app_config_path(config_root: Option<&Path>) -> Option<PathBuf> {
    let root = config_root.filter(|path| !path.as_os_str().is_empty())?;
    Some(root.join(APP_DIR).join(APP_CONFIG_FILE))
}
