use std::path::{Path, PathBuf};
use std::sync::{OnceLock, RwLock};

use anyhow::Context;
use serde::Deserialize;

/// Pattern used when no configuration has been loaded or set.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%H:%M:%S";

const CONFIG_DIR_NAME: &str = "logfunnel";
const CONFIG_FILE_NAME: &str = "display.toml";

/// Display settings consumed by the aggregation subsystem.
///
/// The subsystem does not own presentation; the one setting it reads is
/// the timestamp display pattern, which may change at any time while
/// records are being formatted.
#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
}

fn default_timestamp_format() -> String {
    DEFAULT_TIMESTAMP_FORMAT.to_owned()
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            timestamp_format: default_timestamp_format(),
        }
    }
}

static DISPLAY: OnceLock<RwLock<DisplayConfig>> = OnceLock::new();

fn display() -> &'static RwLock<DisplayConfig> {
    DISPLAY.get_or_init(|| RwLock::new(DisplayConfig::default()))
}

/// The currently configured timestamp display pattern.
pub fn timestamp_format() -> String {
    let conf = display().read().unwrap_or_else(|e| e.into_inner());
    conf.timestamp_format.clone()
}

/// Changes the timestamp display pattern, effective for every
/// subsequent formatting request.
pub fn set_timestamp_format(pattern: impl Into<String>) {
    let mut conf = display().write().unwrap_or_else(|e| e.into_inner());
    conf.timestamp_format = pattern.into();
}

/// Loads display settings from a TOML file, replacing the current ones.
pub fn load(path: &Path) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading display config {}", path.display()))?;
    let parsed: DisplayConfig = toml::from_str(&raw)
        .with_context(|| format!("parsing display config {}", path.display()))?;
    let mut conf = display().write().unwrap_or_else(|e| e.into_inner());
    *conf = parsed;
    Ok(())
}

/// Default location of the display config file.
pub fn default_config_path() -> PathBuf {
    let mut path = dirs::config_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    path.push(CONFIG_DIR_NAME);
    path.push(CONFIG_FILE_NAME);
    path
}
