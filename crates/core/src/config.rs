use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub watch: WatchConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Directory observed for finished downloads.
    pub directory: String,
    /// Bound on how long `stop()` waits for the worker to wind down.
    #[serde(default = "default_stop_join_ms")]
    pub stop_join_ms: u64,
    /// Repeat events for one path inside this window are ignored.
    #[serde(default = "default_dedup_window_ms")]
    pub dedup_window_ms: u64,
}

/// Name-pattern rules for browser/editor scratch artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_temporary_suffixes")]
    pub temporary_suffixes: Vec<String>,
    #[serde(default = "default_temporary_prefixes")]
    pub temporary_prefixes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(default = "default_initial_wait_ms")]
    pub initial_wait_ms: u64,
    #[serde(default = "default_recheck_wait_ms")]
    pub recheck_wait_ms: u64,
    /// Extensions whose zero-byte files are legitimate.
    #[serde(default = "default_zero_byte_whitelist")]
    pub zero_byte_whitelist: Vec<String>,
}

fn default_stop_join_ms() -> u64 {
    3000
}

fn default_dedup_window_ms() -> u64 {
    5000
}

fn default_temporary_suffixes() -> Vec<String> {
    [".crdownload", ".part", ".partial", ".tmp", ".download"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_temporary_prefixes() -> Vec<String> {
    ["~$", ".~lock.", "."].iter().map(|s| s.to_string()).collect()
}

fn default_initial_wait_ms() -> u64 {
    1500
}

fn default_recheck_wait_ms() -> u64 {
    1000
}

fn default_zero_byte_whitelist() -> Vec<String> {
    [".txt", ".json", ".xml"].iter().map(|s| s.to_string()).collect()
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            temporary_suffixes: default_temporary_suffixes(),
            temporary_prefixes: default_temporary_prefixes(),
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            initial_wait_ms: default_initial_wait_ms(),
            recheck_wait_ms: default_recheck_wait_ms(),
            zero_byte_whitelist: default_zero_byte_whitelist(),
        }
    }
}

pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    let cfg = settings.build()?;
    Ok(cfg.try_deserialize()?)
}
