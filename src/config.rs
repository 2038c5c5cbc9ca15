use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tuning knobs for a game session. Every timing constant the engine uses
/// lives here so tests can substitute deterministic values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameConfig {
    /// Number of tables guests can be seated at (ids 1..=table_count).
    pub table_count: u8,
    /// Window after a request becomes current during which a matching
    /// click counts as a success.
    pub response_budget_ms: u64,
    /// Cadence of the expiration monitor.
    pub poll_interval_ms: u64,
    /// Lower bound (inclusive) of the random new-request interval.
    pub interval_min_ms: u64,
    /// Upper bound (exclusive) of the random new-request interval.
    pub interval_max_ms: u64,
    /// Misses that end the session.
    pub miss_limit: u8,
    /// Waiter speed in world units per second.
    pub waiter_speed: f32,
    /// Horizontal distance below which the waiter snaps to its target.
    pub arrival_epsilon: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            table_count: 6,
            response_budget_ms: 2000,
            poll_interval_ms: 100,
            interval_min_ms: 2500,
            interval_max_ms: 4000,
            miss_limit: 10,
            waiter_speed: 5.0,
            arrival_epsilon: 0.1,
        }
    }
}

impl GameConfig {
    pub fn response_budget(&self) -> Duration {
        Duration::from_millis(self.response_budget_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

pub trait ConfigStore {
    fn load(&self) -> GameConfig;
    fn save(&self, cfg: &GameConfig) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "tablerush") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("tablerush_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> GameConfig {
        if let Ok(bytes) = fs::read(&self.path) {
            if let Ok(cfg) = serde_json::from_slice::<GameConfig>(&bytes) {
                return cfg;
            }
        }
        GameConfig::default()
    }

    fn save(&self, cfg: &GameConfig) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}
