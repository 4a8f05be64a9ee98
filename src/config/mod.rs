use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_workshop_id")]
    pub workshop_id: String,
    /// Rate applied when the hour-cost calculation cannot be resolved.
    #[serde(default = "default_hourly_rate")]
    pub default_hourly_rate: f64,
    #[serde(default = "default_worker_poll_secs")]
    pub worker_poll_secs: u64,
    #[serde(default = "default_board_poll_secs")]
    pub board_poll_secs: u64,
    #[serde(default = "default_read_retries")]
    pub read_retries: u32,
    /// in_progress intervals longer than this are flagged stale (0 disables).
    #[serde(default = "default_stale_after_minutes")]
    pub stale_after_minutes: i64,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_database() -> String {
    Config::database_file().to_string_lossy().to_string()
}
fn default_workshop_id() -> String {
    "main".to_string()
}
fn default_hourly_rate() -> f64 {
    25.0
}
fn default_worker_poll_secs() -> u64 {
    10
}
fn default_board_poll_secs() -> u64 {
    20
}
fn default_read_retries() -> u32 {
    2
}
fn default_stale_after_minutes() -> i64 {
    720
}
fn default_busy_timeout_ms() -> u64 {
    5000
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database(),
            workshop_id: default_workshop_id(),
            default_hourly_rate: default_hourly_rate(),
            worker_poll_secs: default_worker_poll_secs(),
            board_poll_secs: default_board_poll_secs(),
            read_retries: default_read_retries(),
            stale_after_minutes: default_stale_after_minutes(),
            busy_timeout_ms: default_busy_timeout_ms(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Return the standard configuration directory depending on the platform
    pub fn config_dir() -> PathBuf {
        if cfg!(target_os = "windows") {
            let appdata = env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(appdata).join("shoplog")
        } else {
            let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".shoplog")
        }
    }

    /// Return the full path of the config file
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("shoplog.conf")
    }

    /// Return the full path of the SQLite database
    pub fn database_file() -> PathBuf {
        Self::config_dir().join("shoplog.sqlite")
    }

    /// Load configuration from file, or return defaults if not found
    pub fn load() -> AppResult<Self> {
        Self::load_from(&Self::config_file())
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path).map_err(|_| AppError::ConfigLoad)?;
        let cfg: Config = serde_yaml::from_str(&content)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values that would make the engine misbehave silently.
    pub fn validate(&self) -> AppResult<()> {
        if !self.default_hourly_rate.is_finite() || self.default_hourly_rate < 0.0 {
            return Err(AppError::Config(format!(
                "default_hourly_rate must be a non-negative number, got {}",
                self.default_hourly_rate
            )));
        }
        if self.worker_poll_secs == 0 || self.board_poll_secs == 0 {
            return Err(AppError::Config(
                "poll intervals must be at least 1 second".into(),
            ));
        }
        if self.stale_after_minutes < 0 {
            return Err(AppError::Config(
                "stale_after_minutes cannot be negative".into(),
            ));
        }
        Ok(())
    }

    pub fn stale_after(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.stale_after_minutes)
    }

    pub fn to_yaml(&self) -> AppResult<String> {
        serde_yaml::to_string(self).map_err(|e| AppError::Config(e.to_string()))
    }

    /// Write the configuration file and return the database path it points to.
    ///
    /// With `is_test` the file is left untouched and only the DB path is resolved.
    pub fn init_all(custom_db: Option<String>, is_test: bool) -> AppResult<Config> {
        let dir = Self::config_dir();

        // DB name: user provided or default
        let db_path = match custom_db {
            Some(name) => {
                let p = Path::new(&name);
                if p.is_absolute() {
                    p.to_path_buf()
                } else {
                    dir.join(p)
                }
            }
            None => Self::database_file(),
        };

        let config = Config {
            database: db_path.to_string_lossy().to_string(),
            ..Config::default()
        };

        if !is_test {
            fs::create_dir_all(&dir)?;
            let yaml = config.to_yaml()?;
            fs::write(Self::config_file(), yaml).map_err(|_| AppError::ConfigSave)?;
        }

        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        Ok(config)
    }
}
