//! Application configuration.
//!
//! Values are resolved with priority: config.toml > .env / environment > default.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default database location
pub const DEFAULT_DATABASE_PATH: &str = "data/studydeck.db";

/// Cards per day the progress view measures against
pub const DEFAULT_DAILY_GOAL: i64 = 20;

/// How many recent sessions feed the current correct-answer streak
pub const STREAK_LOOKBACK_SESSIONS: usize = 200;

/// Default window for the session history chart
pub const DEFAULT_HISTORY_DAYS: i64 = 30;

/// Default window for the activity heatmap
pub const DEFAULT_ACTIVITY_DAYS: i64 = 365;

/// Configuration file structure for config.toml
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    database: Option<DatabaseSection>,
    study: Option<StudySection>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabaseSection {
    path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StudySection {
    daily_goal: Option<i64>,
}

/// Resolved configuration handed to the study service
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_path: PathBuf,
    pub daily_goal: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            daily_goal: DEFAULT_DAILY_GOAL,
        }
    }
}

impl Config {
    /// Load from `config.toml` in the working directory, then the environment.
    pub fn load() -> Self {
        // Load .env file if present
        let _ = dotenvy::dotenv();
        Self::load_from(Path::new("config.toml"))
    }

    pub fn load_from(config_file: &Path) -> Self {
        let file = read_file_config(config_file);
        let mut config = Config::default();

        // Priority 1: config file
        let file_db = file.database.and_then(|d| d.path);
        let file_goal = file.study.and_then(|s| s.daily_goal);

        if let Some(path) = file_db {
            tracing::info!("Using database from {}: {}", config_file.display(), path);
            config.database_path = PathBuf::from(path);
        } else if let Ok(path) = std::env::var("DATABASE_PATH") {
            // Priority 2: environment
            tracing::info!("Using database from DATABASE_PATH env: {}", path);
            config.database_path = PathBuf::from(path);
        } else {
            tracing::info!("Using default database path: {}", config.database_path.display());
        }

        if let Some(goal) = file_goal {
            config.daily_goal = goal;
        } else if let Ok(raw) = std::env::var("DAILY_GOAL") {
            match raw.parse() {
                Ok(goal) => config.daily_goal = goal,
                Err(e) => tracing::warn!("Ignoring DAILY_GOAL={}: {}", raw, e),
            }
        }

        config
    }
}

fn read_file_config(path: &Path) -> FileConfig {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return FileConfig::default();
    };
    match toml::from_str::<FileConfig>(&contents) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Ignoring malformed {}: {}", path.display(), e);
            FileConfig::default()
        }
    }
}
