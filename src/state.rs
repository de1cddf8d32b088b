//! Shared application state for the job runner.
//!
//! The achieved-milestone set, rest-day config, and all other persisted
//! state live in the store and are passed explicitly into engine functions —
//! nothing here is engine state. This module only holds the open DB handle,
//! the loaded config, and scheduler bookkeeping.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::db::HabitDb;
use crate::types::Config;

pub struct AppState {
    pub config: Mutex<Config>,
    pub db: Mutex<Option<HabitDb>>,
    last_digest_run: Mutex<Option<DateTime<Utc>>>,
    /// Reminder id -> last fired minute key, so a double tick inside one
    /// minute can't fire twice.
    last_reminder_fire: Mutex<HashMap<String, String>>,
}

impl AppState {
    pub fn new() -> Self {
        let config = load_config();

        let db = match HabitDb::open() {
            Ok(db) => Some(db),
            Err(e) => {
                log::warn!("Failed to open habit database: {e}. Store features disabled.");
                None
            }
        };

        Self {
            config: Mutex::new(config),
            db: Mutex::new(db),
            last_digest_run: Mutex::new(None),
            last_reminder_fire: Mutex::new(HashMap::new()),
        }
    }

    pub fn last_digest_run(&self) -> Option<DateTime<Utc>> {
        self.last_digest_run.lock().ok().and_then(|g| *g)
    }

    pub fn set_last_digest_run(&self, at: DateTime<Utc>) {
        if let Ok(mut guard) = self.last_digest_run.lock() {
            *guard = Some(at);
        }
    }

    /// Record that a reminder fired for `minute_key`. Returns false if it
    /// already fired for that minute.
    pub fn mark_reminder_fired(&self, reminder_id: &str, minute_key: &str) -> bool {
        let Ok(mut guard) = self.last_reminder_fire.lock() else {
            return false;
        };
        match guard.get(reminder_id) {
            Some(last) if last == minute_key => false,
            _ => {
                guard.insert(reminder_id.to_string(), minute_key.to_string());
                true
            }
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Load `~/.momentum/config.json`, falling back to defaults when the file is
/// missing or malformed.
pub fn load_config() -> Config {
    let Some(path) = config_path() else {
        log::warn!("Home directory not found, using default config");
        return Config::default();
    };
    match fs::read_to_string(&path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Malformed config at {}: {e}. Using defaults.", path.display());
                Config::default()
            }
        },
        Err(_) => Config::default(),
    }
}

fn config_path() -> Option<PathBuf> {
    Some(dirs::home_dir()?.join(".momentum").join("config.json"))
}

/// Resolve the fixed reference timezone from config, falling back to the
/// default zone if the name doesn't parse.
pub fn reference_tz(config: &Config) -> Tz {
    match config.timezone.parse() {
        Ok(tz) => tz,
        Err(_) => {
            log::warn!(
                "Invalid timezone '{}' in config, falling back to America/New_York",
                config.timezone
            );
            chrono_tz::America::New_York
        }
    }
}
