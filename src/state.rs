use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::types::Config;

/// Application state shared by the REST handlers and background pollers.
pub struct AppState {
    pub config: Mutex<Option<Config>>,
    pub db: Mutex<Option<crate::db::AppDb>>,
}

impl AppState {
    pub fn new() -> Self {
        let config = load_config().ok();

        let db = match crate::db::AppDb::open() {
            Ok(db) => Some(db),
            Err(e) => {
                log::warn!("Failed to open database: {e}. Persistence disabled.");
                None
            }
        };

        Self {
            config: Mutex::new(config),
            db: Mutex::new(db),
        }
    }

    /// State with an explicit database, for tests.
    #[cfg(test)]
    pub fn with_db(db: crate::db::AppDb) -> Self {
        Self {
            config: Mutex::new(Some(Config::default())),
            db: Mutex::new(Some(db)),
        }
    }

    /// Snapshot the current config (or defaults when no file exists).
    pub fn config_snapshot(&self) -> Config {
        self.config
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Get the canonical config file path (~/.scamshield/config.json)
pub fn config_path() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or("Could not find home directory")?;
    Ok(home.join(".scamshield").join("config.json"))
}

/// Load configuration from ~/.scamshield/config.json
pub fn load_config() -> Result<Config, String> {
    let path = config_path()?;

    if !path.exists() {
        return Err(format!(
            "Config file not found at {}. The server boots with defaults; integrations stay disabled.",
            path.display()
        ));
    }

    let content =
        fs::read_to_string(&path).map_err(|e| format!("Failed to read config: {}", e))?;

    serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))
}

/// Create or update config.json atomically.
///
/// If config already exists in-memory, clones it, applies the mutator, and
/// writes back. If config is None (first-run), starts from defaults, applies
/// the mutator, ensures ~/.scamshield/ exists, and writes + updates in-memory
/// state.
pub fn create_or_update_config(
    state: &AppState,
    mutator: impl FnOnce(&mut Config),
) -> Result<Config, String> {
    let mut guard = state.config.lock().map_err(|_| "Lock poisoned")?;

    let mut config = guard.clone().unwrap_or_default();
    mutator(&mut config);

    let path = config_path()?;
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config dir: {}", e))?;
        }
    }

    let content = serde_json::to_string_pretty(&config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(&path, content).map_err(|e| format!("Failed to write config: {}", e))?;

    *guard = Some(config.clone());

    Ok(config)
}
