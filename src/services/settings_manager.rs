// SettingsManager Service
// Handles server settings persistence

use std::path::PathBuf;
use std::sync::RwLock;

use serde_json::Value;

use crate::models::Settings;

/// Manages settings.json storage and retrieval
pub struct SettingsManager {
    settings_path: PathBuf,
    cache: RwLock<Option<Settings>>,
}

impl SettingsManager {
    pub fn new(app_data_dir: PathBuf) -> Self {
        Self {
            settings_path: app_data_dir.join("settings.json"),
            cache: RwLock::new(None),
        }
    }

    /// Load settings from disk, or write and return defaults if not found.
    /// Keys missing from an older settings.json are filled in and saved back.
    pub fn load(&self) -> Result<Settings, String> {
        if let Ok(cache) = self.cache.read() {
            if let Some(ref settings) = *cache {
                return Ok(settings.clone());
            }
        }

        let settings = if self.settings_path.exists() {
            let content = std::fs::read_to_string(&self.settings_path)
                .map_err(|e| format!("Failed to read settings: {e}"))?;

            let mut user_value: Value = serde_json::from_str(&content)
                .map_err(|e| format!("Failed to parse settings: {e}"))?;

            let defaults_value = serde_json::to_value(Settings::default())
                .map_err(|e| format!("Failed to build default settings: {e}"))?;
            let changed = merge_missing_settings(&mut user_value, &defaults_value);

            let settings: Settings = serde_json::from_value(user_value)
                .map_err(|e| format!("Failed to parse settings: {e}"))?;

            if changed {
                log::info!("Filled in missing keys in {:?}", self.settings_path);
                self.save_internal(&settings)?;
            }

            settings
        } else {
            let defaults = Settings::default();
            self.save_internal(&defaults)?;
            defaults
        };

        if let Ok(mut cache) = self.cache.write() {
            *cache = Some(settings.clone());
        }

        Ok(settings)
    }

    fn save_internal(&self, settings: &Settings) -> Result<(), String> {
        if let Some(parent) = self.settings_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create settings directory: {e}"))?;
        }

        let content = serde_json::to_string_pretty(settings)
            .map_err(|e| format!("Failed to serialize settings: {e}"))?;

        std::fs::write(&self.settings_path, content)
            .map_err(|e| format!("Failed to write settings: {e}"))
    }
}

fn merge_missing_settings(target: &mut Value, defaults: &Value) -> bool {
    match (target, defaults) {
        (Value::Object(target_map), Value::Object(defaults_map)) => {
            let mut changed = false;
            for (key, default_value) in defaults_map {
                match target_map.get_mut(key) {
                    Some(target_value) => {
                        if merge_missing_settings(target_value, default_value) {
                            changed = true;
                        }
                    }
                    None => {
                        target_map.insert(key.clone(), default_value.clone());
                        changed = true;
                    }
                }
            }
            changed
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_writes_defaults_when_missing() {
        let temp = tempdir().unwrap();
        let manager = SettingsManager::new(temp.path().to_path_buf());

        let settings = manager.load().unwrap();
        assert_eq!(settings.port, 8010);
        assert_eq!(settings.host, "127.0.0.1");
        assert!(temp.path().join("settings.json").exists());
    }

    #[test]
    fn test_fills_missing_keys() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("settings.json");
        std::fs::write(&path, r#"{"port": 9000, "apiToken": "secret"}"#).unwrap();

        let manager = SettingsManager::new(temp.path().to_path_buf());
        let settings = manager.load().unwrap();
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.api_token, "secret");
        assert_eq!(settings.log_retention_days, 30);

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("rateLimitPerMinute"));
    }
}
