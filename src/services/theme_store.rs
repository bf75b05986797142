// ThemeStore Service
// Persists theme records and keeps at most one of them flagged as default

use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard};

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::models::{NewTheme, ThemeDetail, ThemeRecord, ThemeSummary, ThemeUpdate};
use crate::services::render_swatch;

const STORE_FILE: &str = "themes.json";
const NAME_LENGTH: usize = 10;

/// Errors that can occur while reading or writing themes
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Invalid JSON data")]
    InvalidJson,

    #[error("Theme name is required")]
    MissingThemeName,

    #[error("Theme '{0}' not found")]
    NotFound(String),

    #[error("Theme store is unreadable: {0}")]
    Corrupt(String),

    #[error("Failed to write themes: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize themes: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Theme store lock poisoned")]
    Poisoned,
}

/// Manages theme records in `<app data>/themes.json`
pub struct ThemeStore {
    store_path: PathBuf,
    records: RwLock<Vec<ThemeRecord>>,
}

impl ThemeStore {
    /// Open the store in the given app data directory, creating it if missing
    pub fn open(app_data_dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(app_data_dir)?;
        let store_path = app_data_dir.join(STORE_FILE);

        let records = if store_path.exists() {
            let content = std::fs::read_to_string(&store_path)?;
            serde_json::from_str::<Vec<ThemeRecord>>(&content)
                .map_err(|e| StoreError::Corrupt(e.to_string()))?
        } else {
            Vec::new()
        };

        let defaults = records.iter().filter(|r| r.is_default).count();
        if defaults > 1 {
            log::warn!("Theme store has {defaults} default themes; listing will show all of them until one is set");
        }
        log::info!("ThemeStore: {} theme(s) loaded from {:?}", records.len(), store_path);

        Ok(Self {
            store_path,
            records: RwLock::new(records),
        })
    }

    /// All themes with their swatches, most recently modified first
    pub fn list_summaries(&self) -> Result<Vec<ThemeSummary>, StoreError> {
        let records = self.read()?;

        // Later writes sit at the end of the vec; reversing first keeps them
        // ahead of older records with an identical timestamp.
        let mut ordered: Vec<&ThemeRecord> = records.iter().rev().collect();
        ordered.sort_by(|a, b| b.modified.cmp(&a.modified));

        Ok(ordered.into_iter().map(summarize).collect())
    }

    pub fn get(&self, name: &str) -> Result<ThemeDetail, StoreError> {
        let records = self.read()?;
        records
            .iter()
            .find(|r| r.name == name)
            .map(ThemeRecord::to_detail)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    /// Insert a new theme and return its generated name
    pub fn create(&self, theme: NewTheme) -> Result<String, StoreError> {
        let theme_name = theme.theme_name.trim().to_string();
        if theme_name.is_empty() {
            return Err(StoreError::MissingThemeName);
        }
        validate_json_data(&theme.json_data)?;

        self.write(|records| {
            let name = generate_name(records);
            if theme.is_default {
                apply_default(records, None);
            }
            records.push(ThemeRecord {
                name: name.clone(),
                theme_name,
                description: theme.description,
                is_default: theme.is_default,
                json_data: theme.json_data,
                modified: Utc::now(),
            });
            log::info!("Created theme {name}");
            Ok(name)
        })
    }

    /// Replace a theme's description and config
    pub fn update(&self, name: &str, update: ThemeUpdate) -> Result<String, StoreError> {
        validate_json_data(&update.json_data)?;

        self.write(|records| {
            let index = position(records, name)?;
            let mut record = records.remove(index);
            record.description = update.description;
            record.json_data = update.json_data;
            record.modified = Utc::now();

            match update.is_default {
                Some(true) => {
                    apply_default(records, None);
                    record.is_default = true;
                }
                Some(false) => record.is_default = false,
                None => {}
            }

            records.push(record);
            log::info!("Updated theme {name}");
            Ok(name.to_string())
        })
    }

    pub fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.write(|records| {
            let index = position(records, name)?;
            records.remove(index);
            log::info!("Deleted theme {name}");
            Ok(())
        })
    }

    /// The theme currently flagged as default, if any
    pub fn default_theme(&self) -> Result<Option<ThemeDetail>, StoreError> {
        let records = self.read()?;
        Ok(records
            .iter()
            .rev()
            .find(|r| r.is_default)
            .map(ThemeRecord::to_detail))
    }

    /// Flag `name` as the only default theme, or clear the default when `None`.
    /// The whole change is persisted in a single write.
    pub fn set_default(&self, name: Option<&str>) -> Result<(), StoreError> {
        self.write(|records| {
            if let Some(target) = name {
                let index = position(records, target)?;
                let mut record = records.remove(index);
                record.modified = Utc::now();
                records.push(record);
            }
            apply_default(records, name);
            match name {
                Some(target) => log::info!("Default theme set to {target}"),
                None => log::info!("Default theme cleared"),
            }
            Ok(())
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<ThemeRecord>>, StoreError> {
        self.records.read().map_err(|_| StoreError::Poisoned)
    }

    /// Apply `mutate` to a copy of the records, persist it, then publish it.
    /// The write guard is held throughout so concurrent writers serialize.
    fn write<T>(
        &self,
        mutate: impl FnOnce(&mut Vec<ThemeRecord>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self.records.write().map_err(|_| StoreError::Poisoned)?;
        let mut next = guard.clone();
        let result = mutate(&mut next)?;
        self.persist(&next)?;
        *guard = next;
        Ok(result)
    }

    fn persist(&self, records: &[ThemeRecord]) -> Result<(), StoreError> {
        let tmp = self.store_path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(records)?;
        let result = std::fs::write(&tmp, content).and_then(|_| std::fs::rename(&tmp, &self.store_path));
        if let Err(e) = result {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

fn summarize(record: &ThemeRecord) -> ThemeSummary {
    let swatch = render_swatch(&record.json_data);
    ThemeSummary {
        name: record.name.clone(),
        theme_name: record.theme_name.clone(),
        description: record.description.clone(),
        is_default: record.is_default,
        modified: record.modified,
        primary_color: swatch.primary_color,
        neutral_color: swatch.neutral_color,
    }
}

fn position(records: &[ThemeRecord], name: &str) -> Result<usize, StoreError> {
    records
        .iter()
        .position(|r| r.name == name)
        .ok_or_else(|| StoreError::NotFound(name.to_string()))
}

fn apply_default(records: &mut [ThemeRecord], name: Option<&str>) {
    for record in records.iter_mut() {
        record.is_default = name == Some(record.name.as_str());
    }
}

fn generate_name(records: &[ThemeRecord]) -> String {
    loop {
        let candidate: String = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(NAME_LENGTH)
            .collect();
        if !records.iter().any(|r| r.name == candidate) {
            return candidate;
        }
    }
}

/// Config text is stored verbatim but must be well-formed JSON when present
fn validate_json_data(json_data: &str) -> Result<(), StoreError> {
    if json_data.trim().is_empty() {
        return Ok(());
    }
    serde_json::from_str::<Value>(json_data)
        .map(|_| ())
        .map_err(|_| StoreError::InvalidJson)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn new_theme(theme_name: &str, json_data: &str) -> NewTheme {
        NewTheme {
            theme_name: theme_name.to_string(),
            description: format!("{theme_name} description"),
            json_data: json_data.to_string(),
            is_default: false,
        }
    }

    fn default_names(store: &ThemeStore) -> Vec<String> {
        store
            .list_summaries()
            .unwrap()
            .into_iter()
            .filter(|s| s.is_default)
            .map(|s| s.name)
            .collect()
    }

    #[test]
    fn test_create_and_get() {
        let temp = tempdir().unwrap();
        let store = ThemeStore::open(temp.path()).unwrap();

        let name = store.create(new_theme("Ocean", r#"{"primaryHue":200}"#)).unwrap();
        assert_eq!(name.len(), NAME_LENGTH);

        let detail = store.get(&name).unwrap();
        assert_eq!(detail.theme_name, "Ocean");
        assert_eq!(detail.description, "Ocean description");
        assert_eq!(detail.json_data, r#"{"primaryHue":200}"#);
        assert!(!detail.is_default);
    }

    #[test]
    fn test_json_data_stored_verbatim() {
        let temp = tempdir().unwrap();
        let store = ThemeStore::open(temp.path()).unwrap();
        let raw = "{ \"neutralHue\" :  12 ,\n \"primaryHue\": 3 }";

        let name = store.create(new_theme("Spacing", raw)).unwrap();
        assert_eq!(store.get(&name).unwrap().json_data, raw);
    }

    #[test]
    fn test_rejects_invalid_json() {
        let temp = tempdir().unwrap();
        let store = ThemeStore::open(temp.path()).unwrap();

        let err = store.create(new_theme("Broken", "{nope")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidJson));
        assert_eq!(err.to_string(), "Invalid JSON data");
        assert!(store.list_summaries().unwrap().is_empty());

        let name = store.create(new_theme("Fine", "{}")).unwrap();
        let update = ThemeUpdate {
            description: "changed".to_string(),
            json_data: "not json".to_string(),
            is_default: None,
        };
        assert!(matches!(store.update(&name, update), Err(StoreError::InvalidJson)));
        assert_eq!(store.get(&name).unwrap().description, "Fine description");
    }

    #[test]
    fn test_empty_json_data_is_allowed() {
        let temp = tempdir().unwrap();
        let store = ThemeStore::open(temp.path()).unwrap();
        let name = store.create(new_theme("Blank", "")).unwrap();

        let summary = &store.list_summaries().unwrap()[0];
        assert_eq!(summary.name, name);
        assert_eq!(summary.primary_color, "#4299F0");
        assert_eq!(summary.neutral_color, "#666666");
    }

    #[test]
    fn test_rejects_blank_theme_name() {
        let temp = tempdir().unwrap();
        let store = ThemeStore::open(temp.path()).unwrap();
        assert!(matches!(
            store.create(new_theme("   ", "{}")),
            Err(StoreError::MissingThemeName)
        ));
    }

    #[test]
    fn test_list_orders_by_most_recent_write() {
        let temp = tempdir().unwrap();
        let store = ThemeStore::open(temp.path()).unwrap();

        let first = store.create(new_theme("First", "{}")).unwrap();
        let second = store.create(new_theme("Second", "{}")).unwrap();
        let names: Vec<String> = store.list_summaries().unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec![second.clone(), first.clone()]);

        store
            .update(&first, ThemeUpdate {
                description: "touched".to_string(),
                json_data: "{}".to_string(),
                is_default: None,
            })
            .unwrap();
        let names: Vec<String> = store.list_summaries().unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec![first, second]);
    }

    #[test]
    fn test_summaries_include_swatches() {
        let temp = tempdir().unwrap();
        let store = ThemeStore::open(temp.path()).unwrap();
        store.create(new_theme("Corrupt", "[1]")).unwrap();
        store
            .create(new_theme("Legacy", r#"{"_state":{"primaryHue":120,"neutralHue":0}}"#))
            .unwrap();

        let summaries = store.list_summaries().unwrap();
        assert_eq!(summaries[0].theme_name, "Legacy");
        assert_eq!(summaries[0].primary_color, "#1CE31C");
        assert_eq!(summaries[0].neutral_color, "#7E6D6D");
        assert_eq!(summaries[1].primary_color, "#4299F0");
        assert_eq!(summaries[1].neutral_color, "#666666");
    }

    #[test]
    fn test_set_default_is_exclusive() {
        let temp = tempdir().unwrap();
        let store = ThemeStore::open(temp.path()).unwrap();
        let a = store.create(new_theme("A", "{}")).unwrap();
        let b = store.create(new_theme("B", "{}")).unwrap();

        store.set_default(Some(&a)).unwrap();
        assert_eq!(default_names(&store), vec![a.clone()]);

        store.set_default(Some(&b)).unwrap();
        assert_eq!(default_names(&store), vec![b.clone()]);
        assert_eq!(store.default_theme().unwrap().unwrap().name, b);

        store.set_default(None).unwrap();
        assert!(default_names(&store).is_empty());
        assert!(store.default_theme().unwrap().is_none());
    }

    #[test]
    fn test_set_default_unknown_name_leaves_store_unchanged() {
        let temp = tempdir().unwrap();
        let store = ThemeStore::open(temp.path()).unwrap();
        let a = store.create(new_theme("A", "{}")).unwrap();
        store.set_default(Some(&a)).unwrap();

        assert!(matches!(store.set_default(Some("missing")), Err(StoreError::NotFound(_))));
        assert_eq!(default_names(&store), vec![a]);
    }

    #[test]
    fn test_set_default_counts_as_latest_write() {
        let temp = tempdir().unwrap();
        let store = ThemeStore::open(temp.path()).unwrap();
        let a = store.create(new_theme("A", "{}")).unwrap();
        let b = store.create(new_theme("B", "{}")).unwrap();
        store.set_default(Some(&a)).unwrap();

        let stamp = Utc::now();
        for record in store.records.write().unwrap().iter_mut() {
            record.modified = stamp;
        }

        let names: Vec<String> = store.list_summaries().unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec![a, b]);
    }

    #[test]
    fn test_failed_write_removes_temp_file() {
        let temp = tempdir().unwrap();
        let store = ThemeStore::open(temp.path()).unwrap();
        std::fs::create_dir(temp.path().join(STORE_FILE)).unwrap();

        assert!(matches!(store.create(new_theme("A", "{}")), Err(StoreError::Io(_))));
        assert!(!temp.path().join("themes.json.tmp").exists());
        assert!(store.list_summaries().unwrap().is_empty());
    }

    #[test]
    fn test_create_and_update_with_default_flag() {
        let temp = tempdir().unwrap();
        let store = ThemeStore::open(temp.path()).unwrap();
        let a = store
            .create(NewTheme {
                is_default: true,
                ..new_theme("A", "{}")
            })
            .unwrap();
        let b = store
            .create(NewTheme {
                is_default: true,
                ..new_theme("B", "{}")
            })
            .unwrap();
        assert_eq!(default_names(&store), vec![b.clone()]);

        store
            .update(&a, ThemeUpdate {
                description: String::new(),
                json_data: "{}".to_string(),
                is_default: Some(true),
            })
            .unwrap();
        assert_eq!(default_names(&store), vec![a.clone()]);

        store
            .update(&a, ThemeUpdate {
                description: String::new(),
                json_data: "{}".to_string(),
                is_default: Some(false),
            })
            .unwrap();
        assert!(default_names(&store).is_empty());
    }

    #[test]
    fn test_delete() {
        let temp = tempdir().unwrap();
        let store = ThemeStore::open(temp.path()).unwrap();
        let name = store.create(new_theme("Gone", "{}")).unwrap();

        store.delete(&name).unwrap();
        assert!(matches!(store.get(&name), Err(StoreError::NotFound(_))));
        assert!(matches!(store.delete(&name), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_persists_across_reopen() {
        let temp = tempdir().unwrap();
        let name = {
            let store = ThemeStore::open(temp.path()).unwrap();
            let name = store.create(new_theme("Durable", r#"{"primaryHue":1}"#)).unwrap();
            store.set_default(Some(&name)).unwrap();
            name
        };

        let reopened = ThemeStore::open(temp.path()).unwrap();
        let detail = reopened.get(&name).unwrap();
        assert_eq!(detail.theme_name, "Durable");
        assert!(detail.is_default);
        assert!(!temp.path().join("themes.json.tmp").exists());
    }

    #[test]
    fn test_open_rejects_corrupt_store() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join(STORE_FILE), "garbage").unwrap();
        assert!(matches!(ThemeStore::open(temp.path()), Err(StoreError::Corrupt(_))));
    }
}
