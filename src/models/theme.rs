use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Persisted theme record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeRecord {
    pub name: String,
    pub theme_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub json_data: String,
    pub modified: DateTime<Utc>,
}

impl ThemeRecord {
    pub fn to_detail(&self) -> ThemeDetail {
        ThemeDetail {
            name: self.name.clone(),
            theme_name: self.theme_name.clone(),
            description: self.description.clone(),
            is_default: self.is_default,
            json_data: self.json_data.clone(),
        }
    }
}

// Theme row for list views, with its swatch colors
#[derive(Debug, Clone, Serialize)]
pub struct ThemeSummary {
    pub name: String,
    pub theme_name: String,
    pub description: String,
    pub is_default: bool,
    pub modified: DateTime<Utc>,
    pub primary_color: String,
    pub neutral_color: String,
}

// Single theme including its raw config
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThemeDetail {
    pub name: String,
    pub theme_name: String,
    pub description: String,
    pub is_default: bool,
    pub json_data: String,
}

// Input for creating a theme
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTheme {
    pub theme_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub json_data: String,
    #[serde(default)]
    pub is_default: bool,
}

// Input for updating a theme; theme_name is fixed at creation.
// is_default is left untouched when absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThemeUpdate {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub json_data: String,
    #[serde(default)]
    pub is_default: Option<bool>,
}
