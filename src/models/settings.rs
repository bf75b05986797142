// Settings Model
// Server configuration persisted in settings.json

use serde::{Deserialize, Serialize};

fn default_log_retention_days() -> u32 {
    30
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8010
}

fn default_rate_limit_per_minute() -> u32 {
    300
}

fn default_cors_origins() -> String {
    "http://localhost:*,http://127.0.0.1:*".to_string()
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    // Log retention
    #[serde(default = "default_log_retention_days")]
    pub log_retention_days: u32,

    // HTTP server
    #[serde(default)]
    pub remote_enabled: bool,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub api_token: String,
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,

    // Deployed stylesheet location; empty means <data dir>/public/css/theme.css
    #[serde(default)]
    pub css_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_retention_days: default_log_retention_days(),
            remote_enabled: false,
            host: default_host(),
            port: default_port(),
            api_token: String::new(),
            rate_limit_per_minute: default_rate_limit_per_minute(),
            cors_origins: default_cors_origins(),
            css_path: String::new(),
        }
    }
}
