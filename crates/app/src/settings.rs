//! Handles settings for the application. Configuration is read from
//! `settings.toml` when present, then overridden by `LEDGERBOOK_*`
//! environment variables (e.g. `LEDGERBOOK_SERVER__PORT=8080`).

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite { path: String },
}

impl Default for Database {
    fn default() -> Self {
        Self::Sqlite {
            path: "./ledgerbook.db".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub database: Database,
}

fn default_port() -> u16 {
    3000
}

impl Default for Server {
    fn default() -> Self {
        Self {
            bind: None,
            port: default_port(),
            database: Database::default(),
        }
    }
}

/// Where bearer tokens get resolved.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Userinfo { url: String },
    Static { tokens: Vec<StaticToken> },
}

#[derive(Debug, Deserialize)]
pub struct StaticToken {
    pub token: String,
    pub user_id: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct Auth {
    /// Emails granted administrator rights, matched case-insensitively.
    #[serde(default)]
    pub admin_emails: Vec<String>,
    pub provider: Provider,
}

#[derive(Debug, Deserialize)]
pub struct Time {
    #[serde(default = "default_input_timezone")]
    pub default_input_timezone: String,
}

impl Default for Time {
    fn default() -> Self {
        Self {
            default_input_timezone: default_input_timezone(),
        }
    }
}

fn default_input_timezone() -> String {
    "Asia/Kolkata".to_string()
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    #[serde(default)]
    pub server: Server,
    pub auth: Auth,
    #[serde(default)]
    pub time: Time,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings").required(false))
            .add_source(Environment::with_prefix("LEDGERBOOK").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}
