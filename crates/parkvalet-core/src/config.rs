use std::collections::BTreeMap;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_COOKIE_NAME: &str = "valet_session";
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 7;
/// Ten years; longer lifetimes are rejected at load time.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365 * 10;
pub const DEFAULT_ROWS: u32 = 5;
pub const DEFAULT_COLS: u32 = 10;
pub const MAX_SPOTS_PER_LOT: u32 = 2000;

/// Top-level config (valet.toml + PARKVALET_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValetConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub parking: ParkingConfig,
    /// Category name -> raw vehicle types belonging to it. Categories are
    /// kept in name order, so a raw type listed under several of them
    /// resolves to the first by name, not by position in the file.
    #[serde(default = "default_categories", skip_serializing_if = "BTreeMap::is_empty")]
    pub categories: BTreeMap<String, Vec<String>>,
}

impl Default for ValetConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            session: SessionConfig::default(),
            parking: ParkingConfig::default(),
            categories: default_categories(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Login session settings. The token travels in a cookie or a bearer header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            ttl_hours: DEFAULT_SESSION_TTL_HOURS,
        }
    }
}

/// Layout generation limits for new parking lots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParkingConfig {
    #[serde(default = "default_rows")]
    pub default_rows: u32,
    #[serde(default = "default_cols")]
    pub default_cols: u32,
    #[serde(default = "default_max_spots")]
    pub max_spots: u32,
}

impl Default for ParkingConfig {
    fn default() -> Self {
        Self {
            default_rows: DEFAULT_ROWS,
            default_cols: DEFAULT_COLS,
            max_spots: MAX_SPOTS_PER_LOT,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_cookie_name() -> String {
    DEFAULT_COOKIE_NAME.to_string()
}
fn default_ttl_hours() -> i64 {
    DEFAULT_SESSION_TTL_HOURS
}
fn default_rows() -> u32 {
    DEFAULT_ROWS
}
fn default_cols() -> u32 {
    DEFAULT_COLS
}
fn default_max_spots() -> u32 {
    MAX_SPOTS_PER_LOT
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.parkvalet/valet.db", home)
}

/// Built-in sizing categories, used when the config has no `[categories]` table.
pub fn default_categories() -> BTreeMap<String, Vec<String>> {
    let mut map = BTreeMap::new();
    map.insert(
        "small".to_string(),
        vec!["Convertible", "Coupe", "Hatchback", "Sedan"]
            .into_iter()
            .map(String::from)
            .collect(),
    );
    map.insert(
        "medium".to_string(),
        vec!["Minivan", "SUV", "Wagon"]
            .into_iter()
            .map(String::from)
            .collect(),
    );
    map.insert(
        "large".to_string(),
        vec![
            "Cargo Van",
            "Crew Cab Pickup",
            "Extended Cab Pickup",
            "Passenger Van",
        ]
        .into_iter()
        .map(String::from)
        .collect(),
    );
    map
}

impl ValetConfig {
    /// Load config from a TOML file with PARKVALET_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.parkvalet/valet.toml
    ///
    /// A missing file is not an error: every field has a default.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: Self = Self::figment(&path)
            .extract()
            .map_err(|e| crate::error::ValetError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the rest of the stack cannot represent.
    pub fn validate(&self) -> crate::error::Result<()> {
        let ttl = self.session.ttl_hours;
        if !(1..=MAX_SESSION_TTL_HOURS).contains(&ttl) {
            return Err(crate::error::ValetError::Config(format!(
                "session.ttl_hours must be between 1 and {MAX_SESSION_TTL_HOURS}, got {ttl}"
            )));
        }
        Ok(())
    }

    fn figment(path: &str) -> Figment {
        // categories are left out of the defaults so a `[categories]` table
        // replaces the built-in mapping instead of being merged into it
        let base = ValetConfig {
            categories: BTreeMap::new(),
            ..ValetConfig::default()
        };
        Figment::from(Serialized::defaults(base))
            .merge(Toml::file(path))
            .merge(Env::prefixed("PARKVALET_").split("_"))
    }

    /// Create the directory holding the SQLite file if it is missing.
    pub fn ensure_data_dir(&self) -> crate::error::Result<()> {
        if let Some(parent) = std::path::Path::new(&self.database.path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.parkvalet/valet.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = ValetConfig::load(Some("/nonexistent/parkvalet/valet.toml"))
            .expect("defaults should load");
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.session.cookie_name, DEFAULT_COOKIE_NAME);
        assert_eq!(config.parking.default_rows, DEFAULT_ROWS);
        assert!(config.categories.contains_key("small"));
    }

    #[test]
    fn toml_overrides_categories_and_port() {
        let dir = std::env::temp_dir().join(format!("parkvalet-cfg-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("valet.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 8088

[categories]
bike = ["Scooter", "Motorbike"]
"#,
        )
        .unwrap();

        let config = ValetConfig::load(path.to_str()).unwrap();
        assert_eq!(config.server.port, 8088);
        assert_eq!(config.server.bind, DEFAULT_BIND);
        assert_eq!(config.categories.get("bike").map(Vec::len), Some(2));
        assert!(
            !config.categories.contains_key("small"),
            "file table replaces the built-in mapping"
        );
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn oversized_session_ttl_is_rejected() {
        let dir = std::env::temp_dir().join(format!("parkvalet-cfg-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("valet.toml");
        std::fs::write(&path, "[session]\nttl_hours = 3000000000\n").unwrap();

        let err = ValetConfig::load(path.to_str()).unwrap_err();
        assert!(err.to_string().contains("ttl_hours"), "{err}");
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn default_config_passes_validation() {
        ValetConfig::default().validate().unwrap();
    }

    #[test]
    fn default_config_carries_categories() {
        assert_eq!(ValetConfig::default().categories, default_categories());
    }

    #[test]
    fn default_categories_do_not_overlap() {
        let categories = default_categories();
        let mut seen = std::collections::HashSet::new();
        for types in categories.values() {
            for t in types {
                assert!(seen.insert(t.clone()), "{t} listed twice");
            }
        }
    }
}
