use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub data: DataConfig,
    pub profiles: Vec<ProfileConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig { fetch_timeout_secs: default_fetch_timeout() }
    }
}

/// One walkability scoring profile: where its dataset lives, which property
/// holds the score, and which properties the popup shows (in display order).
#[derive(Debug, Deserialize, Clone)]
pub struct ProfileConfig {
    pub name: String,
    pub source: PathBuf,
    pub attribute: String,
    pub popup_fields: Vec<PopupFieldConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PopupFieldConfig {
    pub key: String,
    pub label: String,
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_fetch_timeout() -> u64 {
    30
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;
        config.lint();
        Ok(config)
    }

    /// Looks up a profile by name. Names come from the fixed registry, so a
    /// miss is a caller bug, not a user error.
    pub fn profile(&self, name: &str) -> Option<&ProfileConfig> {
        self.profiles.iter().find(|p| p.name == name)
    }

    // Display convention: the scoring attribute should lead the popup. Not
    // enforced structurally, so surface violations at load time.
    fn lint(&self) {
        for profile in &self.profiles {
            match profile.popup_fields.first() {
                Some(first) if first.key == profile.attribute => {}
                _ => warn!(
                    profile = %profile.name,
                    attribute = %profile.attribute,
                    "scoring attribute is not the first popup field"
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [server]
        port = 8080

        [data]
        fetch_timeout_secs = 10

        [[profiles]]
        name = "General Walkability"
        source = "static/data/netascore_salzburg_walk.json"
        attribute = "index_walk_ft"
        popup_fields = [
            { key = "index_walk_ft", label = "Walkability Index" },
            { key = "max_speed_ft", label = "Max Speed" },
        ]
    "#;

    #[test]
    fn parses_profiles_in_order() {
        let config: AppConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.data.fetch_timeout_secs, 10);
        assert_eq!(config.profiles.len(), 1);
        let profile = config.profile("General Walkability").unwrap();
        assert_eq!(profile.attribute, "index_walk_ft");
        assert_eq!(profile.popup_fields[0].label, "Walkability Index");
        assert_eq!(profile.popup_fields[1].key, "max_speed_ft");
    }

    #[test]
    fn unknown_profile_lookup_is_none() {
        let config: AppConfig = toml::from_str(SAMPLE).unwrap();
        assert!(config.profile("Bikeability").is_none());
    }

    #[test]
    fn defaults_apply_when_sections_are_omitted() {
        let minimal = r#"
            profiles = []

            [server]
            port = 3000
        "#;
        let config: AppConfig = toml::from_str(minimal).unwrap();
        assert_eq!(config.server.static_dir, PathBuf::from("static"));
        assert_eq!(config.data.fetch_timeout_secs, 30);
    }
}
