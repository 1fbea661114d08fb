//! Plugin configuration.
//!
//! Options use the same camelCase names as the host plugin schema. A missing
//! file means defaults; a present but broken file is an error.
//!
//! Default location: `~/.config/autopilot-server/config.json` (platform
//! equivalent via `directories`).

use directories::ProjectDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use thiserror::Error;

use autopilot_core::protocol::nmea0183::DEFAULT_TALKER;

const CONFIG_FILE: &str = "config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Cannot parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid talker id '{0}', expected two letters or digits")]
    InvalidTalker(String),
    #[error("Invalid UDP address '{0}'")]
    InvalidUdpAddress(String),
}

pub fn get_project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "signalk", "autopilot-server")
}

/// Default config file path, if the platform has a config directory
pub fn default_config_path() -> Option<PathBuf> {
    get_project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PluginConfig {
    /// NMEA 0183 talker id prefixed to every sentence
    pub talker_id: String,
    /// Emit sentences on the named event channel
    pub event_output_enabled: bool,
    /// Name of the event carrying the sentences
    pub event_name: String,
    /// Send sentences as UDP datagrams
    pub udp_output_enabled: bool,
    pub udp_address: String,
    pub udp_port: u16,
}

impl Default for PluginConfig {
    fn default() -> Self {
        PluginConfig {
            talker_id: DEFAULT_TALKER.to_string(),
            event_output_enabled: true,
            event_name: "nmea0183out".to_string(),
            udp_output_enabled: false,
            udp_address: "127.0.0.1".to_string(),
            udp_port: 10110,
        }
    }
}

impl PluginConfig {
    /// Load and validate configuration.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// tried and defaults are used when nothing is there.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => {
                    info!("No config file found, using defaults");
                    PluginConfig::default()
                }
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        let config = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
        info!("Loaded config from {}", path.display());
        debug!("{:?}", config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.talker_id.len() != 2 || !self.talker_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ConfigError::InvalidTalker(self.talker_id.clone()));
        }
        if self.udp_output_enabled {
            self.udp_target()?;
        }
        Ok(())
    }

    /// Destination for UDP output
    pub fn udp_target(&self) -> Result<SocketAddr, ConfigError> {
        self.udp_address
            .parse::<IpAddr>()
            .map(|ip| SocketAddr::new(ip, self.udp_port))
            .map_err(|_| ConfigError::InvalidUdpAddress(self.udp_address.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(text: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = PluginConfig::default();
        assert_eq!(config.talker_id, "MA");
        assert!(config.event_output_enabled);
        assert_eq!(config.event_name, "nmea0183out");
        assert!(!config.udp_output_enabled);
        assert_eq!(config.udp_target().unwrap().to_string(), "127.0.0.1:10110");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let file = write_config(r#"{"talkerId": "AP", "udpOutputEnabled": true, "udpPort": 2000}"#);
        let config = PluginConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.talker_id, "AP");
        assert!(config.udp_output_enabled);
        assert_eq!(config.udp_port, 2000);
        assert_eq!(config.event_name, "nmea0183out");
    }

    #[test]
    fn test_invalid_talker() {
        let file = write_config(r#"{"talkerId": "MAX"}"#);
        assert!(matches!(
            PluginConfig::load(Some(file.path())),
            Err(ConfigError::InvalidTalker(t)) if t == "MAX"
        ));
    }

    #[test]
    fn test_invalid_udp_address_only_checked_when_enabled() {
        let file = write_config(r#"{"udpAddress": "not-an-ip"}"#);
        assert!(PluginConfig::load(Some(file.path())).is_ok());

        let file = write_config(r#"{"udpAddress": "not-an-ip", "udpOutputEnabled": true}"#);
        assert!(matches!(
            PluginConfig::load(Some(file.path())),
            Err(ConfigError::InvalidUdpAddress(_))
        ));
    }

    #[test]
    fn test_missing_and_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(
            PluginConfig::load(Some(&missing)),
            Err(ConfigError::Read { .. })
        ));

        let file = write_config("{ talkerId: ");
        assert!(matches!(
            PluginConfig::load(Some(file.path())),
            Err(ConfigError::Parse { .. })
        ));
    }
}
