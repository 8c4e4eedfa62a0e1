//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use att_core::{ClassifierConfig, PairingBounds, ReportConfig};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// Device signatures for classifying events.
    pub classifier: ClassifierConfig,
    /// Pairing bounds for the live single-event path.
    pub pairing: PairingBounds,
    /// Report aggregation knobs.
    pub report: ReportConfig,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("att.db"),
            classifier: ClassifierConfig::default(),
            pairing: PairingBounds::incremental(),
            report: ReportConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    ///
    /// Precedence, lowest first: built-in defaults, the platform config
    /// file, the `--config` file, then `ATT_*` environment variables.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("ATT_"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for att.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("att"))
}

/// Returns the platform-specific data directory for att.
///
/// On Linux: `~/.local/share/att`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("att"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_path_ends_with_att() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "att");
    }

    #[test]
    fn default_config_uses_data_dir_for_db() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.database_path, data_dir.join("att.db"));
    }

    #[test]
    fn default_classifier_knows_both_directions() {
        let config = Config::default();
        assert!(!config.classifier.entry.addresses.is_empty());
        assert!(!config.classifier.exit.addresses.is_empty());
    }
}
