//! Simulator configuration.
//!
//! Sources, lowest precedence first: built-in defaults, the config file
//! (`luna-upgrade-sim.toml` in the working directory, or `--config`),
//! `LUNA_*` environment variables, then command-line flags.

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use config::{Config, Environment, File as ConfigFile};
use luna_types::VersionMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "luna-upgrade-sim.toml";
pub const ENV_PREFIX: &str = "LUNA";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Filter used when `RUST_LOG` is unset.
    pub log_level: String,
    pub log_format: LogFormat,
    /// TOML file with network gate overrides.
    pub overrides: Option<PathBuf>,
    /// Module versions of the simulated binary, handed to the module runner.
    pub modules: VersionMap,
    /// Module versions recorded in the store before the upgrade.
    pub stored_versions: VersionMap,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            overrides: None,
            modules: VersionMap::new(),
            stored_versions: VersionMap::new(),
        }
    }
}

impl SimConfig {
    /// Load the file and environment layers.
    ///
    /// An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let resolved = match path {
            Some(path) => {
                if !path.exists() {
                    bail!(
                        "configuration file {} not found (specified via --config)",
                        path.display()
                    );
                }
                Some(path.to_path_buf())
            }
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                path.exists().then_some(path)
            }
        };

        let mut builder = Config::builder();
        if let Some(path) = &resolved {
            builder = builder.add_source(ConfigFile::from(path.as_path()));
        }
        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX));

        let config = builder.build().context("failed to read simulator configuration")?;
        config
            .try_deserialize()
            .context("invalid simulator configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_apply_without_a_file() {
        let config = SimConfig::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.modules.is_empty());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.toml");
        fs::write(
            &path,
            r#"
log_format = "json"
overrides = "gates.toml"

[modules]
bank = 4
tokenfactory = 3

[stored_versions]
bank = 3
"#,
        )
        .unwrap();

        let config = SimConfig::load(Some(&path)).unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.overrides, Some(PathBuf::from("gates.toml")));
        assert_eq!(config.modules.get("tokenfactory"), Some(&3));
        assert_eq!(config.stored_versions.get("bank"), Some(&3));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SimConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
