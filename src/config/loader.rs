//! Configuration loading: file sources and environment overlay.

use super::DriftwatchConfig;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use std::path::{Path, PathBuf};

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with standard layering.
    ///
    /// `explicit_file` replaces the ./driftwatch.toml lookup and must
    /// exist; the global file stays underneath either way.
    pub fn load(explicit_file: Option<&Path>) -> Result<DriftwatchConfig, ConfigError> {
        let builder = Config::builder();
        let builder = Self::add_global_file(builder);
        let builder = Self::add_local_file(builder, explicit_file)?;
        let builder = Self::add_environment(builder);

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Global config file path (~/.config/driftwatch/config.toml on Linux).
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "driftwatch", "driftwatch")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    fn add_global_file(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
        match Self::global_config_path() {
            Some(path) => builder.add_source(File::from(path).required(false)),
            None => builder,
        }
    }

    fn add_local_file(
        builder: ConfigBuilder<DefaultState>,
        explicit_file: Option<&Path>,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        match explicit_file {
            Some(path) => {
                let path_str = path.to_str().ok_or_else(|| {
                    ConfigError::Message(format!("Non-UTF-8 config path: {}", path.display()))
                })?;
                Ok(builder.add_source(File::with_name(path_str)))
            }
            None => Ok(builder.add_source(File::with_name("driftwatch").required(false))),
        }
    }

    /// DRIFTWATCH prefix with `__` separating nested keys, so
    /// DRIFTWATCH__SERVER__PASSWORD reaches server.password.
    fn add_environment(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
        builder.add_source(
            Environment::with_prefix("DRIFTWATCH")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
    }
}
