use std::path::{Path, PathBuf};

use config::builder::{ConfigBuilder, DefaultState};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// File stem searched for when the configuration location is a directory.
const CONFIG_FILE_STEM: &str = "keysplit";

/// Supported extensions for configuration files.
const CONFIG_FILE_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Prefix for environment variable configuration overrides.
const ENV_PREFIX: &str = "KEYSPLIT";

/// Separator between environment variable prefix and key segments.
const ENV_PREFIX_SEPARATOR: &str = "_";

/// Separator for nested configuration keys in environment variables.
const ENV_SEPARATOR: &str = "__";

/// Errors that can occur while loading configuration files and overrides.
#[derive(Debug, Error)]
pub enum LoadConfigError {
    /// The configuration path given by the caller does not exist.
    #[error("configuration path `{0}` does not exist")]
    MissingConfigurationPath(PathBuf),

    /// The configuration path is a directory without a recognised configuration file.
    #[error("could not locate a configuration file in `{directory}`; attempted: {attempted}")]
    ConfigurationFileMissing {
        directory: PathBuf,
        attempted: String,
    },

    /// A configuration file existed but could not be parsed.
    #[error("failed to load configuration from `{path}`: {source}")]
    ConfigurationFileLoad {
        path: PathBuf,
        source: config::ConfigError,
    },

    /// The configuration sources were merged but deserialization failed.
    #[error("failed to deserialize configuration: {0}")]
    Deserialization(#[source] config::ConfigError),

    /// Failed to build the merged configuration.
    #[error("failed to initialize configuration builder: {0}")]
    Builder(#[source] config::ConfigError),
}

/// Loads configuration from an optional file and from environment-variable overrides.
///
/// `location` may point at a `yaml`, `yml` or `json` file, or at a directory containing
/// `keysplit.(yaml|yml|json)`. Values from `KEYSPLIT_`-prefixed environment variables are applied
/// on top; nested keys use double underscores (`KEYSPLIT_VOCABULARY__PATH`). Anything left unset
/// falls back to the serde defaults of `T`.
pub fn load_config<T>(location: Option<&Path>) -> Result<T, LoadConfigError>
where
    T: DeserializeOwned,
{
    let mut builder = config::Config::builder();

    if let Some(location) = location {
        let file = find_configuration_file(location)?;
        builder = builder.add_source(config::File::from(file.clone()).required(true));
        validate_configuration_source(&builder, &file)?;
    }

    let environment_source = config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_PREFIX_SEPARATOR)
        .separator(ENV_SEPARATOR)
        .try_parsing(true);

    let settings = builder
        .add_source(environment_source)
        .build()
        .map_err(LoadConfigError::Builder)?;

    settings
        .try_deserialize::<T>()
        .map_err(LoadConfigError::Deserialization)
}

/// Resolves the configuration file for a file or directory location.
fn find_configuration_file(location: &Path) -> Result<PathBuf, LoadConfigError> {
    if location.is_file() {
        return Ok(location.to_path_buf());
    }

    if !location.is_dir() {
        return Err(LoadConfigError::MissingConfigurationPath(
            location.to_path_buf(),
        ));
    }

    let mut attempted_paths = Vec::with_capacity(CONFIG_FILE_EXTENSIONS.len());

    for extension in CONFIG_FILE_EXTENSIONS {
        let path = location.join(format!("{CONFIG_FILE_STEM}.{extension}"));
        attempted_paths.push(path.clone());

        if path.is_file() {
            return Ok(path);
        }
    }

    let attempted = attempted_paths
        .iter()
        .map(|path| format!("`{}`", path.display()))
        .collect::<Vec<_>>()
        .join(", ");

    Err(LoadConfigError::ConfigurationFileMissing {
        directory: location.to_path_buf(),
        attempted,
    })
}

fn validate_configuration_source(
    builder: &ConfigBuilder<DefaultState>,
    path: &Path,
) -> Result<(), LoadConfigError> {
    builder
        .clone()
        .build()
        .map_err(|source| LoadConfigError::ConfigurationFileLoad {
            path: path.to_path_buf(),
            source,
        })
        .map(|_| ())
}
