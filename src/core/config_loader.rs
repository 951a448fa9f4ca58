//! # Config Loader
//!
//! Builds the final [`RunConfig`] from two layers: the optional `config.toml`
//! file and the command-line flags. Boolean switches are additive (a switch set
//! in either layer is on); `--python-bin` beats the file's `python_bin`.
use crate::{
    core::paths,
    models::{FileConfig, RunConfig},
};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file '{path}'")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Error parsing TOML in '{path}'")]
    TomlParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("Could not expand python_bin '{value}': {message}")]
    Expand { value: String, message: String },
}

/// Loads the configuration file.
///
/// An explicit `path` must exist and parse. A file at the default location
/// may be missing (silently) or unreadable/malformed (with a warning); either
/// way the built-in defaults apply.
pub fn load_file_config(path: Option<&Path>) -> Result<FileConfig, ConfigError> {
    match path {
        Some(path) => read_config_file(path),
        None => Ok(load_default_config()),
    }
}

fn load_default_config() -> FileConfig {
    let Some(path) = paths::get_config_file_path() else {
        log::debug!("No config directory on this platform; using built-in defaults");
        return FileConfig::default();
    };
    load_optional_config(&path)
}

/// Reads a config file that is allowed to be absent or broken.
fn load_optional_config(path: &Path) -> FileConfig {
    match read_config_file(path) {
        Ok(file) => file,
        Err(ConfigError::Read { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
            log::debug!("No config file at {}", path.display());
            FileConfig::default()
        }
        Err(e) => {
            log::warn!(t!("config.warn.ignored"), error = describe(&e));
            FileConfig::default()
        }
    }
}

fn read_config_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;

    log::debug!("Loaded config file {}", path.display());
    toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
        path: path.display().to_string(),
        source,
    })
}

/// `error: cause` on one line, for log records.
fn describe(err: &ConfigError) -> String {
    match std::error::Error::source(err) {
        Some(cause) => format!("{}: {}", err, cause.to_string().trim_end()),
        None => err.to_string(),
    }
}

/// Layers the command-line flags on top of the file config.
pub fn merge(flags: RunConfig, file: FileConfig) -> Result<RunConfig, ConfigError> {
    let python_bin = match (flags.python_bin, file.python_bin) {
        (Some(path), _) => Some(path),
        (None, Some(template)) => Some(expand_python_bin(&template)?),
        (None, None) => None,
    };

    Ok(RunConfig {
        prefer_xonsh: flags.prefer_xonsh || file.prefer_xonsh.unwrap_or(false),
        verbose: flags.verbose || file.verbose.unwrap_or(false),
        fallback_to_zsh: flags.fallback_to_zsh || file.fallback_to_zsh.unwrap_or(false),
        python_bin,
    })
}

/// Loads the file config (from `config_path` or the default location) and merges the flags in.
///
/// Like an unparsable default file, a default file whose `python_bin` cannot
/// be expanded is ignored with a warning.
pub fn resolve_run_config(
    flags: RunConfig,
    config_path: Option<&Path>,
) -> Result<RunConfig, ConfigError> {
    let file = load_file_config(config_path)?;
    match merge(flags.clone(), file) {
        Err(e) if config_path.is_none() => {
            log::warn!(t!("config.warn.ignored"), error = describe(&e));
            merge(flags, FileConfig::default())
        }
        result => result,
    }
}

/// Expands `~` and `$VAR` in the configured interpreter path.
fn expand_python_bin(template: &str) -> Result<PathBuf, ConfigError> {
    let expanded = shellexpand::full(template).map_err(|e| ConfigError::Expand {
        value: template.to_string(),
        message: e.to_string(),
    })?;
    Ok(PathBuf::from(expanded.into_owned()))
}
