// src/core/paths.rs

use crate::constants::{CONFIG_DIR_NAME, CONFIG_FILENAME};
use std::path::PathBuf;

/// Returns the run-shell configuration directory (`~/.config/run-shell` on Linux).
///
/// Unlike most tools we never create it: a login shell launcher has no
/// business writing to the home directory on every start.
pub fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME))
}

/// Returns the default location of `config.toml`, if the platform has a config directory.
pub fn get_config_file_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join(CONFIG_FILENAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_lives_in_config_dir() {
        if let (Some(dir), Some(file)) = (get_config_dir(), get_config_file_path()) {
            assert_eq!(file.parent(), Some(dir.as_path()));
            assert!(file.ends_with("run-shell/config.toml"));
        }
    }
}
