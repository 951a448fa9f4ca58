// src/system/shell.rs

use crate::{
    constants::{DEFAULT_PYTHON_BIN, GENERIC_SHELL, XONSH_MODULE, ZSH_CANDIDATES},
    models::{RunConfig, ShellDescriptor, ShellKind},
};
use nix::unistd::{AccessFlags, access};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShellError {
    #[error("Unable to access {path} - Does it exist?")]
    Inaccessible { path: String },
    #[error("No python interpreter was given to run xonsh.")]
    EmptyInterpreter,
    #[error("A shell binary path must not be empty.")]
    EmptyBinary,
    #[error("No candidate shells were configured.")]
    NoCandidates,
    #[error("Shell '{path}' has {count} arguments, but at most {max} fit.")]
    TooManyArguments {
        path: String,
        count: usize,
        max: usize,
    },
}

/// Returns true if `path` is readable and executable by the current user.
pub fn is_accessible(path: &Path) -> bool {
    access(path, AccessFlags::R_OK | AccessFlags::X_OK).is_ok()
}

/// Confirms a resolved shell can actually be executed.
///
/// A failure here is final: the user asked for this shell explicitly, or it
/// is the last-resort default, so there is nothing left to try.
pub fn verify_shell(shell: &ShellDescriptor) -> Result<(), ShellError> {
    if is_accessible(shell.binary()) {
        Ok(())
    } else {
        Err(ShellError::Inaccessible {
            path: shell.binary().display().to_string(),
        })
    }
}

/// Locates shells on disk and builds their descriptors.
///
/// Default shells are found by probing an ordered candidate table, most
/// specific location first. The table is fixed once the resolver is built.
#[derive(Debug, Clone)]
pub struct ShellResolver {
    candidates: Vec<(PathBuf, ShellKind)>,
}

impl Default for ShellResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellResolver {
    /// A resolver over the standard locations: `/usr/bin/zsh`, `/bin/zsh`, then `/bin/sh`.
    pub fn new() -> Self {
        let mut candidates: Vec<(PathBuf, ShellKind)> = ZSH_CANDIDATES
            .iter()
            .map(|path| (PathBuf::from(path), ShellKind::Zsh))
            .collect();
        candidates.push((PathBuf::from(GENERIC_SHELL), ShellKind::Other));
        Self { candidates }
    }

    /// A resolver over a custom candidate table. The last entry is the one
    /// returned when nothing else passes the access check.
    pub fn with_candidates<I>(candidates: I) -> Result<Self, ShellError>
    where
        I: IntoIterator<Item = (PathBuf, ShellKind)>,
    {
        let candidates: Vec<_> = candidates.into_iter().collect();
        if candidates.is_empty() {
            return Err(ShellError::NoCandidates);
        }
        if candidates
            .iter()
            .any(|(path, _)| path.as_os_str().is_empty())
        {
            return Err(ShellError::EmptyBinary);
        }
        Ok(Self { candidates })
    }

    /// Finds the default shell. Never fails: if no candidate passes the
    /// access check, the last one is returned and left to [`verify_shell`].
    pub fn resolve_default(&self) -> ShellDescriptor {
        let found = self.candidates.iter().find(|(path, _)| {
            let usable = is_accessible(path);
            if !usable {
                log::debug!(t!("shell.debug.candidate_skipped"), path = path.display());
            }
            usable
        });

        match found.or_else(|| self.candidates.last()) {
            Some((path, kind)) => ShellDescriptor::bare(path.clone(), *kind),
            None => ShellDescriptor::bare(PathBuf::from(GENERIC_SHELL), ShellKind::Other),
        }
    }

    /// Builds the `python -m xonsh` descriptor.
    ///
    /// The caller supplies the interpreter (the built-in default when the user
    /// gave none), so an empty path here is a bug rather than a user error.
    pub fn resolve_alternate(&self, python_bin: &Path) -> Result<ShellDescriptor, ShellError> {
        if python_bin.as_os_str().is_empty() {
            return Err(ShellError::EmptyInterpreter);
        }
        ShellDescriptor::new(python_bin, ["-m", XONSH_MODULE], ShellKind::Xonsh)
    }

    /// Picks the shell the user asked for.
    pub fn resolve_primary(&self, config: &RunConfig) -> Result<ShellDescriptor, ShellError> {
        if config.prefer_xonsh {
            let python_bin = config
                .python_bin
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PYTHON_BIN));
            self.resolve_alternate(&python_bin)
        } else {
            Ok(self.resolve_default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, mode: u32) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    #[test]
    fn test_resolve_default_picks_first_accessible_candidate() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing-zsh");
        let zsh = write_file(&dir, "zsh", 0o755);
        let sh = write_file(&dir, "sh", 0o755);

        let resolver = ShellResolver::with_candidates([
            (missing, ShellKind::Zsh),
            (zsh.clone(), ShellKind::Zsh),
            (sh, ShellKind::Other),
        ])
        .unwrap();

        let shell = resolver.resolve_default();
        assert_eq!(shell.binary(), zsh.as_path());
        assert_eq!(shell.kind(), ShellKind::Zsh);
        assert!(shell.args().is_empty());
    }

    #[test]
    fn test_resolve_default_falls_back_to_generic_shell() {
        let dir = TempDir::new().unwrap();
        let sh = write_file(&dir, "sh", 0o755);

        let resolver = ShellResolver::with_candidates([
            (dir.path().join("usr-zsh"), ShellKind::Zsh),
            (dir.path().join("bin-zsh"), ShellKind::Zsh),
            (sh.clone(), ShellKind::Other),
        ])
        .unwrap();

        let shell = resolver.resolve_default();
        assert_eq!(shell.binary(), sh.as_path());
        assert_eq!(shell.kind(), ShellKind::Other);
    }

    #[test]
    fn test_resolve_default_returns_last_candidate_even_if_missing() {
        let dir = TempDir::new().unwrap();
        let last = dir.path().join("no-sh-here");
        let resolver = ShellResolver::with_candidates([
            (dir.path().join("no-zsh-here"), ShellKind::Zsh),
            (last.clone(), ShellKind::Other),
        ])
        .unwrap();

        let shell = resolver.resolve_default();
        assert_eq!(shell.binary(), last.as_path());
        // Verification is what catches it.
        assert!(matches!(
            verify_shell(&shell),
            Err(ShellError::Inaccessible { .. })
        ));
    }

    #[test]
    fn test_standard_table_order() {
        let resolver = ShellResolver::new();
        let paths: Vec<_> = resolver
            .candidates
            .iter()
            .map(|(path, kind)| (path.to_string_lossy().into_owned(), *kind))
            .collect();
        assert_eq!(
            paths,
            vec![
                ("/usr/bin/zsh".to_string(), ShellKind::Zsh),
                ("/bin/zsh".to_string(), ShellKind::Zsh),
                ("/bin/sh".to_string(), ShellKind::Other),
            ]
        );
    }

    #[test]
    fn test_with_candidates_rejects_empty_table() {
        let result = ShellResolver::with_candidates(Vec::new());
        assert!(matches!(result, Err(ShellError::NoCandidates)));
    }

    #[test]
    fn test_resolve_alternate_builds_module_invocation() {
        let resolver = ShellResolver::new();
        let shell = resolver
            .resolve_alternate(Path::new("/opt/python/bin/python3"))
            .unwrap();
        assert_eq!(shell.kind(), ShellKind::Xonsh);
        assert_eq!(shell.binary(), Path::new("/opt/python/bin/python3"));
        assert_eq!(shell.args(), ["-m", "xonsh"]);
    }

    #[test]
    fn test_resolve_alternate_rejects_empty_interpreter() {
        let resolver = ShellResolver::new();
        let result = resolver.resolve_alternate(Path::new(""));
        assert!(matches!(result, Err(ShellError::EmptyInterpreter)));
    }

    #[test]
    fn test_resolve_primary_defaults_python_bin() {
        let resolver = ShellResolver::new();
        let config = RunConfig {
            prefer_xonsh: true,
            ..Default::default()
        };
        let shell = resolver.resolve_primary(&config).unwrap();
        assert_eq!(shell.command_line(), "/usr/bin/python3 -m xonsh");
    }

    #[test]
    fn test_resolve_primary_without_xonsh_uses_default_shell() {
        let resolver = ShellResolver::new();
        let shell = resolver.resolve_primary(&RunConfig::default()).unwrap();
        assert_ne!(shell.kind(), ShellKind::Xonsh);
        assert!(shell.args().is_empty());
    }

    #[test]
    fn test_verify_accepts_executable_of_any_kind() {
        let dir = TempDir::new().unwrap();
        let bin = write_file(&dir, "shell", 0o755);
        for kind in [ShellKind::Xonsh, ShellKind::Zsh, ShellKind::Other] {
            let shell = ShellDescriptor::new(&bin, Vec::<String>::new(), kind).unwrap();
            assert!(verify_shell(&shell).is_ok());
        }
    }

    #[test]
    fn test_verify_rejects_inaccessible_binary_of_any_kind() {
        let dir = TempDir::new().unwrap();
        let not_executable = write_file(&dir, "plain", 0o644);
        let missing = dir.path().join("missing");
        for path in [not_executable, missing] {
            for kind in [ShellKind::Xonsh, ShellKind::Zsh, ShellKind::Other] {
                let shell = ShellDescriptor::new(&path, Vec::<String>::new(), kind).unwrap();
                let err = verify_shell(&shell).unwrap_err();
                assert_eq!(
                    err.to_string(),
                    format!("Unable to access {} - Does it exist?", path.display())
                );
            }
        }
    }
}
