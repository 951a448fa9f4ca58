// src/models.rs

use crate::{constants::MAX_SHELL_ARGS, system::shell::ShellError};
use serde::Deserialize;
use std::{
    ffi::OsString,
    fmt,
    path::{Path, PathBuf},
};

// --- RUNTIME MODELS ---

/// The family a resolved shell belongs to.
///
/// Only `Xonsh` is ever supervised; the other kinds are launched directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellKind {
    /// The alternate shell, run through a python interpreter.
    Xonsh,
    /// The default shell, found at one of the well-known zsh locations.
    Zsh,
    /// The generic last-resort shell (`/bin/sh`, probably bash or dash).
    Other,
}

impl fmt::Display for ShellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Xonsh => "xonsh",
            Self::Zsh => "zsh",
            Self::Other => "sh",
        };
        f.write_str(name)
    }
}

/// One shell ready to be verified and executed.
///
/// The argument list excludes argv[0]: it is always the binary path and is
/// only materialized by [`ShellDescriptor::argv`] when the shell is launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellDescriptor {
    binary: PathBuf,
    args: Vec<OsString>,
    kind: ShellKind,
}

impl ShellDescriptor {
    /// Builds a descriptor, rejecting an empty binary path or an argument list
    /// that would not fit in [`MAX_SHELL_ARGS`] exec slots.
    pub fn new<I, S>(
        binary: impl Into<PathBuf>,
        args: I,
        kind: ShellKind,
    ) -> Result<Self, ShellError>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let binary = binary.into();
        if binary.as_os_str().is_empty() {
            return Err(ShellError::EmptyBinary);
        }
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();

        let descriptor = Self { binary, args, kind };
        if !descriptor.fits_exec_slots() {
            return Err(ShellError::TooManyArguments {
                path: descriptor.binary.display().to_string(),
                count: descriptor.args.len() + 1,
                max: MAX_SHELL_ARGS - 1,
            });
        }
        Ok(descriptor)
    }

    /// A descriptor with no arguments beyond argv[0], which always fits.
    /// The caller guarantees `binary` is non-empty.
    pub(crate) fn bare(binary: PathBuf, kind: ShellKind) -> Self {
        Self {
            binary,
            args: Vec::new(),
            kind,
        }
    }

    /// Path of the executable.
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Arguments passed after argv[0].
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// The shell family.
    pub fn kind(&self) -> ShellKind {
        self.kind
    }

    /// True when argv[0], the arguments and the terminating sentinel fit the
    /// fixed exec argument array.
    pub fn fits_exec_slots(&self) -> bool {
        self.args.len() + 2 <= MAX_SHELL_ARGS
    }

    /// The finalized argument vector, with argv[0] set to the binary path.
    pub fn argv(&self) -> Vec<OsString> {
        let mut argv = Vec::with_capacity(self.args.len() + 1);
        argv.push(self.binary.clone().into_os_string());
        argv.extend(self.args.iter().cloned());
        argv
    }

    /// The argument vector rendered as a shell-quoted command line, for logs.
    pub fn command_line(&self) -> String {
        let parts: Vec<String> = self
            .argv()
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        shlex::try_join(parts.iter().map(String::as_str)).unwrap_or_else(|_| format!("{:?}", parts))
    }
}

/// The validated settings the launcher core runs with.
///
/// Produced once from the command line and the optional config file, then
/// treated as read-only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunConfig {
    /// Run xonsh instead of the default shell.
    pub prefer_xonsh: bool,
    /// Log interruption and fork events.
    pub verbose: bool,
    /// Fall back to zsh once xonsh exits.
    pub fallback_to_zsh: bool,
    /// Interpreter override for xonsh. `None` means the built-in default.
    pub python_bin: Option<PathBuf>,
}

// --- CONFIG FILE MODELS ---

/// The on-disk shape of `config.toml`. Every key is optional.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub prefer_xonsh: Option<bool>,
    pub fallback_to_zsh: Option<bool>,
    pub verbose: Option<bool>,
    /// May contain `~` or environment variables.
    pub python_bin: Option<String>,
}
