// src/system/launcher.rs

use crate::{constants::MAX_SHELL_ARGS, models::ShellDescriptor, system::shell::ShellError};
use std::{
    convert::Infallible,
    io::{self, Write},
    os::unix::process::CommandExt,
    process::Command,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Unexpected error executing shell '{path}'")]
    Exec {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Shell(#[from] ShellError),
}

/// Builds the `Command` for a shell: argv[0] is the binary path, the
/// environment is inherited untouched.
pub fn build_command(shell: &ShellDescriptor) -> Command {
    let mut command = Command::new(shell.binary());
    command.arg0(shell.binary()).args(shell.args());
    command
}

/// Replaces the current process image with `shell`.
///
/// On success this never returns, which is why the `Ok` side is
/// uninhabited. The only way back to the caller is a failed exec, whose
/// error decides the exit status.
pub fn launch(shell: &ShellDescriptor) -> Result<Infallible, LaunchError> {
    if !shell.fits_exec_slots() {
        return Err(ShellError::TooManyArguments {
            path: shell.binary().display().to_string(),
            count: shell.args().len() + 1,
            max: MAX_SHELL_ARGS - 1,
        }
        .into());
    }

    log::info!(t!("shell.info.launching"), shell = shell.command_line());

    // Anything still buffered would be lost with the old image.
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();

    let source = build_command(shell).exec();
    Err(LaunchError::Exec {
        path: shell.binary().display().to_string(),
        source,
    })
}
