// src/system/supervisor.rs

//! Runs the preferred shell in a child process and falls back to a second
//! shell in this process once the child is gone.
//!
//! A single process cannot both be replaced by `exec` and run code of its own
//! afterwards, so the primary shell gets its own child. The child's image is
//! replaced by the shell right away; all the parent can do is wait for it.

use crate::{
    constants::EXEC_FAILURE_STATUS,
    models::ShellDescriptor,
    system::launcher::{self, LaunchError},
};
use nix::{errno::Errno, unistd::Pid};
use rustix::process::{self as rprocess, WaitOptions};
use std::{
    convert::Infallible,
    io::{self, Write},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Failed to fork a process for '{path}'")]
    Fork {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed to wait for subprocess {pid}")]
    Wait {
        pid: Pid,
        #[source]
        source: Errno,
    },
    #[error("Unexpected result from waitpid while waiting for {expected}: {status}")]
    UnexpectedResult { expected: Pid, status: String },
    #[error("Supervisor is in state {0:?}, which does not allow this step.")]
    InvalidState(SupervisorState),
    #[error(transparent)]
    Launch(#[from] LaunchError),
}

impl SupervisorError {
    /// True for failures that mean we lost track of our own child, as opposed
    /// to the operating system refusing a request.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Wait { .. } | Self::UnexpectedResult { .. } | Self::InvalidState(_)
        )
    }
}

/// Why no running child came out of [`ProcessControl::spawn`].
#[derive(Error, Debug)]
pub enum SpawnError {
    /// The system refused to create another process.
    #[error("could not create a child process")]
    Fork(#[source] io::Error),
    /// A child was created but could not exec the shell. It is already gone.
    #[error("the child process could not execute the shell")]
    Exec(#[source] io::Error),
}

impl SpawnError {
    /// Sorts an error from `Command::spawn`, which reports a failed exec in
    /// the child the same way as a failed fork. Only resource exhaustion
    /// means the fork itself failed.
    pub fn from_spawn(err: io::Error) -> Self {
        match err.raw_os_error().map(Errno::from_raw) {
            Some(Errno::EAGAIN | Errno::ENOMEM) => Self::Fork(err),
            _ => Self::Exec(err),
        }
    }
}

/// A state change of a child, as reported by `waitpid`. Signals are raw
/// numbers so realtime signals are represented too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildStatus {
    Exited(i32),
    Signaled(i32),
    Stopped(i32),
    Continued,
    /// `WNOHANG` style answer: nothing has happened yet.
    StillAlive,
    /// A raw status none of the above describes.
    Unknown(i32),
}

impl From<rprocess::WaitStatus> for ChildStatus {
    fn from(status: rprocess::WaitStatus) -> Self {
        if let Some(code) = status.exit_status() {
            Self::Exited(code)
        } else if let Some(signal) = status.terminating_signal() {
            Self::Signaled(signal)
        } else if let Some(signal) = status.stopping_signal() {
            Self::Stopped(signal)
        } else if status.continued() {
            Self::Continued
        } else {
            Self::Unknown(status.as_raw())
        }
    }
}

/// The two process primitives the supervisor needs.
pub trait ProcessControl {
    /// Starts `shell` in a new child process and returns its pid. The child's
    /// image is replaced by the shell; stdio and environment are inherited.
    fn spawn(&mut self, shell: &ShellDescriptor) -> Result<Pid, SpawnError>;

    /// Blocks until the state of `child` changes. Returns the pid the status
    /// belongs to.
    fn wait(&mut self, child: Pid) -> Result<(Pid, ChildStatus), Errno>;
}

impl<T: ProcessControl + ?Sized> ProcessControl for &mut T {
    fn spawn(&mut self, shell: &ShellDescriptor) -> Result<Pid, SpawnError> {
        (**self).spawn(shell)
    }

    fn wait(&mut self, child: Pid) -> Result<(Pid, ChildStatus), Errno> {
        (**self).wait(child)
    }
}

/// Real processes: `fork`+`exec` through `std::process::Command`, and a
/// blocking `waitpid` on the child.
#[derive(Debug, Default)]
pub struct SystemProcesses;

impl ProcessControl for SystemProcesses {
    fn spawn(&mut self, shell: &ShellDescriptor) -> Result<Pid, SpawnError> {
        let child = launcher::build_command(shell)
            .spawn()
            .map_err(SpawnError::from_spawn)?;
        // The `Child` handle is dropped without waiting; the child is reaped
        // by `wait` below.
        let raw = i32::try_from(child.id()).map_err(|e| SpawnError::Fork(io::Error::other(e)))?;
        Ok(Pid::from_raw(raw))
    }

    fn wait(&mut self, child: Pid) -> Result<(Pid, ChildStatus), Errno> {
        let target = rprocess::Pid::from_raw(child.as_raw()).ok_or(Errno::ECHILD)?;
        match rprocess::waitpid(Some(target), WaitOptions::empty()) {
            Ok(Some((pid, status))) => Ok((Pid::from_raw(pid.as_raw_pid()), status.into())),
            Ok(None) => Ok((child, ChildStatus::StillAlive)),
            Err(e) => Err(Errno::from_raw(e.raw_os_error())),
        }
    }
}

/// How the supervised shell ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildOutcome {
    /// Exited normally with this code.
    Exited(i32),
    /// Terminated by this signal number.
    Signaled(i32),
}

/// `NotForked → ChildRunning → ChildDone → FallbackLaunched`. A child that
/// could not exec its shell goes from `NotForked` straight to `ChildDone`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    NotForked,
    ChildRunning(Pid),
    ChildDone(ChildOutcome),
    FallbackLaunched,
}

/// Drives one primary shell and at most one fallback.
#[derive(Debug)]
pub struct FallbackSupervisor<P> {
    processes: P,
    state: SupervisorState,
}

impl<P: ProcessControl> FallbackSupervisor<P> {
    pub fn new(processes: P) -> Self {
        Self {
            processes,
            state: SupervisorState::NotForked,
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// Starts the primary shell in a child process and returns the new state.
    ///
    /// A child that cannot exec its shell reports the failure on stderr and
    /// counts as having exited with [`EXEC_FAILURE_STATUS`].
    pub fn start(&mut self, primary: &ShellDescriptor) -> Result<SupervisorState, SupervisorError> {
        if self.state != SupervisorState::NotForked {
            return Err(SupervisorError::InvalidState(self.state));
        }

        // The child inherits our stderr; don't let it see our half-written lines.
        let _ = io::stderr().flush();

        self.state = match self.processes.spawn(primary) {
            Ok(pid) => {
                log::debug!("Primary shell running as pid {}", pid);
                SupervisorState::ChildRunning(pid)
            }
            Err(SpawnError::Exec(source)) => {
                let cause = source.to_string();
                let err = LaunchError::Exec {
                    path: primary.binary().display().to_string(),
                    source,
                };
                eprintln!("{}: {}", err, cause);
                SupervisorState::ChildDone(ChildOutcome::Exited(EXEC_FAILURE_STATUS))
            }
            Err(SpawnError::Fork(source)) => {
                return Err(SupervisorError::Fork {
                    path: primary.binary().display().to_string(),
                    source,
                });
            }
        };
        Ok(self.state)
    }

    /// Waits until the child exits or is killed.
    ///
    /// `EINTR` is retried. Stop and continue notifications are not terminal
    /// and are waited through. Anything else is fatal: there is no sane way to
    /// keep supervising a child we can no longer wait on.
    pub fn wait_for_child(&mut self) -> Result<ChildOutcome, SupervisorError> {
        let SupervisorState::ChildRunning(child) = self.state else {
            return Err(SupervisorError::InvalidState(self.state));
        };

        let outcome = loop {
            let (pid, status) = match self.processes.wait(child) {
                Ok(result) => result,
                Err(Errno::EINTR) => {
                    log::debug!(t!("supervisor.info.interrupted"));
                    continue;
                }
                Err(source) => return Err(SupervisorError::Wait { pid: child, source }),
            };

            match status {
                _ if pid != child => {
                    return Err(SupervisorError::UnexpectedResult {
                        expected: child,
                        status: format!("{:?} for pid {}", status, pid),
                    });
                }
                ChildStatus::Exited(code) => break ChildOutcome::Exited(code),
                ChildStatus::Signaled(signal) => break ChildOutcome::Signaled(signal),
                ChildStatus::Stopped(_) | ChildStatus::Continued => {
                    log::debug!("Ignoring non-terminal status {:?}", status);
                }
                ChildStatus::StillAlive | ChildStatus::Unknown(_) => {
                    return Err(SupervisorError::UnexpectedResult {
                        expected: child,
                        status: format!("{:?}", status),
                    });
                }
            }
        };

        self.state = SupervisorState::ChildDone(outcome);
        Ok(outcome)
    }

    /// Starts the primary shell and waits for it to finish.
    pub fn run_primary(&mut self, primary: &ShellDescriptor) -> Result<ChildOutcome, SupervisorError> {
        match self.start(primary)? {
            SupervisorState::ChildDone(outcome) => Ok(outcome),
            _ => self.wait_for_child(),
        }
    }

    /// Writes the outcome summary to `diagnostics`, then replaces this process
    /// with `fallback`. Only returns if the exec fails.
    pub fn launch_fallback(
        &mut self,
        fallback: &ShellDescriptor,
        diagnostics: &mut impl Write,
    ) -> Result<Infallible, SupervisorError> {
        let SupervisorState::ChildDone(outcome) = self.state else {
            return Err(SupervisorError::InvalidState(self.state));
        };

        // A broken stderr must not keep the user from getting a shell.
        let _ = writeln!(diagnostics, "{}", fallback_summary(&outcome, fallback));
        let _ = diagnostics.flush();

        self.state = SupervisorState::FallbackLaunched;
        Ok(launcher::launch(fallback)?)
    }
}

/// The human-readable report printed before the fallback shell takes over.
pub fn fallback_summary(outcome: &ChildOutcome, fallback: &ShellDescriptor) -> String {
    let header = format!(
        t!("supervisor.info.falling_back"),
        shell = fallback.binary().display()
    );
    let detail = match outcome {
        ChildOutcome::Exited(0) => t!("supervisor.outcome.success").to_string(),
        ChildOutcome::Exited(code) => format!(t!("supervisor.outcome.failed"), code = code),
        ChildOutcome::Signaled(signal) => format!(t!("supervisor.outcome.killed"), signal = signal),
    };
    format!("{}\n{}\n", header, detail)
}
