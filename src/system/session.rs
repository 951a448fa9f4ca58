// src/system/session.rs

use crate::{
    models::{RunConfig, ShellDescriptor, ShellKind},
    system::{
        launcher::{self, LaunchError},
        shell::{ShellError, ShellResolver, verify_shell},
        supervisor::{FallbackSupervisor, ProcessControl, SupervisorError},
    },
};
use std::{convert::Infallible, io};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Shell(#[from] ShellError),
    #[error(transparent)]
    Launch(#[from] LaunchError),
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
}

/// What the process is going to do, decided before anything is spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchPlan {
    /// Replace this process with the shell. No child is created.
    Direct(ShellDescriptor),
    /// Run `primary` in a child, then replace this process with `fallback`.
    Supervised {
        primary: ShellDescriptor,
        fallback: ShellDescriptor,
    },
}

/// Resolves and verifies every shell the run will need.
///
/// Supervision only applies when a fallback was requested and the primary
/// is xonsh; a fallback from zsh to zsh would be pointless.
pub fn plan_launch(config: &RunConfig, resolver: &ShellResolver) -> Result<LaunchPlan, ShellError> {
    let primary = resolver.resolve_primary(config)?;
    verify_shell(&primary)?;
    log::debug!("Primary shell ({}): {}", primary.kind(), primary.command_line());

    if config.fallback_to_zsh && primary.kind() == ShellKind::Xonsh {
        let fallback = resolver.resolve_default();
        verify_shell(&fallback)?;
        log::debug!("Fallback shell ({}): {}", fallback.kind(), fallback.command_line());
        Ok(LaunchPlan::Supervised { primary, fallback })
    } else {
        if config.fallback_to_zsh {
            log::debug!("Fallback requested, but the primary shell is not xonsh; ignoring it");
        }
        Ok(LaunchPlan::Direct(primary))
    }
}

/// Carries out a plan. Only returns on failure; on success this process has
/// become a shell.
pub fn execute_plan<P: ProcessControl>(
    plan: &LaunchPlan,
    processes: P,
) -> Result<Infallible, SessionError> {
    match plan {
        LaunchPlan::Direct(shell) => Ok(launcher::launch(shell)?),
        LaunchPlan::Supervised { primary, fallback } => {
            log::info!(t!("supervisor.info.forking"));
            let mut supervisor = FallbackSupervisor::new(processes);
            supervisor.run_primary(primary)?;
            Ok(supervisor.launch_fallback(fallback, &mut io::stderr())?)
        }
    }
}

/// Plans and executes a full run from a validated configuration.
pub fn run_session<P: ProcessControl>(
    config: &RunConfig,
    resolver: &ShellResolver,
    processes: P,
) -> Result<Infallible, SessionError> {
    let plan = plan_launch(config, resolver)?;
    execute_plan(&plan, processes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::supervisor::{ChildStatus, SpawnError};
    use nix::{errno::Errno, unistd::Pid};
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    #[derive(Debug, Default)]
    struct CountingProcesses {
        spawns: usize,
        waits: usize,
    }

    impl ProcessControl for CountingProcesses {
        fn spawn(&mut self, _shell: &ShellDescriptor) -> Result<Pid, SpawnError> {
            self.spawns += 1;
            Ok(Pid::from_raw(77))
        }

        fn wait(&mut self, child: Pid) -> Result<(Pid, ChildStatus), Errno> {
            self.waits += 1;
            Ok((child, ChildStatus::Exited(3)))
        }
    }

    fn executable(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn resolver_with_zsh(zsh: &Path) -> ShellResolver {
        ShellResolver::with_candidates([
            (zsh.to_path_buf(), ShellKind::Zsh),
            (PathBuf::from("/bin/sh"), ShellKind::Other),
        ])
        .unwrap()
    }

    #[test]
    fn test_no_flags_plans_direct_default_shell() {
        let dir = TempDir::new().unwrap();
        let zsh = executable(&dir, "zsh");
        let plan = plan_launch(&RunConfig::default(), &resolver_with_zsh(&zsh)).unwrap();
        match plan {
            LaunchPlan::Direct(shell) => {
                assert_eq!(shell.binary(), zsh.as_path());
                assert_eq!(shell.kind(), ShellKind::Zsh);
            }
            other => panic!("unexpected plan: {other:?}"),
        }
    }

    #[test]
    fn test_fallback_without_xonsh_stays_direct() {
        let dir = TempDir::new().unwrap();
        let zsh = executable(&dir, "zsh");
        let config = RunConfig {
            fallback_to_zsh: true,
            ..Default::default()
        };
        let plan = plan_launch(&config, &resolver_with_zsh(&zsh)).unwrap();
        assert!(matches!(plan, LaunchPlan::Direct(_)));
    }

    #[test]
    fn test_xonsh_without_fallback_stays_direct() {
        let dir = TempDir::new().unwrap();
        let python = executable(&dir, "python3");
        let zsh = executable(&dir, "zsh");
        let config = RunConfig {
            prefer_xonsh: true,
            python_bin: Some(python.clone()),
            ..Default::default()
        };
        let plan = plan_launch(&config, &resolver_with_zsh(&zsh)).unwrap();
        match plan {
            LaunchPlan::Direct(shell) => {
                assert_eq!(shell.kind(), ShellKind::Xonsh);
                assert_eq!(shell.binary(), python.as_path());
            }
            other => panic!("unexpected plan: {other:?}"),
        }
    }

    #[test]
    fn test_xonsh_with_fallback_is_supervised() {
        let dir = TempDir::new().unwrap();
        let python = executable(&dir, "python3");
        let zsh = executable(&dir, "zsh");
        let config = RunConfig {
            prefer_xonsh: true,
            fallback_to_zsh: true,
            python_bin: Some(python),
            ..Default::default()
        };
        let plan = plan_launch(&config, &resolver_with_zsh(&zsh)).unwrap();
        match plan {
            LaunchPlan::Supervised { primary, fallback } => {
                assert_eq!(primary.kind(), ShellKind::Xonsh);
                assert_eq!(fallback.binary(), zsh.as_path());
            }
            other => panic!("unexpected plan: {other:?}"),
        }
    }

    #[test]
    fn test_missing_interpreter_fails_verification() {
        let dir = TempDir::new().unwrap();
        let zsh = executable(&dir, "zsh");
        let config = RunConfig {
            prefer_xonsh: true,
            fallback_to_zsh: true,
            python_bin: Some(dir.path().join("no-python")),
            ..Default::default()
        };
        let err = plan_launch(&config, &resolver_with_zsh(&zsh)).unwrap_err();
        assert!(err.to_string().contains("no-python"));
    }

    #[test]
    fn test_direct_plan_never_spawns() {
        let shell = ShellDescriptor::new(
            "/nonexistent/run-shell-test/zsh",
            Vec::<String>::new(),
            ShellKind::Zsh,
        )
        .unwrap();
        let mut processes = CountingProcesses::default();

        let err = execute_plan(&LaunchPlan::Direct(shell), &mut processes).unwrap_err();
        assert!(matches!(err, SessionError::Launch(LaunchError::Exec { .. })));
        assert_eq!(processes.spawns, 0);
        assert_eq!(processes.waits, 0);
    }

    #[test]
    fn test_supervised_plan_spawns_once_then_falls_back() {
        let primary =
            ShellDescriptor::new("/usr/bin/python3", ["-m", "xonsh"], ShellKind::Xonsh).unwrap();
        let fallback = ShellDescriptor::new(
            "/nonexistent/run-shell-test/zsh",
            Vec::<String>::new(),
            ShellKind::Zsh,
        )
        .unwrap();
        let mut processes = CountingProcesses::default();

        let err = execute_plan(&LaunchPlan::Supervised { primary, fallback }, &mut processes)
            .unwrap_err();
        // The fallback exec was attempted, and only after the child finished.
        assert!(matches!(
            err,
            SessionError::Supervisor(SupervisorError::Launch(LaunchError::Exec { .. }))
        ));
        assert_eq!(processes.spawns, 1);
        assert_eq!(processes.waits, 1);
    }
}
