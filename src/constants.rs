// src/constants.rs

/// Number of slots in a shell's exec argument array, including the
/// terminating sentinel. At most `MAX_SHELL_ARGS - 1` real arguments
/// (argv[0] included) fit.
pub const MAX_SHELL_ARGS: usize = 8;

/// Interpreter used to run xonsh when `--python-bin` is not given.
pub const DEFAULT_PYTHON_BIN: &str = "/usr/bin/python3";

/// Module run by the interpreter (`python -m xonsh`).
pub const XONSH_MODULE: &str = "xonsh";

/// Preferred default shells, most specific first.
pub const ZSH_CANDIDATES: &[&str] = &["/usr/bin/zsh", "/bin/zsh"];

/// Last-resort shell. Assumed to exist on any POSIX system.
pub const GENERIC_SHELL: &str = "/bin/sh";

/// Status reported for a supervised child that could not exec its shell.
pub const EXEC_FAILURE_STATUS: i32 = 1;

/// Name of the directory holding run-shell configuration (inside the system config dir).
pub const CONFIG_DIR_NAME: &str = "run-shell";

/// Name of the optional configuration file.
pub const CONFIG_FILENAME: &str = "config.toml";
