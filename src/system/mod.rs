//! # System Interaction Layer
//!
//! Everything that touches processes and the filesystem on behalf of the
//! launcher.
//!
//! ## Modules
//!
//! - **`shell`**: Finds shells on disk (xonsh through a python interpreter,
//!   zsh at its well-known locations, `/bin/sh` as a last resort) and verifies
//!   they can be executed.
//! - **`launcher`**: Replaces the current process with a shell (`exec`).
//! - **`supervisor`**: Runs xonsh in a child process, waits for it, and hands
//!   the terminal to the fallback shell afterwards.
//! - **`session`**: Turns a `RunConfig` into a launch plan and carries it out.

pub mod launcher;
pub mod session;
pub mod shell;
pub mod supervisor;
