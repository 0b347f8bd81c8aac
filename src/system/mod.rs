//! # System Interaction Layer
//!
//! The boundary between laoban's core logic and the operating system.
//!
//! ## Modules
//!
//! - **`executor`**: The raw executors. One spawns a command line through the platform
//!   shell (`sh -c` or `cmd /C`) in a given directory with an optional environment and
//!   captures its output. The other evaluates `js:` expressions in-process.
//! - **`decorators`**: Wraps a raw executor with timing, dry-run, `--variables` output
//!   and the per-project status, profile and log files, then routes each command to
//!   the shell or expression chain.

pub mod decorators;
pub mod executor;
