//! Subprocess launching with per-stream control over stdin, stdout, and
//! stderr.
//!
//! A [`RedirectionPlan`] names a [`StreamPolicy`] for each standard
//! stream: inherit, discard, a fresh pipe, a caller-supplied
//! descriptor, a file path, or (stderr only) a merge into stdout.
//! [`launch`] compiles the plan into an ordered descriptor action list,
//! replays it in the child between `fork` and `exec`, and stores the
//! child's pid and the parent-side pipe ends back on the plan. The
//! launcher never waits on the child and never closes a descriptor the
//! caller supplied; each pipe end has exactly one owner at all times.
//!
//! ```no_run
//! use subproc::{Env, RedirectionPlan, StreamPolicy, launch};
//!
//! # fn main() -> subproc::Result<()> {
//! let mut plan = RedirectionPlan::new(
//!     StreamPolicy::Inherit,
//!     StreamPolicy::Pipe,
//!     StreamPolicy::MergeWithStdout,
//! );
//! launch(&mut plan, &["ls", "/bin"], &Env::Inherit)?;
//! let _output = plan.take_stdout_pipe();
//! // read `_output` to end-of-stream, wait on plan.pid(), then release.
//! # plan.release();
//! # Ok(())
//! # }
//! ```

mod actions;
mod error;
mod launch;
mod plan;
mod stream;

pub use error::{Result, SpawnError};
pub use launch::{Env, launch};
pub use plan::RedirectionPlan;
pub use stream::{StdStream, StreamPolicy};
