use std::io;

use crate::stream::StdStream;

/// Error from a failed [`launch`](crate::launch()).
///
/// `Config`, `EmptyArgv`, and `AlreadyLaunched` are detected before any
/// OS resource is touched; `Resource` covers pipe creation and file
/// opens; `Launch` covers process creation itself. Whatever the
/// variant, every descriptor the failing call opened has been closed
/// again by the time the error is returned.
#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    /// The plan is malformed for the named stream.
    #[error("invalid {stream} configuration: {reason}")]
    Config { stream: StdStream, reason: String },

    /// The argument vector has no program to run.
    #[error("empty argument vector")]
    EmptyArgv,

    /// The plan already holds a running process; release it first.
    #[error("plan already holds a running process")]
    AlreadyLaunched,

    /// Creating a pipe or opening a file for the named stream failed.
    #[error("failed to prepare {stream}: {source}")]
    Resource {
        stream: StdStream,
        source: io::Error,
    },

    /// The OS could not create the process.
    #[error("failed to spawn {program}: {source}")]
    Launch { program: String, source: io::Error },
}

pub type Result<T> = std::result::Result<T, SpawnError>;
