use std::fmt;
use std::os::unix::io::RawFd;
use std::path::PathBuf;

/// One of the three standard streams of a child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdStream {
    Stdin,
    Stdout,
    Stderr,
}

impl StdStream {
    /// The descriptor number this stream occupies in the child.
    pub fn target_fd(self) -> RawFd {
        match self {
            Self::Stdin => libc::STDIN_FILENO,
            Self::Stdout => libc::STDOUT_FILENO,
            Self::Stderr => libc::STDERR_FILENO,
        }
    }
}

impl fmt::Display for StdStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdin => write!(f, "stdin"),
            Self::Stdout => write!(f, "stdout"),
            Self::Stderr => write!(f, "stderr"),
        }
    }
}

/// How one standard stream of the child is wired.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StreamPolicy {
    /// Share the parent's descriptor for this stream. Nothing is done.
    #[default]
    Inherit,

    /// Connect the stream to the null device. Writes are dropped and
    /// reads see immediate end-of-stream.
    Discard,

    /// Create a fresh pipe. The child end is wired to the stream; the
    /// parent end is stored on the plan after a successful launch
    /// (write end for stdin, read end for stdout and stderr).
    Pipe,

    /// Duplicate a caller-supplied descriptor onto the stream in the
    /// child. The caller keeps ownership of its own copy; the child's
    /// inherited copy is closed after duplication unless it already is
    /// the target slot. Must be non-negative.
    Fd(RawFd),

    /// Back the stream with the named file, opened fresh: read-only
    /// for stdin, create-or-truncate write-only for stdout and stderr.
    Path(PathBuf),

    /// Merge the stream into whatever stdout resolved to. Only valid
    /// for stderr: a no-op when stdout is inherited, discarded when
    /// stdout is discarded, otherwise duplicated onto stdout's
    /// destination.
    MergeWithStdout,
}
