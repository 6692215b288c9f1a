//! The launcher: compiles a [`RedirectionPlan`] into a child-side
//! descriptor action list and spawns the program.
//!
//! Launch phases, in order:
//! 1. Guard the call (non-empty argv, plan not already running).
//! 2. Validate all three policies before any OS resource is touched.
//! 3. Prepare each stream: create pipes, open files, and compile the
//!    per-stream actions. Stdout is prepared strictly before stderr so
//!    the merge policy can inspect what stdout actually resolved to.
//! 4. Spawn, replaying the concatenated action list in the child
//!    between `fork` and `exec`.
//! 5. Commit the pid and the parent-side pipe ends onto the plan.
//!
//! Every descriptor created here is owned by a `PreparedStream` until
//! the commit, so any early return closes it again; nothing survives a
//! failed launch except descriptors the caller owned going in.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::Command;

use nix::fcntl::OFlag;
use nix::unistd::{Pid, pipe2};
use tracing::{debug, trace};

use crate::actions::FdAction;
use crate::error::{Result, SpawnError};
use crate::plan::RedirectionPlan;
use crate::stream::{StdStream, StreamPolicy};

/// Environment for the child process.
#[derive(Debug, Clone, Default)]
pub enum Env {
    /// Child sees the parent's environment unchanged.
    #[default]
    Inherit,
    /// Child's environment is exactly these variables, in order,
    /// replacing the parent's environment entirely.
    Replace(Vec<(String, String)>),
}

/// What a stream policy resolved to, as far as stderr's merge branch
/// needs to know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    /// Stream untouched; the child keeps the parent's descriptor.
    Inherited,
    /// Stream wired to the null device.
    Discarded,
    /// Stream wired to a pipe, file, or caller descriptor.
    Wired,
}

/// Per-stream output of [`prepare`]: the child-side actions plus the
/// descriptors each party ends up owning.
struct PreparedStream {
    disposition: Disposition,
    /// Actions the child runs between fork and exec, in order.
    actions: Vec<FdAction>,
    /// Descriptors that exist only to be duplicated into the child.
    /// Held open in the parent until the spawn completes, then dropped.
    #[allow(dead_code)]
    transfer: Vec<OwnedFd>,
    /// The parent-side pipe end handed back through the plan, if any.
    parent_end: Option<OwnedFd>,
}

impl PreparedStream {
    fn untouched(disposition: Disposition) -> Self {
        Self {
            disposition,
            actions: Vec::new(),
            transfer: Vec::new(),
            parent_end: None,
        }
    }
}

/// Reject malformed policies. Pure: runs for all three streams before
/// any pipe is created or file opened.
fn validate(stream: StdStream, policy: &StreamPolicy) -> Result<()> {
    match policy {
        StreamPolicy::Fd(fd) if *fd < 0 => Err(SpawnError::Config {
            stream,
            reason: format!("negative descriptor {fd}"),
        }),
        StreamPolicy::Path(path) if path.as_os_str().is_empty() => Err(SpawnError::Config {
            stream,
            reason: "empty path".into(),
        }),
        StreamPolicy::MergeWithStdout if stream != StdStream::Stderr => Err(SpawnError::Config {
            stream,
            reason: "merge with stdout is only valid for stderr".into(),
        }),
        _ => Ok(()),
    }
}

/// Open the null device for the given stream direction.
fn open_null(stream: StdStream) -> Result<OwnedFd> {
    let result = match stream {
        StdStream::Stdin => File::open("/dev/null"),
        StdStream::Stdout | StdStream::Stderr => OpenOptions::new().write(true).open("/dev/null"),
    };
    result
        .map(OwnedFd::from)
        .map_err(|source| SpawnError::Resource { stream, source })
}

/// Open a caller-named file for the given stream direction: read-only
/// for stdin, create-or-truncate for the output streams. Missing parent
/// directories are not created.
fn open_path(stream: StdStream, path: &Path) -> Result<OwnedFd> {
    let result = match stream {
        StdStream::Stdin => File::open(path),
        StdStream::Stdout | StdStream::Stderr => OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o644)
            .open(path),
    };
    result
        .map(OwnedFd::from)
        .map_err(|source| SpawnError::Resource { stream, source })
}

/// Actions wiring `src` to the stream's target slot: duplicate, then
/// close the child's leftover copy. Closes are skipped whenever the
/// descriptor already equals the target, so the list never closes a
/// slot it is about to occupy.
fn wire(src: RawFd, target: RawFd) -> Vec<FdAction> {
    let mut actions = vec![FdAction::Dup2 { src, dst: target }];
    if src != target {
        actions.push(FdAction::Close(src));
    }
    actions
}

/// Resolve one stream policy into its prepared form.
///
/// `stdout_disposition` is `Some` only for stderr, carrying what stdout
/// already resolved to; the merge branch decides from that resolution,
/// never from stdout's raw policy.
fn prepare(
    stream: StdStream,
    policy: &StreamPolicy,
    stdout_disposition: Option<Disposition>,
) -> Result<PreparedStream> {
    let target = stream.target_fd();
    match policy {
        StreamPolicy::Inherit => Ok(PreparedStream::untouched(Disposition::Inherited)),

        StreamPolicy::Discard => {
            let null = open_null(stream)?;
            let actions = wire(null.as_raw_fd(), target);
            Ok(PreparedStream {
                disposition: Disposition::Discarded,
                actions,
                transfer: vec![null],
                parent_end: None,
            })
        }

        StreamPolicy::Pipe => {
            let (read, write) = pipe2(OFlag::O_CLOEXEC).map_err(|e| SpawnError::Resource {
                stream,
                source: io::Error::from(e),
            })?;
            // The child keeps the read end for stdin, the write end for
            // the output streams; the parent keeps the opposite end.
            let (child_end, parent_end) = match stream {
                StdStream::Stdin => (read, write),
                StdStream::Stdout | StdStream::Stderr => (write, read),
            };
            let mut actions = Vec::with_capacity(3);
            if parent_end.as_raw_fd() != target {
                actions.push(FdAction::Close(parent_end.as_raw_fd()));
            }
            actions.extend(wire(child_end.as_raw_fd(), target));
            Ok(PreparedStream {
                disposition: Disposition::Wired,
                actions,
                transfer: vec![child_end],
                parent_end: Some(parent_end),
            })
        }

        StreamPolicy::Fd(fd) => Ok(PreparedStream {
            disposition: Disposition::Wired,
            actions: wire(*fd, target),
            transfer: Vec::new(),
            parent_end: None,
        }),

        StreamPolicy::Path(path) => {
            let file = open_path(stream, path)?;
            let actions = wire(file.as_raw_fd(), target);
            Ok(PreparedStream {
                disposition: Disposition::Wired,
                actions,
                transfer: vec![file],
                parent_end: None,
            })
        }

        StreamPolicy::MergeWithStdout => {
            let Some(stdout) = stdout_disposition else {
                return Err(SpawnError::Config {
                    stream,
                    reason: "merge with stdout is only valid for stderr".into(),
                });
            };
            match stdout {
                // Stdout untouched means stderr stays untouched too.
                Disposition::Inherited => Ok(PreparedStream::untouched(Disposition::Inherited)),
                // Stdout's slot is already wired (to the null device or
                // a real destination); pointing stderr at it inherits
                // that resolution, discard included.
                Disposition::Discarded | Disposition::Wired => Ok(PreparedStream {
                    disposition: stdout,
                    actions: vec![FdAction::Dup2 {
                        src: StdStream::Stdout.target_fd(),
                        dst: target,
                    }],
                    transfer: Vec::new(),
                    parent_end: None,
                }),
            }
        }
    }
}

/// Launch `argv` with its standard streams wired per `plan`.
///
/// `argv[0]` is resolved against the executable search path. On success
/// the plan holds the child's pid and the parent-side end of every
/// `Pipe` stream; the child-side ends are closed in both processes by
/// the time this returns. On failure every descriptor this call opened
/// is closed again, the plan gains no pid and no pipe ends, and
/// caller-supplied descriptors are left untouched.
///
/// Blocking and synchronous; the launcher never waits on the child.
/// Reaping belongs to the caller, through the pid on the plan.
#[allow(clippy::zombie_processes)]
pub fn launch(plan: &mut RedirectionPlan, argv: &[&str], env: &Env) -> Result<()> {
    let (&program, args) = argv.split_first().ok_or(SpawnError::EmptyArgv)?;
    if plan.pid.is_some() {
        return Err(SpawnError::AlreadyLaunched);
    }

    validate(StdStream::Stdin, &plan.stdin)?;
    validate(StdStream::Stdout, &plan.stdout)?;
    validate(StdStream::Stderr, &plan.stderr)?;

    let stdin = prepare(StdStream::Stdin, &plan.stdin, None)?;
    let stdout = prepare(StdStream::Stdout, &plan.stdout, None)?;
    let stderr = prepare(StdStream::Stderr, &plan.stderr, Some(stdout.disposition))?;

    let mut actions =
        Vec::with_capacity(stdin.actions.len() + stdout.actions.len() + stderr.actions.len());
    actions.extend_from_slice(&stdin.actions);
    actions.extend_from_slice(&stdout.actions);
    actions.extend_from_slice(&stderr.actions);

    trace!(program, ?actions, "launching");

    let mut command = Command::new(program);
    command.args(args);
    if let Env::Replace(vars) = env {
        command.env_clear();
        for (key, value) in vars {
            command.env(key, value);
        }
    }
    // The action list runs in the child between fork and exec. Failures
    // there, and exec failures, report back through the standard
    // library's internal error pipe and show up as the spawn error.
    unsafe {
        command.pre_exec(move || {
            for action in &actions {
                action.apply()?;
            }
            Ok(())
        });
    }

    let child = command.spawn().map_err(|source| SpawnError::Launch {
        program: program.to_string(),
        source,
    })?;

    // Commit. The transfer descriptors drop at the end of this scope,
    // closing the parent's copies of every child-side end.
    plan.stdin_pipe = stdin.parent_end;
    plan.stdout_pipe = stdout.parent_end;
    plan.stderr_pipe = stderr.parent_end;
    // Linux pids are far below i32::MAX; the cast cannot overflow.
    plan.pid = Some(Pid::from_raw(child.id() as i32));
    debug!(pid = child.id(), program, "launched");
    Ok(())
}
