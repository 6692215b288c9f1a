use std::os::fd::{AsFd, BorrowedFd, OwnedFd};

use nix::unistd::Pid;

use crate::stream::StreamPolicy;

/// Redirection plan for one child process, and the handle to it once
/// launched.
///
/// Set the three policies, pass the plan to [`launch`](crate::launch()),
/// then use the accessors to reach the parent-side pipe ends and the
/// child's pid. The plan owns those pipe ends until [`release`] (or
/// drop) closes them, or until a `take_*` accessor transfers one out —
/// a caller feeding a child's stdin must take the write end and drop it
/// to signal end-of-input.
///
/// [`release`]: RedirectionPlan::release
#[derive(Debug, Default)]
pub struct RedirectionPlan {
    pub stdin: StreamPolicy,
    pub stdout: StreamPolicy,
    pub stderr: StreamPolicy,
    // Parent-side pipe ends, present only for Pipe policies after a
    // successful launch. Child-side ends never reach this struct.
    pub(crate) stdin_pipe: Option<OwnedFd>,
    pub(crate) stdout_pipe: Option<OwnedFd>,
    pub(crate) stderr_pipe: Option<OwnedFd>,
    pub(crate) pid: Option<Pid>,
}

impl RedirectionPlan {
    pub fn new(stdin: StreamPolicy, stdout: StreamPolicy, stderr: StreamPolicy) -> Self {
        Self {
            stdin,
            stdout,
            stderr,
            ..Self::default()
        }
    }

    // -- handle --

    /// Pid of the launched process, until [`release`] clears it.
    ///
    /// [`release`]: RedirectionPlan::release
    pub fn pid(&self) -> Option<Pid> {
        self.pid
    }

    // -- pipe ends --

    /// Write end of the stdin pipe, when the stdin policy was `Pipe`.
    pub fn stdin_pipe(&self) -> Option<BorrowedFd<'_>> {
        self.stdin_pipe.as_ref().map(AsFd::as_fd)
    }

    /// Read end of the stdout pipe, when the stdout policy was `Pipe`.
    pub fn stdout_pipe(&self) -> Option<BorrowedFd<'_>> {
        self.stdout_pipe.as_ref().map(AsFd::as_fd)
    }

    /// Read end of the stderr pipe, when the stderr policy was `Pipe`.
    pub fn stderr_pipe(&self) -> Option<BorrowedFd<'_>> {
        self.stderr_pipe.as_ref().map(AsFd::as_fd)
    }

    /// Transfer the stdin pipe's write end out of the plan. Dropping
    /// the returned descriptor closes it, which the child observes as
    /// end-of-stream.
    pub fn take_stdin_pipe(&mut self) -> Option<OwnedFd> {
        self.stdin_pipe.take()
    }

    /// Transfer the stdout pipe's read end out of the plan.
    pub fn take_stdout_pipe(&mut self) -> Option<OwnedFd> {
        self.stdout_pipe.take()
    }

    /// Transfer the stderr pipe's read end out of the plan.
    pub fn take_stderr_pipe(&mut self) -> Option<OwnedFd> {
        self.stderr_pipe.take()
    }

    // -- lifecycle --

    /// Close every pipe end still held and forget the pid.
    ///
    /// Idempotent: already-released slots are no-ops, and calling this
    /// on a plan that never launched is fine. Does not kill or reap the
    /// process; waiting on the pid is the caller's business and must
    /// happen before the pid is forgotten.
    pub fn release(&mut self) {
        self.stdin_pipe = None;
        self.stdout_pipe = None;
        self.stderr_pipe = None;
        self.pid = None;
    }
}
