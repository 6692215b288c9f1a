//! Two-stage pipeline demo: `ls /bin` feeding `wc`, wired entirely
//! through explicit stream redirections.
//!
//! Sequence:
//! 1. Launch `wc` with piped stdin and stdout, stderr merged into stdout.
//! 2. Launch `ls /bin` with its stdout aimed at `wc`'s stdin write end
//!    and its stderr piped back here.
//! 3. Drain `ls`'s stderr with a poll loop, then reap it.
//! 4. Close our copy of `wc`'s stdin write end so it sees end-of-input,
//!    drain its counts, then reap it.
//! 5. Save the counts to a file and run `wc` once more, reading that
//!    file through a path redirection.

use std::fs::File;
use std::io::Read;
use std::os::fd::{AsFd, AsRawFd, OwnedFd};
use std::process::ExitCode;

use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use nix::sys::wait::{WaitStatus, waitpid};
use subproc::{Env, RedirectionPlan, SpawnError, StreamPolicy, launch};
use tracing::info;

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error("spawn error: {0}")]
    Spawn(#[from] SpawnError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("os error: {0}")]
    Os(#[from] nix::errno::Errno),

    #[error("launcher returned no {0} pipe")]
    MissingPipe(&'static str),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), DemoError> {
    // Counting stage first: it must be waiting on its stdin pipe before
    // the producer starts writing into it.
    let mut counter = RedirectionPlan::new(
        StreamPolicy::Pipe,
        StreamPolicy::Pipe,
        StreamPolicy::MergeWithStdout,
    );
    launch(&mut counter, &["wc"], &Env::Inherit)?;

    // Producing stage: stdout goes straight into the counter's stdin
    // write end. Ownership of that descriptor stays with us.
    let feed_fd = counter
        .stdin_pipe()
        .ok_or(DemoError::MissingPipe("stdin"))?
        .as_raw_fd();
    let mut lister = RedirectionPlan::new(
        StreamPolicy::Inherit,
        StreamPolicy::Fd(feed_fd),
        StreamPolicy::Pipe,
    );
    launch(&mut lister, &["ls", "/bin"], &Env::Inherit)?;

    let diagnostics = drain(
        "ls stderr",
        lister
            .take_stderr_pipe()
            .ok_or(DemoError::MissingPipe("stderr"))?,
    )?;
    if !diagnostics.is_empty() {
        print!("{}", String::from_utf8_lossy(&diagnostics));
    }
    reap("ls", &lister)?;
    lister.release();

    // With the producer gone, our copy of the write end is the last one
    // holding the counter's stdin open. Dropping it delivers EOF.
    drop(counter.take_stdin_pipe());

    let counts = drain(
        "wc stdout",
        counter
            .take_stdout_pipe()
            .ok_or(DemoError::MissingPipe("stdout"))?,
    )?;
    print!("{}", String::from_utf8_lossy(&counts));
    reap("wc", &counter)?;
    counter.release();

    // Round trip: count the counts, this time feeding stdin from a file.
    let report = std::env::temp_dir().join("subproc-demo-counts.txt");
    std::fs::write(&report, &counts)?;
    let mut recount = RedirectionPlan::new(
        StreamPolicy::Path(report.clone()),
        StreamPolicy::Inherit,
        StreamPolicy::Inherit,
    );
    launch(&mut recount, &["wc"], &Env::Inherit)?;
    reap("wc (from file)", &recount)?;
    recount.release();
    std::fs::remove_file(&report)?;

    Ok(())
}

/// Read a pipe end to end-of-stream, waiting for readiness before each
/// read so a chatty child never blocks us on the wrong descriptor.
fn drain(label: &str, fd: OwnedFd) -> Result<Vec<u8>, DemoError> {
    let mut file = File::from(fd);
    let mut collected = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        {
            let mut fds = [PollFd::new(file.as_fd(), PollFlags::POLLIN)];
            poll(&mut fds, PollTimeout::NONE)?;
        }
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        info!(source = label, bytes = n, "read");
        collected.extend_from_slice(buf.get(..n).unwrap_or_default());
    }
    Ok(collected)
}

/// Wait for a launched process and log how it went.
fn reap(label: &str, plan: &RedirectionPlan) -> Result<(), DemoError> {
    let Some(pid) = plan.pid() else {
        return Ok(());
    };
    match waitpid(pid, None)? {
        WaitStatus::Exited(_, code) => info!(process = label, code, "exited"),
        status => info!(process = label, ?status, "ended"),
    }
    Ok(())
}
