//! Child-side descriptor actions.
//!
//! A launch compiles each stream policy into a short ordered sequence of
//! descriptor operations. The whole list runs in the child between
//! `fork` and `exec`; the parent's own descriptor table is never
//! touched.

use std::io;
use std::os::unix::io::RawFd;

/// A single descriptor operation applied in the child before `exec`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FdAction {
    /// `dup2(src, dst)`, making `dst` refer to `src`'s open file.
    Dup2 { src: RawFd, dst: RawFd },
    /// `close(fd)`.
    Close(RawFd),
}

impl FdAction {
    /// Apply the action in the child.
    ///
    /// Runs post-fork, so only async-signal-safe calls are legal here:
    /// raw syscalls, no allocation.
    pub(crate) fn apply(self) -> io::Result<()> {
        match self {
            // dup2 with equal descriptors leaves FD_CLOEXEC untouched,
            // which would close the stream at exec; clear the flag
            // explicitly instead.
            Self::Dup2 { src, dst } if src == dst => {
                // SAFETY: fcntl on a descriptor the caller supplied for
                // this stream; failure is checked and reported.
                let flags = unsafe { libc::fcntl(src, libc::F_GETFD) };
                if flags < 0 {
                    return Err(io::Error::last_os_error());
                }
                // SAFETY: same descriptor, valid F_SETFD argument.
                if unsafe { libc::fcntl(src, libc::F_SETFD, flags & !libc::FD_CLOEXEC) } < 0 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            }
            Self::Dup2 { src, dst } => {
                // SAFETY: both descriptors were created by this launch
                // or validated non-negative; failure is checked.
                if unsafe { libc::dup2(src, dst) } < 0 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            }
            Self::Close(fd) => {
                // SAFETY: closes the child's copy of a descriptor this
                // launch created or the caller supplied.
                if unsafe { libc::close(fd) } < 0 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            }
        }
    }
}
