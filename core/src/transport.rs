//! Reliable byte transfer over raw descriptors.
//!
//! The control channel is a plain descriptor (socket or pipe) and the kernel
//! is free to move fewer bytes than asked or to interrupt the call with a
//! signal. [`read_full`] and [`write_full`] absorb both: they retry
//! interrupted calls forever and keep issuing the underlying call while it
//! makes progress, so a caller either gets the full count or a [`Transfer`]
//! outcome that says exactly how the transfer stopped.
//!
//! Operations are synchronous and blocking. The transport holds no lock; a
//! descriptor driven by two callers at once must be serialized externally.
//! Callers needing bounded waits put the descriptor in non-blocking mode or
//! arm a watchdog before calling in.

use std::io;
use std::os::fd::AsFd;

use nix::errno::Errno;
use nix::unistd;
use tracing::trace;

/// How a transfer ended.
///
/// A clean partial transfer and an I/O failure are different outcomes, not
/// one "short count" with an errno to remember to check: a peer that closed
/// its end mid-message is [`Short`](Transfer::Short), a descriptor that
/// errored is [`Failed`](Transfer::Failed) with the error attached.
#[derive(Debug)]
pub enum Transfer {
    /// The full requested count was moved.
    Complete { transferred: usize },
    /// The peer stopped supplying or accepting bytes before the requested
    /// count, with no error raised.
    Short { transferred: usize },
    /// The underlying call failed; `transferred` bytes had already moved.
    Failed {
        transferred: usize,
        error: io::Error,
    },
}

impl Transfer {
    /// Bytes moved before the transfer ended, whatever the outcome.
    pub fn transferred(&self) -> usize {
        match self {
            Transfer::Complete { transferred }
            | Transfer::Short { transferred }
            | Transfer::Failed { transferred, .. } => *transferred,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Transfer::Complete { .. })
    }

    /// The I/O error, when the transfer failed.
    pub fn error(&self) -> Option<&io::Error> {
        match self {
            Transfer::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Reads until `buf` is full, the peer stops, or the descriptor errors.
///
/// Interrupted calls are retried indefinitely and never surface to the
/// caller. End-of-file before `buf.len()` bytes is [`Transfer::Short`].
pub fn read_full<F: AsFd>(fd: F, buf: &mut [u8]) -> Transfer {
    let fd = fd.as_fd();
    let mut transferred = 0;

    while transferred < buf.len() {
        match unistd::read(fd, &mut buf[transferred..]) {
            Ok(0) => return Transfer::Short { transferred },
            Ok(n) => transferred += n,
            Err(Errno::EINTR) => {
                trace!(transferred, "read interrupted, retrying");
            }
            Err(errno) => {
                return Transfer::Failed {
                    transferred,
                    error: io::Error::from(errno),
                }
            }
        }
    }

    Transfer::Complete { transferred }
}

/// Writes all of `buf`, retrying interrupted and partial writes.
///
/// A write call that reports zero progress without an error ends the
/// transfer as [`Transfer::Short`].
pub fn write_full<F: AsFd>(fd: F, buf: &[u8]) -> Transfer {
    let fd = fd.as_fd();
    let mut transferred = 0;

    while transferred < buf.len() {
        match unistd::write(fd, &buf[transferred..]) {
            Ok(0) => return Transfer::Short { transferred },
            Ok(n) => transferred += n,
            Err(Errno::EINTR) => {
                trace!(transferred, "write interrupted, retrying");
            }
            Err(errno) => {
                return Transfer::Failed {
                    transferred,
                    error: io::Error::from(errno),
                }
            }
        }
    }

    Transfer::Complete { transferred }
}
