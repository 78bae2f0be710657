//! Signal-interruption retry.
//!
//! Blocking reads, writes and polls can fail with `EINTR` when the process
//! takes a signal. Callers of this crate never see that: the raw operation is
//! wrapped in [`retry_interrupted`] and reissued until it completes or fails
//! for a real reason.

use std::io::{self, ErrorKind};

/// Run `op` until it returns something other than `ErrorKind::Interrupted`.
pub fn retry_interrupted<T>(mut op: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    loop {
        match op() {
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}
