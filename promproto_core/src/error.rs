use colored::Colorize;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Whether to log the full cause chain of warnings and errors.
/// Use the `DEBUG` env var (or `--debug`) to override (on, off)
static ERROR_LOGGER: AtomicBool = AtomicBool::new(false);

pub fn debug_error_enabled(enabled: bool) {
    ERROR_LOGGER.store(enabled, Ordering::Relaxed);
}

/// Print a non-fatal error to stderr.
///
/// The top-level message is always printed; its causes only when verbose error logging is on.
pub fn warn(err: anyhow::Error) {
    eprintln!("{}", format!("Warning: {}", err).yellow());
    if ERROR_LOGGER.load(Ordering::Relaxed) {
        for err in err.chain().skip(1) {
            eprintln!("Caused by: {}", err);
        }
    }
}

/// A message in the stream that couldn't be turned into a metric family.
///
/// These never abort decoding; the frame is skipped and the next one is read.
#[derive(Error, Debug)]
pub enum FrameError {
    // The cause is part of the message, so it isn't also exposed as `source()`
    #[error("failed to decode message at offset {offset}: {cause}")]
    Decode {
        offset: usize,
        cause: prost::DecodeError,
    },
    #[error("message at offset {offset} has unknown metric type {value}")]
    UnknownType { offset: usize, value: i32 },
}

impl FrameError {
    pub fn offset(&self) -> usize {
        match *self {
            FrameError::Decode { offset, .. } => offset,
            FrameError::UnknownType { offset, .. } => offset,
        }
    }
}
