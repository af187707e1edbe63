//! Error taxonomy for the turnstile driver.
//!
//! Errors are split by where they originate:
//!
//! - [`FramingError`]: the response bytes are corrupted or foreign.
//! - [`TransportError`]: the serial link failed, timed out or returned nothing.
//! - [`ReadError`]: the classified outcome of one request/response exchange.
//! - [`EscalationError`]: too many consecutive exchanges failed; the event
//!   stream reports it once and closes.
//!
//! All of them are `Clone` so a failure cause can travel inside an
//! [`Event`](crate::Event).

use serde::Serialize;
use thiserror::Error;

/// Response frame failed validation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FramingError {
    #[error("Response too short: {len} bytes")]
    TooShort { len: usize },

    #[error("Bad terminator: expected 0xFC, got {found:#04X}")]
    BadTerminator { found: u8 },

    #[error("Checksum mismatch: expected {expected:#04X}, got {actual:#04X}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    #[error("Register payload too short: expected {expected} bytes, got {actual}")]
    PayloadTooShort { expected: usize, actual: usize },
}

/// Failure of the underlying serial transport.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransportError {
    /// I/O failure reported by the port.
    #[error("I/O error ({kind}): {message}")]
    Io {
        #[serde(rename = "io_kind", serialize_with = "serialize_io_kind")]
        kind: std::io::ErrorKind,
        message: String,
    },

    /// No response within the configured read timeout.
    #[error("Read timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// The read returned zero bytes without an explicit error.
    ///
    /// `transient` records the verdict of the elapsed-time heuristic.
    #[error("Empty read after {elapsed_ms}ms (transient: {transient})")]
    EmptyRead { elapsed_ms: u64, transient: bool },

    /// The transport has been closed or released.
    #[error("Transport closed")]
    Closed,

    /// The port could not be opened.
    #[error("Failed to open {port}: {message}")]
    Open { port: String, message: String },
}

fn serialize_io_kind<S: serde::Serializer>(
    kind: &std::io::ErrorKind,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(kind)
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl TransportError {
    /// Create an I/O error from a kind and message.
    pub fn io(kind: std::io::ErrorKind, message: impl Into<String>) -> Self {
        Self::Io {
            kind,
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }
}

/// Classified outcome of a failed request/response exchange.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ReadError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Framing error: {0}")]
    Framing(#[from] FramingError),
}

impl ReadError {
    /// Whether this failure is a short line hiccup rather than a real fault.
    ///
    /// Transient failures still count toward escalation; the distinction only
    /// affects how loudly they are logged.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transport(TransportError::EmptyRead {
                transient: true,
                ..
            })
        )
    }
}

/// Consecutive failures exceeded the tolerated threshold.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("Device unreachable after {failures} consecutive failures, last: {cause}")]
pub struct EscalationError {
    /// Number of consecutive failed ticks, including the last one.
    pub failures: u32,

    /// Failure observed on the last tick.
    pub cause: ReadError,
}

/// Crate-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error("Escalation: {0}")]
    Escalation(#[from] EscalationError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        Self::Read(ReadError::Transport(err))
    }
}

impl From<FramingError> for Error {
    fn from(err: FramingError) -> Self {
        Self::Read(ReadError::Framing(err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
