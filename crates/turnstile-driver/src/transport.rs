//! Transport trait definition.
//!
//! The transport is the byte pipe to the controller: a serial port in
//! production, a scripted mock in tests. The protocol is strictly half-duplex,
//! so callers always pair one `write` with one `read` while holding exclusive
//! access to the transport.
//!
//! The trait uses native `async fn` methods. It is therefore not object-safe;
//! dynamic dispatch goes through [`AnyTransport`](crate::transports::AnyTransport).

#![allow(async_fn_in_trait)]

use std::time::Duration;
use turnstile_core::{TransportError, constants::TRANSIENT_TIMEOUT_DIVISOR};

/// Byte transport to a single controller.
pub trait Transport: Send {
    /// Write a complete frame.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the port rejects the write.
    async fn write(&mut self, frame: &[u8]) -> Result<(), TransportError>;

    /// Read whatever the device sent, up to `max_bytes`.
    ///
    /// A single read may return fewer bytes than a full frame. An empty vector
    /// means the port returned nothing without reporting an error.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] on I/O failure or when the port's own
    /// timeout expires.
    async fn read(&mut self, max_bytes: usize) -> Result<Vec<u8>, TransportError>;

    /// Read timeout the transport was configured with.
    fn read_timeout(&self) -> Duration;

    /// Human-readable name of the link (port path or mock label).
    fn name(&self) -> &str;
}

/// Decide whether an empty read was a line hiccup rather than a real timeout.
///
/// An empty read that came back in less than `configured_timeout / 20` did not
/// wait anywhere near the timeout, so the port was briefly unavailable rather
/// than silent.
///
/// # Examples
///
/// ```
/// use turnstile_driver::is_transient_timeout;
/// use std::time::Duration;
///
/// let timeout = Duration::from_secs(600);
/// assert!(is_transient_timeout(Duration::from_millis(5), timeout));
/// assert!(!is_transient_timeout(Duration::from_secs(30), timeout));
/// ```
#[must_use]
pub fn is_transient_timeout(elapsed: Duration, configured_timeout: Duration) -> bool {
    elapsed < configured_timeout / TRANSIENT_TIMEOUT_DIVISOR
}
