//! Enum wrapper for transport dispatch.
//!
//! [`Transport`] uses native `async fn`, so it cannot be boxed as
//! `dyn Transport`. [`AnyTransport`] gives the device a single concrete type
//! that can live behind a lock and be moved into a spawned poller task.
//!
//! # Examples
//!
//! ```
//! use turnstile_driver::mock::MockTransport;
//! use turnstile_driver::transports::AnyTransport;
//! use turnstile_driver::transport::Transport;
//!
//! let (mock, _handle) = MockTransport::new();
//! let transport = AnyTransport::Mock(mock);
//! assert_eq!(transport.name(), "mock");
//! ```

use crate::mock::MockTransport;
use crate::serial::SerialPortTransport;
use crate::transport::Transport;
use std::time::Duration;
use turnstile_core::TransportError;

/// Concrete transport selected at runtime.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyTransport {
    /// Real serial port.
    Serial(SerialPortTransport),

    /// Scripted mock for tests and development.
    Mock(MockTransport),
}

impl Transport for AnyTransport {
    async fn write(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        match self {
            Self::Serial(transport) => transport.write(frame).await,
            Self::Mock(transport) => transport.write(frame).await,
        }
    }

    async fn read(&mut self, max_bytes: usize) -> Result<Vec<u8>, TransportError> {
        match self {
            Self::Serial(transport) => transport.read(max_bytes).await,
            Self::Mock(transport) => transport.read(max_bytes).await,
        }
    }

    fn read_timeout(&self) -> Duration {
        match self {
            Self::Serial(transport) => transport.read_timeout(),
            Self::Mock(transport) => transport.read_timeout(),
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Serial(transport) => transport.name(),
            Self::Mock(transport) => transport.name(),
        }
    }
}

impl From<SerialPortTransport> for AnyTransport {
    fn from(transport: SerialPortTransport) -> Self {
        Self::Serial(transport)
    }
}

impl From<MockTransport> for AnyTransport {
    fn from(transport: MockTransport) -> Self {
        Self::Mock(transport)
    }
}
