//! Turnstile controller handle.
//!
//! A [`Device`] owns the link to one controller and performs the
//! read-registers exchange. It is cheap to clone: clones share the transport,
//! and every write+read pair holds the transport lock, so a point read issued
//! while a poller is running never interleaves with a poll exchange.

use crate::config::{DeviceConfig, PollerConfig};
use crate::events::Listener;
use crate::mock::{MockTransport, MockTransportHandle};
use crate::poller::Poller;
use crate::serial::SerialPortTransport;
use crate::transport::{Transport, is_transient_timeout};
use crate::transports::AnyTransport;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace};
use turnstile_core::{
    FramingError, ReadError, RegisterSnapshot, RegisterVector, Result, TransportError,
    constants::{DEFAULT_DEVICE_ADDRESS, FRAME_TRAILER_LEN, READ_BUFFER_SIZE, RESPONSE_HEADER_LEN},
};
use turnstile_protocol::{HexDump, RequestBuilder, decode_registers, validate_response};

/// A validated response frame.
///
/// Holds the raw bytes so the poller can compare consecutive responses
/// byte for byte before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    raw: Bytes,
}

impl Response {
    /// Raw frame bytes, header to terminator.
    pub fn as_bytes(&self) -> &Bytes {
        &self.raw
    }

    /// Payload between the header and the checksum.
    pub fn payload(&self) -> &[u8] {
        &self.raw[RESPONSE_HEADER_LEN..self.raw.len() - FRAME_TRAILER_LEN]
    }

    /// Decode the payload as the status register block.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::PayloadTooShort`] if the payload is shorter
    /// than the register block.
    pub fn decode(&self) -> std::result::Result<RegisterSnapshot, FramingError> {
        decode_registers(self.payload())
    }
}

/// Handle to one turnstile controller.
///
/// # Examples
///
/// ```
/// use turnstile_driver::Device;
/// use turnstile_core::RegisterSnapshot;
///
/// #[tokio::main]
/// async fn main() -> turnstile_core::Result<()> {
///     let (device, handle) = Device::mock();
///     handle.push_registers(RegisterSnapshot {
///         input_a: 1,
///         input_b: 2,
///         failure: 3,
///         alarm: true,
///         battery_flag: false,
///     });
///
///     let registers = device.registers().await?;
///     assert_eq!(registers.as_array(), &[1, 2, 3, 0, 1]);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Device {
    address: u8,
    transport: Arc<Mutex<AnyTransport>>,
    read_timeout: Duration,
    name: String,
}

impl Device {
    /// Open the controller on a serial port with default address and timeout.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the port cannot be opened.
    pub fn open(port_name: impl Into<String>, baud_rate: u32) -> Result<Self> {
        Self::open_with(&DeviceConfig::new(port_name, baud_rate))
    }

    /// Open the controller described by `config`.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the port cannot be opened.
    pub fn open_with(config: &DeviceConfig) -> Result<Self> {
        let transport = SerialPortTransport::open(config)?;
        Ok(Self::with_transport(transport, config.address))
    }

    /// Wrap an already constructed transport.
    pub fn with_transport(transport: impl Into<AnyTransport>, address: u8) -> Self {
        let transport = transport.into();
        let read_timeout = transport.read_timeout();
        let name = transport.name().to_string();

        Self {
            address,
            transport: Arc::new(Mutex::new(transport)),
            read_timeout,
            name,
        }
    }

    /// Create a device backed by a [`MockTransport`].
    pub fn mock() -> (Self, MockTransportHandle) {
        let (transport, handle) = MockTransport::new();
        (Self::with_transport(transport, DEFAULT_DEVICE_ADDRESS), handle)
    }

    /// Bus address of the controller.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Name of the underlying link.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configured read timeout.
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Perform one read-registers exchange and validate the response frame.
    ///
    /// The read is bounded by the configured read timeout. An empty read is
    /// reported as [`TransportError::EmptyRead`], flagged transient when it
    /// returned well before the timeout.
    ///
    /// # Errors
    ///
    /// Returns a [`ReadError`] classifying the transport or framing failure.
    pub async fn read_response(&self) -> std::result::Result<Response, ReadError> {
        let request = RequestBuilder::read_registers(self.address).build();
        let timeout_ms = self.read_timeout.as_millis() as u64;

        let raw = {
            let mut transport = self.transport.lock().await;
            trace!(device = %self.name, frame = %HexDump(&request), "Sending request");
            transport.write(&request).await?;

            let started = Instant::now();
            let read = tokio::time::timeout(self.read_timeout, transport.read(READ_BUFFER_SIZE));
            let raw = match read.await {
                Ok(result) => result?,
                Err(_) => return Err(TransportError::timeout(timeout_ms).into()),
            };

            if raw.is_empty() {
                let elapsed = started.elapsed();
                debug!(device = %self.name, elapsed_ms = elapsed.as_millis() as u64, "Empty read");
                return Err(TransportError::EmptyRead {
                    elapsed_ms: elapsed.as_millis() as u64,
                    transient: is_transient_timeout(elapsed, self.read_timeout),
                }
                .into());
            }
            raw
        };

        trace!(device = %self.name, frame = %HexDump(&raw), "Received response");
        validate_response(&raw)?;

        Ok(Response {
            raw: Bytes::from(raw),
        })
    }

    /// Read the register block once.
    ///
    /// Returns `[input_a, input_b, failure, battery01, alarm01]`. This does not
    /// touch the state of any running poller.
    ///
    /// # Errors
    ///
    /// Returns the classified read error, including a short payload.
    pub async fn registers(&self) -> Result<RegisterVector> {
        let response = self.read_response().await?;
        let snapshot = response.decode()?;
        Ok(snapshot.to_vector())
    }

    /// Start polling with the default configuration.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Never fails with the default configuration; see [`Device::listen_with`].
    pub fn listen(&self) -> Result<Listener> {
        self.listen_with(PollerConfig::default())
    }

    /// Start polling with a custom configuration.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration is invalid.
    pub fn listen_with(&self, config: PollerConfig) -> Result<Listener> {
        Ok(Poller::new(self.clone(), config)?.spawn())
    }
}
