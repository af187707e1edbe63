//! Serial port transport backed by the `serialport` crate.
//!
//! `serialport` exposes blocking `Read`/`Write`. Each operation runs on the
//! blocking thread pool with the port behind a shared lock, so a caller that
//! gives up on a read (for example through `tokio::time::timeout`) does not
//! lose the port: the blocking call finishes on its own timeout and releases it.

use crate::config::DeviceConfig;
use crate::transport::Transport;
use serialport::SerialPort;
use std::fmt;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};
use turnstile_core::TransportError;

/// Transport over a real serial port.
pub struct SerialPortTransport {
    port: Arc<Mutex<Box<dyn SerialPort>>>,
    name: String,
    read_timeout: Duration,
}

impl SerialPortTransport {
    /// Open and configure the port described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Open`] if the port cannot be opened.
    pub fn open(config: &DeviceConfig) -> Result<Self, TransportError> {
        info!(
            port = %config.port_name,
            baud_rate = config.baud_rate,
            read_timeout_ms = config.read_timeout.as_millis() as u64,
            "Opening serial port"
        );

        let port = serialport::new(&config.port_name, config.baud_rate)
            .timeout(config.read_timeout)
            .open()
            .map_err(|e| TransportError::Open {
                port: config.port_name.clone(),
                message: e.to_string(),
            })?;

        Ok(Self {
            port: Arc::new(Mutex::new(port)),
            name: config.port_name.clone(),
            read_timeout: config.read_timeout,
        })
    }

    /// Run a blocking port operation on the blocking thread pool.
    async fn blocking<T, F>(&self, op: F) -> Result<T, TransportError>
    where
        F: FnOnce(&mut dyn SerialPort) -> io::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let port = Arc::clone(&self.port);
        let timeout_ms = self.read_timeout.as_millis() as u64;

        let joined = tokio::task::spawn_blocking(move || {
            let mut guard = port
                .lock()
                .map_err(|_| io::Error::other("serial port lock poisoned"))?;
            op(guard.as_mut())
        })
        .await
        .map_err(|e| TransportError::io(io::ErrorKind::Other, format!("serial task failed: {e}")))?;

        joined.map_err(|e| match e.kind() {
            io::ErrorKind::TimedOut => TransportError::timeout(timeout_ms),
            _ => TransportError::from(e),
        })
    }
}

impl Transport for SerialPortTransport {
    async fn write(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        let frame = frame.to_vec();
        self.blocking(move |port| {
            port.write_all(&frame)?;
            port.flush()
        })
        .await
    }

    async fn read(&mut self, max_bytes: usize) -> Result<Vec<u8>, TransportError> {
        let bytes = self
            .blocking(move |port| {
                let mut buf = vec![0u8; max_bytes];
                let n = port.read(&mut buf)?;
                buf.truncate(n);
                Ok(buf)
            })
            .await?;

        debug!(port = %self.name, len = bytes.len(), "Serial read completed");
        Ok(bytes)
    }

    fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for SerialPortTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialPortTransport")
            .field("name", &self.name)
            .field("read_timeout", &self.read_timeout)
            .finish_non_exhaustive()
    }
}
