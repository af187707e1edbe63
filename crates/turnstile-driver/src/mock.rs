//! Mock transport implementation for testing and development.
//!
//! This module provides a simulated controller link whose replies are scripted
//! programmatically, so the poller can be exercised without a serial port.
//! Scripted replies are served in order; the last one keeps being served for
//! every further read, which models a device that keeps reporting the same
//! state.

use crate::transport::Transport;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use turnstile_core::{
    RegisterSnapshot, TransportError,
    constants::{DEFAULT_DEVICE_ADDRESS, FUNCTION_READ_REGISTERS, REGISTER_BANK, REGISTER_PAYLOAD_LEN},
};
use turnstile_protocol::{encode_registers, encode_request};

/// One scripted answer of the mock controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// Return these bytes verbatim.
    Frame(Vec<u8>),

    /// Return a valid register response carrying this snapshot.
    Registers(RegisterSnapshot),

    /// Return zero bytes immediately.
    Empty,

    /// Return zero bytes after the given delay.
    EmptyAfter(Duration),

    /// Fail the read with an I/O error of this kind.
    Error(std::io::ErrorKind),

    /// Never answer.
    Stall,
}

impl MockReply {
    /// Build the raw response frame the controller would send for `snapshot`.
    pub fn register_frame(snapshot: &RegisterSnapshot) -> Vec<u8> {
        encode_request(
            DEFAULT_DEVICE_ADDRESS,
            FUNCTION_READ_REGISTERS,
            REGISTER_BANK,
            &encode_registers(snapshot),
            REGISTER_PAYLOAD_LEN as u8,
        )
        .to_vec()
    }
}

#[derive(Debug, Default)]
struct Script {
    replies: VecDeque<MockReply>,
    written: Vec<Vec<u8>>,
}

/// Mock controller link for testing and development.
///
/// # Examples
///
/// ```
/// use turnstile_driver::mock::{MockReply, MockTransport};
/// use turnstile_driver::transport::Transport;
/// use turnstile_core::RegisterSnapshot;
///
/// #[tokio::main]
/// async fn main() {
///     let (mut transport, handle) = MockTransport::new();
///     handle.push(MockReply::Registers(RegisterSnapshot::default()));
///
///     transport.write(&[0x82, 0x10, 0x10, 0x0E, 0x74, 0xFC]).await.unwrap();
///     let frame = transport.read(128).await.unwrap();
///
///     assert_eq!(frame.len(), 20);
///     assert_eq!(handle.reads(), 1);
/// }
/// ```
#[derive(Debug)]
pub struct MockTransport {
    script: Arc<Mutex<Script>>,
    reads: Arc<AtomicUsize>,
    name: String,
    read_timeout: Duration,
}

impl MockTransport {
    /// Create a new mock transport with the default name and a 600s read timeout.
    ///
    /// Returns the transport and a handle used to script replies and inspect
    /// what was written.
    pub fn new() -> (Self, MockTransportHandle) {
        Self::with_read_timeout(Duration::from_secs(
            turnstile_core::constants::DEFAULT_READ_TIMEOUT_SECS,
        ))
    }

    /// Create a new mock transport with a custom read timeout.
    pub fn with_read_timeout(read_timeout: Duration) -> (Self, MockTransportHandle) {
        let script = Arc::new(Mutex::new(Script::default()));
        let reads = Arc::new(AtomicUsize::new(0));

        let transport = Self {
            script: Arc::clone(&script),
            reads: Arc::clone(&reads),
            name: "mock".to_string(),
            read_timeout,
        };

        (transport, MockTransportHandle { script, reads })
    }

    /// Take the next reply, keeping the last one in place.
    fn next_reply(&self) -> Option<MockReply> {
        let mut script = lock(&self.script);
        if script.replies.len() > 1 {
            script.replies.pop_front()
        } else {
            script.replies.front().cloned()
        }
    }
}

impl Transport for MockTransport {
    async fn write(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        lock(&self.script).written.push(frame.to_vec());
        Ok(())
    }

    async fn read(&mut self, max_bytes: usize) -> Result<Vec<u8>, TransportError> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        let Some(reply) = self.next_reply() else {
            return Err(TransportError::io(
                std::io::ErrorKind::NotConnected,
                "no scripted reply",
            ));
        };

        match reply {
            MockReply::Frame(mut bytes) => {
                bytes.truncate(max_bytes);
                Ok(bytes)
            }
            MockReply::Registers(snapshot) => {
                let mut bytes = MockReply::register_frame(&snapshot);
                bytes.truncate(max_bytes);
                Ok(bytes)
            }
            MockReply::Empty => Ok(Vec::new()),
            MockReply::EmptyAfter(delay) => {
                tokio::time::sleep(delay).await;
                Ok(Vec::new())
            }
            MockReply::Error(kind) => Err(TransportError::io(kind, "scripted failure")),
            MockReply::Stall => std::future::pending().await,
        }
    }

    fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Handle for scripting a [`MockTransport`].
#[derive(Debug, Clone)]
pub struct MockTransportHandle {
    script: Arc<Mutex<Script>>,
    reads: Arc<AtomicUsize>,
}

impl MockTransportHandle {
    /// Queue a reply.
    pub fn push(&self, reply: MockReply) {
        lock(&self.script).replies.push_back(reply);
    }

    /// Queue several replies in order.
    pub fn extend(&self, replies: impl IntoIterator<Item = MockReply>) {
        lock(&self.script).replies.extend(replies);
    }

    /// Queue a valid register response.
    pub fn push_registers(&self, snapshot: RegisterSnapshot) {
        self.push(MockReply::Registers(snapshot));
    }

    /// Number of reads performed so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Frames written so far.
    pub fn written(&self) -> Vec<Vec<u8>> {
        lock(&self.script).written.clone()
    }
}

// A panicking test thread must not hide the script from the others.
fn lock(script: &Mutex<Script>) -> std::sync::MutexGuard<'_, Script> {
    script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use turnstile_protocol::validate_response;

    #[tokio::test]
    async fn test_replies_served_in_order_last_repeats() {
        let (mut transport, handle) = MockTransport::new();
        handle.extend([MockReply::Empty, MockReply::Frame(vec![1, 2, 3])]);

        assert!(transport.read(128).await.unwrap().is_empty());
        assert_eq!(transport.read(128).await.unwrap(), vec![1, 2, 3]);
        assert_eq!(transport.read(128).await.unwrap(), vec![1, 2, 3]);
        assert_eq!(handle.reads(), 3);
    }

    #[tokio::test]
    async fn test_unscripted_read_fails() {
        let (mut transport, _handle) = MockTransport::new();
        let result = transport.read(128).await;

        assert!(matches!(
            result,
            Err(TransportError::Io {
                kind: std::io::ErrorKind::NotConnected,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_register_reply_is_valid_frame() {
        let (mut transport, handle) = MockTransport::new();
        let snapshot = RegisterSnapshot {
            input_a: 5,
            ..RegisterSnapshot::default()
        };
        handle.push_registers(snapshot);

        let frame = transport.read(128).await.unwrap();
        let payload = validate_response(&frame).unwrap();
        assert_eq!(payload.len(), REGISTER_PAYLOAD_LEN);
        assert_eq!(payload[0], 5);
    }

    #[tokio::test]
    async fn test_read_truncates_to_max_bytes() {
        let (mut transport, handle) = MockTransport::new();
        handle.push(MockReply::Frame(vec![0xAA; 10]));

        assert_eq!(transport.read(4).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_writes_are_recorded() {
        let (mut transport, handle) = MockTransport::new();
        transport.write(&[0x82, 0xFC]).await.unwrap();
        transport.write(&[0x01]).await.unwrap();

        assert_eq!(handle.written(), vec![vec![0x82, 0xFC], vec![0x01]]);
    }

    #[tokio::test]
    async fn test_scripted_error() {
        let (mut transport, handle) = MockTransport::new();
        handle.push(MockReply::Error(std::io::ErrorKind::BrokenPipe));

        assert!(matches!(
            transport.read(128).await,
            Err(TransportError::Io {
                kind: std::io::ErrorKind::BrokenPipe,
                ..
            })
        ));
    }
}
