//! Serial driver for the turnstile access controller.
//!
//! The controller exposes a 14-byte status register block over a half-duplex
//! serial link. This crate provides:
//!
//! - [`Device`]: point reads of the register block (`registers()`),
//! - [`Poller`] / [`Listener`]: a background task that polls the block once
//!   per tick and streams [`Event`](turnstile_core::Event)s for every change,
//! - [`Transport`]: the byte-pipe abstraction, with a serial implementation
//!   and a scripted mock for tests.
//!
//! # Examples
//!
//! ```no_run
//! use turnstile_driver::Device;
//! use turnstile_core::Event;
//!
//! #[tokio::main]
//! async fn main() -> turnstile_core::Result<()> {
//!     let device = Device::open("/dev/ttyUSB0", 9600)?;
//!     println!("registers: {}", device.registers().await?);
//!
//!     let mut listener = device.listen()?;
//!     while let Some(event) = listener.recv().await {
//!         if let Event::Error(e) = &event {
//!             eprintln!("{e}");
//!         }
//!         println!("{event:?}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Failure handling
//!
//! Single failed ticks are logged and skipped. Once more than
//! `failure_threshold` ticks fail in a row the poller emits one
//! `Event::Error`, closes the stream and stops. Start a new listener to
//! resume.

pub mod config;
pub mod device;
pub mod events;
pub mod mock;
pub mod poller;
pub mod serial;
pub mod transport;
pub mod transports;

pub use config::{BackpressurePolicy, DeviceConfig, PollerConfig};
pub use device::{Device, Response};
pub use events::{EventStream, Listener};
pub use poller::{PollPhase, Poller, PollerExit, PollerState, TickOutcome, diff_snapshots};
pub use serial::SerialPortTransport;
pub use transport::{Transport, is_transient_timeout};
pub use transports::AnyTransport;
