//! Core constants for the turnstile controller wire protocol.
//!
//! This module defines the protocol-level constants shared by the frame codec
//! and the register poller. Keeping them in one place guarantees that request
//! construction, response validation and payload decoding agree on offsets.
//!
//! # Frame Structure
//!
//! ```text
//! [ADDRESS][FUNCTION][BANK][LENGTH][PAYLOAD ...][CHECKSUM][0xFC]
//!  1 byte   1 byte    1 byte 1 byte  0..N bytes   1 byte    1 byte
//! ```
//!
//! Requests and responses share the same layout. The payload of a response
//! starts after the 4-byte header and ends before the 2-byte trailer.
//!
//! # Usage
//!
//! ```
//! use turnstile_core::constants::*;
//!
//! // Smallest response that can be validated
//! assert_eq!(MIN_RESPONSE_LEN, 6);
//!
//! // A full register response
//! let frame_len = RESPONSE_HEADER_LEN + REGISTER_PAYLOAD_LEN + FRAME_TRAILER_LEN;
//! assert_eq!(frame_len, 20);
//! ```

// ============================================================================
// Framing
// ============================================================================

/// Terminator byte closing every frame.
///
/// # Protocol Position
///
/// ```text
/// [82][10][10][0E][..][CS][FC]
///                         ^^^^
///                         Terminator
/// ```
pub const FRAME_TERMINATOR: u8 = 0xFC;

/// Number of header bytes preceding the payload (address, function, bank, length).
pub const RESPONSE_HEADER_LEN: usize = 4;

/// Number of trailer bytes following the payload (checksum, terminator).
pub const FRAME_TRAILER_LEN: usize = 2;

/// Minimum length of a response frame that can be validated.
///
/// Address, function, bank, one length-or-payload byte, checksum and terminator.
///
/// # Value: 6 bytes
pub const MIN_RESPONSE_LEN: usize = 6;

/// Size of the buffer handed to a single transport read.
///
/// A register response is 20 bytes; the extra room absorbs line noise
/// without truncating a valid frame.
///
/// # Value: 128 bytes
pub const READ_BUFFER_SIZE: usize = 128;

// ============================================================================
// Device Addressing
// ============================================================================

/// Default bus address of the turnstile controller.
///
/// # Value: 0x82
pub const DEFAULT_DEVICE_ADDRESS: u8 = 0x82;

/// Function code: read status registers.
pub const FUNCTION_READ_REGISTERS: u8 = 0x10;

/// Register bank holding the counters and status flags.
pub const REGISTER_BANK: u8 = 0x10;

// ============================================================================
// Register Layout
// ============================================================================

/// Length of the register payload requested on every poll.
///
/// ```text
/// bytes  0..4   input A counter (u32 LE)
/// bytes  4..8   input B counter (u32 LE)
/// bytes  8..12  failure counter (u32 LE)
/// byte   12     alarm flag      (nonzero = set)
/// byte   13     battery flag    (nonzero = set)
/// ```
///
/// # Value: 14 bytes
pub const REGISTER_PAYLOAD_LEN: usize = 14;

/// Offset of the input A counter inside the register payload.
pub const OFFSET_INPUT_A: usize = 0;

/// Offset of the input B counter inside the register payload.
pub const OFFSET_INPUT_B: usize = 4;

/// Offset of the failure counter inside the register payload.
pub const OFFSET_FAILURE: usize = 8;

/// Offset of the alarm flag inside the register payload.
pub const OFFSET_ALARM: usize = 12;

/// Offset of the battery flag inside the register payload.
pub const OFFSET_BATTERY: usize = 13;

// ============================================================================
// Serial Link
// ============================================================================

/// Default serial port name used when none is configured.
pub const DEFAULT_PORT_NAME: &str = "/dev/ttyUSB0";

/// Default baud rate of the controller link.
///
/// # Value: 9600 baud
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default read timeout of the transport (seconds).
///
/// Deliberately far larger than the poll interval: it is a ceiling for a
/// stuck link, not the normal-path timeout.
///
/// # Value: 600 seconds
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 600;

/// Divisor applied to the read timeout to classify an empty read as transient.
///
/// An empty read that returns in less than `read_timeout / 20` is treated as a
/// line hiccup rather than a real timeout.
///
/// # Value: 20
pub const TRANSIENT_TIMEOUT_DIVISOR: u32 = 20;

// ============================================================================
// Poller Defaults
// ============================================================================

/// Default interval between two register polls (milliseconds).
///
/// # Value: 1000ms
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;

/// Consecutive failed ticks tolerated before the poller escalates.
///
/// The failure that pushes the counter above this value ends the stream.
///
/// # Value: 3
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// Exclusive upper bound for a counter delta reported as a pulse burst.
///
/// # Value: 30
pub const DEFAULT_PULSE_GUARD: u32 = 30;

/// Default grace period for delivering an event to a slow consumer (milliseconds).
///
/// # Value: 3000ms
pub const DEFAULT_SEND_DEADLINE_MS: u64 = 3000;

/// Default capacity of the event channel.
///
/// # Value: 4 events
pub const DEFAULT_EVENT_CAPACITY: usize = 4;
