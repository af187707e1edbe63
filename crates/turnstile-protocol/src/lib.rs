//! Frame codec for the turnstile controller serial protocol.
//!
//! - [`encode_request`] / [`RequestBuilder`]: outbound command frames
//! - [`validate_response`]: inbound frame validation, yielding the payload
//! - [`decode_registers`]: payload to [`RegisterSnapshot`](turnstile_core::RegisterSnapshot)

pub mod builder;
pub mod frame;
pub mod registers;

pub use builder::RequestBuilder;
pub use frame::{HexDump, checksum, encode_request, validate_response};
pub use registers::{decode_registers, encode_registers};
