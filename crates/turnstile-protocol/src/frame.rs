//! Byte-level framing of the controller wire protocol.
//!
//! # Wire Format
//!
//! ```text
//! [ADDRESS][FUNCTION][BANK][LENGTH][PAYLOAD ...][CHECKSUM][0xFC]
//! ```
//!
//! The checksum is the two's complement of the XOR-fold of every byte that
//! precedes it. The terminator is always the last byte.
//!
//! # Protocol Flow Example
//!
//! **1. Host requests the 14-byte register block**
//! ```text
//! 82 10 10 0E 74 FC
//! ^^ ^^ ^^ ^^ ^^ ^^
//! |  |  |  |  |  terminator
//! |  |  |  |  checksum = -(82 ^ 10 ^ 10 ^ 0E)
//! |  |  |  requested length
//! |  |  bank
//! |  function (read registers)
//! address
//! ```
//!
//! **2. Controller answers with header, payload and trailer**
//! ```text
//! 82 10 10 0E | 01 00 00 00 02 00 00 00 03 00 00 00 01 00 | CS FC
//!  header       payload (14 bytes)                          trailer
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;
use turnstile_core::{
    FramingError,
    constants::{FRAME_TERMINATOR, FRAME_TRAILER_LEN, MIN_RESPONSE_LEN, RESPONSE_HEADER_LEN},
};

/// Compute the frame checksum over `bytes`.
///
/// XOR-folds all bytes, then negates the result in 8-bit two's complement.
///
/// # Examples
///
/// ```
/// use turnstile_protocol::checksum;
///
/// assert_eq!(checksum(&[]), 0x00);
/// assert_eq!(checksum(&[0x01]), 0xFF);
/// assert_eq!(checksum(&[0x82, 0x10, 0x10, 0x0E]), 0x74);
/// ```
#[must_use]
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc ^ b).wrapping_neg()
}

/// Encode a request frame.
///
/// Builds `[address, function, bank, declared_length, payload...]`, then
/// appends the checksum and the terminator. `declared_length` is written as
/// given; for a read it is the number of bytes requested, not the payload size.
///
/// # Examples
///
/// ```
/// use turnstile_protocol::encode_request;
///
/// let frame = encode_request(0x82, 0x10, 0x10, &[], 14);
/// assert_eq!(frame.as_ref(), &[0x82, 0x10, 0x10, 0x0E, 0x74, 0xFC]);
/// ```
#[must_use]
pub fn encode_request(
    address: u8,
    function: u8,
    bank: u8,
    payload: &[u8],
    declared_length: u8,
) -> Bytes {
    let mut buf =
        BytesMut::with_capacity(RESPONSE_HEADER_LEN + payload.len() + FRAME_TRAILER_LEN);
    buf.put_u8(address);
    buf.put_u8(function);
    buf.put_u8(bank);
    buf.put_u8(declared_length);
    buf.put_slice(payload);

    let sum = checksum(&buf);
    buf.put_u8(sum);
    buf.put_u8(FRAME_TERMINATOR);

    buf.freeze()
}

/// Validate a response frame and return its payload.
///
/// The payload is the slice between the 4-byte header and the
/// checksum/terminator trailer.
///
/// # Errors
///
/// - [`FramingError::TooShort`] if the frame is shorter than 6 bytes
/// - [`FramingError::BadTerminator`] if the last byte is not 0xFC
/// - [`FramingError::ChecksumMismatch`] if the checksum byte does not match
///
/// # Examples
///
/// ```
/// use turnstile_protocol::{encode_request, validate_response};
///
/// let frame = encode_request(0x82, 0x10, 0x10, &[0xAA, 0xBB], 2);
/// assert_eq!(validate_response(&frame).unwrap(), &[0xAA, 0xBB]);
///
/// assert!(validate_response(&[]).is_err());
/// ```
pub fn validate_response(frame: &[u8]) -> Result<&[u8], FramingError> {
    let len = frame.len();
    if len < MIN_RESPONSE_LEN {
        return Err(FramingError::TooShort { len });
    }

    let found = frame[len - 1];
    if found != FRAME_TERMINATOR {
        return Err(FramingError::BadTerminator { found });
    }

    let expected = checksum(&frame[..len - FRAME_TRAILER_LEN]);
    let actual = frame[len - FRAME_TRAILER_LEN];
    if expected != actual {
        return Err(FramingError::ChecksumMismatch { expected, actual });
    }

    Ok(&frame[RESPONSE_HEADER_LEN..len - FRAME_TRAILER_LEN])
}

/// Hex rendering of raw frame bytes for logs.
///
/// # Examples
///
/// ```
/// use turnstile_protocol::HexDump;
///
/// assert_eq!(HexDump(&[0x82, 0x10, 0xFC]).to_string(), "82 10 FC");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct HexDump<'a>(pub &'a [u8]);

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn reference_checksum(bytes: &[u8]) -> u8 {
        let mut acc: u8 = 0;
        for b in bytes {
            acc ^= *b;
        }
        (0u16.wrapping_sub(u16::from(acc)) & 0xFF) as u8
    }

    #[rstest]
    #[case(&[], 0x00)]
    #[case(&[0x00], 0x00)]
    #[case(&[0x01], 0xFF)]
    #[case(&[0x80], 0x80)]
    #[case(&[0xFF, 0xFF], 0x00)]
    #[case(&[0x82, 0x10, 0x10, 0x0E], 0x74)]
    fn test_checksum_known_values(#[case] bytes: &[u8], #[case] expected: u8) {
        assert_eq!(checksum(bytes), expected);
        assert_eq!(reference_checksum(bytes), expected);
    }

    #[test]
    fn test_encode_read_request() {
        let frame = encode_request(0x82, 0x10, 0x10, &[], 14);
        assert_eq!(frame.as_ref(), &[0x82, 0x10, 0x10, 0x0E, 0x74, 0xFC]);
    }

    #[test]
    fn test_encode_request_with_payload() {
        let frame = encode_request(0x01, 0x20, 0x03, &[0x0A, 0x0B], 2);

        assert_eq!(frame.len(), 8);
        assert_eq!(&frame[..6], &[0x01, 0x20, 0x03, 0x02, 0x0A, 0x0B]);
        assert_eq!(frame[6], checksum(&frame[..6]));
        assert_eq!(frame[7], FRAME_TERMINATOR);
    }

    #[test]
    fn test_encoded_frame_validates() {
        let frame = encode_request(0x82, 0x10, 0x10, &[1, 2, 3, 4], 4);
        assert_eq!(validate_response(&frame).unwrap(), &[1, 2, 3, 4]);
    }

    #[rstest]
    #[case(&[])]
    #[case(&[0xFC])]
    #[case(&[0x82, 0x10, 0x10, 0x74, 0xFC])]
    fn test_validate_too_short(#[case] frame: &[u8]) {
        assert_eq!(
            validate_response(frame),
            Err(FramingError::TooShort { len: frame.len() })
        );
    }

    #[test]
    fn test_validate_bad_terminator() {
        let mut frame = encode_request(0x82, 0x10, 0x10, &[0x01], 1).to_vec();
        let last = frame.len() - 1;
        frame[last] = 0x03;

        assert_eq!(
            validate_response(&frame),
            Err(FramingError::BadTerminator { found: 0x03 })
        );
    }

    #[test]
    fn test_validate_checksum_mismatch() {
        let mut frame = encode_request(0x82, 0x10, 0x10, &[0x01], 1).to_vec();
        let expected = frame[frame.len() - 2];
        frame[4] ^= 0x40;

        let result = validate_response(&frame);
        assert!(matches!(
            result,
            Err(FramingError::ChecksumMismatch { actual, .. }) if actual == expected
        ));
    }

    #[test]
    fn test_validate_minimum_frame_has_empty_payload() {
        // Header of four bytes plus trailer: nothing left for the payload.
        let frame = encode_request(0x82, 0x10, 0x10, &[], 0);
        assert_eq!(validate_response(&frame).unwrap(), &[] as &[u8]);
    }

    #[test]
    fn test_terminator_checked_before_checksum() {
        // Both terminator and checksum are wrong; terminator wins.
        let frame = [0x82, 0x10, 0x10, 0x0E, 0x00, 0x00];
        assert_eq!(
            validate_response(&frame),
            Err(FramingError::BadTerminator { found: 0x00 })
        );
    }

    #[test]
    fn test_hex_dump() {
        assert_eq!(HexDump(&[]).to_string(), "");
        assert_eq!(HexDump(&[0x0A]).to_string(), "0A");
        assert_eq!(
            HexDump(&[0x82, 0x10, 0x10, 0x0E, 0x74, 0xFC]).to_string(),
            "82 10 10 0E 74 FC"
        );
    }
}
