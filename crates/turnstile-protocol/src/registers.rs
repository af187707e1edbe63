//! Decoding of the status register block.

use turnstile_core::{
    FramingError, RegisterSnapshot,
    constants::{
        OFFSET_ALARM, OFFSET_BATTERY, OFFSET_FAILURE, OFFSET_INPUT_A, OFFSET_INPUT_B,
        REGISTER_PAYLOAD_LEN,
    },
};

/// Decode a register payload into a [`RegisterSnapshot`].
///
/// Counters are little-endian `u32`; flags are set when their byte is nonzero.
/// Bytes past the 14-byte block are ignored.
///
/// # Errors
///
/// Returns [`FramingError::PayloadTooShort`] if fewer than 14 bytes are given.
///
/// # Examples
///
/// ```
/// use turnstile_protocol::decode_registers;
///
/// let payload = [1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0, 0x01, 0x00];
/// let snapshot = decode_registers(&payload).unwrap();
///
/// assert_eq!(snapshot.input_a, 1);
/// assert_eq!(snapshot.failure, 3);
/// assert!(snapshot.alarm);
/// assert!(!snapshot.battery_flag);
/// ```
pub fn decode_registers(payload: &[u8]) -> Result<RegisterSnapshot, FramingError> {
    if payload.len() < REGISTER_PAYLOAD_LEN {
        return Err(FramingError::PayloadTooShort {
            expected: REGISTER_PAYLOAD_LEN,
            actual: payload.len(),
        });
    }

    Ok(RegisterSnapshot {
        input_a: read_u32_le(payload, OFFSET_INPUT_A),
        input_b: read_u32_le(payload, OFFSET_INPUT_B),
        failure: read_u32_le(payload, OFFSET_FAILURE),
        alarm: payload[OFFSET_ALARM] > 0,
        battery_flag: payload[OFFSET_BATTERY] > 0,
    })
}

/// Encode a snapshot back into its 14-byte wire layout.
///
/// Flags are written as `0x01` / `0x00`. Used to script device responses.
#[must_use]
pub fn encode_registers(snapshot: &RegisterSnapshot) -> [u8; REGISTER_PAYLOAD_LEN] {
    let mut payload = [0u8; REGISTER_PAYLOAD_LEN];
    payload[OFFSET_INPUT_A..OFFSET_INPUT_A + 4].copy_from_slice(&snapshot.input_a.to_le_bytes());
    payload[OFFSET_INPUT_B..OFFSET_INPUT_B + 4].copy_from_slice(&snapshot.input_b.to_le_bytes());
    payload[OFFSET_FAILURE..OFFSET_FAILURE + 4].copy_from_slice(&snapshot.failure.to_le_bytes());
    payload[OFFSET_ALARM] = u8::from(snapshot.alarm);
    payload[OFFSET_BATTERY] = u8::from(snapshot.battery_flag);
    payload
}

// Callers check the payload length first.
fn read_u32_le(payload: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&payload[offset..offset + 4]);
    u32::from_le_bytes(word)
}
