use crate::frame::encode_request;
use bytes::Bytes;
use turnstile_core::constants::{FUNCTION_READ_REGISTERS, REGISTER_BANK, REGISTER_PAYLOAD_LEN};

/// Builder for request frames with a fluent API
///
/// The declared length defaults to the payload size; reads override it with
/// the number of bytes requested.
///
/// # Example
/// ```
/// use turnstile_protocol::RequestBuilder;
///
/// let frame = RequestBuilder::new(0x82, 0x10)
///     .bank(0x10)
///     .declared_length(14)
///     .build();
/// assert_eq!(frame.as_ref(), &[0x82, 0x10, 0x10, 0x0E, 0x74, 0xFC]);
/// ```
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    address: u8,
    function: u8,
    bank: u8,
    payload: Vec<u8>,
    declared_length: Option<u8>,
}

impl RequestBuilder {
    /// Create a new builder for the given device address and function code
    pub fn new(address: u8, function: u8) -> Self {
        RequestBuilder {
            address,
            function,
            bank: 0,
            payload: Vec::new(),
            declared_length: None,
        }
    }

    /// Standard read of the 14-byte status register block
    ///
    /// # Example
    /// ```
    /// use turnstile_protocol::{RequestBuilder, encode_request};
    ///
    /// let frame = RequestBuilder::read_registers(0x82).build();
    /// assert_eq!(frame, encode_request(0x82, 0x10, 0x10, &[], 14));
    /// ```
    pub fn read_registers(address: u8) -> Self {
        Self::new(address, FUNCTION_READ_REGISTERS)
            .bank(REGISTER_BANK)
            .declared_length(REGISTER_PAYLOAD_LEN as u8)
    }

    /// Select the register bank
    pub fn bank(mut self, bank: u8) -> Self {
        self.bank = bank;
        self
    }

    /// Set the payload bytes
    pub fn payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Override the length byte written into the header
    pub fn declared_length(mut self, length: u8) -> Self {
        self.declared_length = Some(length);
        self
    }

    /// Build the frame
    ///
    /// Without an explicit declared length the payload size is used,
    /// saturating at 255.
    pub fn build(self) -> Bytes {
        let length = self
            .declared_length
            .unwrap_or_else(|| u8::try_from(self.payload.len()).unwrap_or(u8::MAX));
        encode_request(self.address, self.function, self.bank, &self.payload, length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{checksum, validate_response};

    #[test]
    fn test_read_registers_request() {
        let frame = RequestBuilder::read_registers(0x82).build();
        assert_eq!(frame.as_ref(), &[0x82, 0x10, 0x10, 0x0E, 0x74, 0xFC]);
    }

    #[test]
    fn test_default_length_follows_payload() {
        let frame = RequestBuilder::new(0x05, 0x20)
            .bank(0x01)
            .payload(vec![0xAA, 0xBB, 0xCC])
            .build();

        assert_eq!(&frame[..4], &[0x05, 0x20, 0x01, 0x03]);
        assert_eq!(validate_response(&frame).unwrap(), &[0xAA, 0xBB, 0xCC]);
    }

    #[test]
    fn test_declared_length_overrides_payload() {
        let frame = RequestBuilder::new(0x05, 0x20)
            .payload([0x01])
            .declared_length(40)
            .build();

        assert_eq!(frame[3], 40);
        assert_eq!(frame[5], checksum(&frame[..5]));
    }

    #[test]
    fn test_oversized_payload_saturates_length() {
        let frame = RequestBuilder::new(0x05, 0x20).payload(vec![0u8; 300]).build();
        assert_eq!(frame[3], u8::MAX);
        assert_eq!(frame.len(), 4 + 300 + 2);
    }
}
