use embedded_can::{ExtendedId, StandardId};
use heapless::Vec;

use crate::{LineParseError, MAX_DATA_LENGTH};

/* Encoding */

pub fn to_hex_digit(value: u32) -> u8 {
    const HEX_LUT: &[u8] = "0123456789ABCDEF".as_bytes();

    HEX_LUT[(value & 0xF) as usize]
}

/// Three hex digits of the identifier, masked to 11 bits.
pub fn standard_id_to_hex(id: StandardId) -> [u8; 3] {
    let raw = (id.as_raw() & 0x7FF) as u32;

    [
        to_hex_digit(raw >> 8),
        to_hex_digit(raw >> 4),
        to_hex_digit(raw),
    ]
}

/// Writes two hex digits per byte into `out`, which must hold `2 * data.len()` bytes.
pub fn bytes_to_hex(data: &[u8], out: &mut [u8]) {
    for (byte, pair) in data.iter().zip(out.chunks_exact_mut(2)) {
        pair[0] = to_hex_digit((byte >> 4) as u32);
        pair[1] = to_hex_digit(*byte as u32);
    }
}

/* Decoding */

pub fn hex_digit_to_u8(byte: u8) -> Result<u8, LineParseError> {
    Ok(match byte {
        b'0'..=b'9' => byte - b'0',
        b'a'..=b'f' => byte - b'a' + 10,
        b'A'..=b'F' => byte - b'A' + 10,
        _ => return Err(LineParseError::IllegalHexDigit(byte)),
    })
}

pub fn dec_digit_to_u8(byte: u8) -> Result<u8, LineParseError> {
    Ok(match byte {
        b'0'..=b'9' => byte - b'0',
        _ => return Err(LineParseError::IllegalDecimalDigit(byte)),
    })
}

pub fn u8_from_hex_nibbles(hex_nibbles: &[u8]) -> Result<u8, LineParseError> {
    let msn = hex_digit_to_u8(hex_nibbles[0])?;
    let lsn = hex_digit_to_u8(hex_nibbles[1])?;

    Ok((msn << 4) | lsn)
}

pub fn standard_id_from_hex(hex_nibbles: &[u8; 3]) -> Result<StandardId, LineParseError> {
    let mut value = 0u16;

    for nibble in hex_nibbles.iter() {
        value <<= 4;
        value |= hex_digit_to_u8(*nibble)? as u16;
    }

    StandardId::new(value).ok_or(LineParseError::StandardIdOutOfRange(value))
}

pub fn extended_id_from_hex(hex_nibbles: &[u8; 8]) -> Result<ExtendedId, LineParseError> {
    let mut value = 0u32;

    for nibble in hex_nibbles.iter() {
        value <<= 4;
        value |= hex_digit_to_u8(*nibble)? as u32;
    }

    ExtendedId::new(value).ok_or(LineParseError::ExtendedIdOutOfRange(value))
}

pub fn unpack_data_bytes(
    hex_bytes: &[u8],
    expected_length: usize,
) -> Result<Vec<u8, MAX_DATA_LENGTH>, LineParseError> {
    // Hex digits come in pairs
    if hex_bytes.len() % 2 != 0 {
        return Err(LineParseError::InvalidEncodedDataLength(hex_bytes.len()));
    }

    if hex_bytes.len() / 2 != expected_length {
        return Err(LineParseError::MismatchedDataLength(
            expected_length as u8,
            hex_bytes.len() / 2,
        ));
    }

    let mut buf = Vec::new();

    for chunk in hex_bytes.chunks_exact(2) {
        buf.push(u8_from_hex_nibbles(chunk)?)
            .map_err(|_| LineParseError::InvalidDataLengthCode(expected_length as u8))?;
    }

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use embedded_can::StandardId;

    use super::*;

    #[test]
    fn hex_digits_are_uppercase() {
        assert_eq!(to_hex_digit(0xA), b'A');
        assert_eq!(to_hex_digit(0x1F), b'F');
        assert_eq!(standard_id_to_hex(StandardId::MAX), *b"7FF");
        assert_eq!(standard_id_to_hex(StandardId::new(0x12C).unwrap()), *b"12C");
        assert_eq!(standard_id_to_hex(StandardId::new(0x001).unwrap()), *b"001");
    }

    #[test]
    fn bytes_are_written_as_pairs() {
        let mut out = [0u8; 4];
        bytes_to_hex(&[0xAB, 0x0D], &mut out);
        assert_eq!(&out, b"AB0D");
    }

    #[test]
    fn decoding_accepts_both_cases() {
        assert_eq!(u8_from_hex_nibbles(b"ab"), Ok(0xAB));
        assert_eq!(u8_from_hex_nibbles(b"Ab"), Ok(0xAB));
        assert_eq!(hex_digit_to_u8(b'g'), Err(LineParseError::IllegalHexDigit(b'g')));
        assert_eq!(dec_digit_to_u8(b'A'), Err(LineParseError::IllegalDecimalDigit(b'A')));
        assert_eq!(
            standard_id_from_hex(b"FFF"),
            Err(LineParseError::StandardIdOutOfRange(0xFFF))
        );
        assert_eq!(
            unpack_data_bytes(b"ABC", 1),
            Err(LineParseError::InvalidEncodedDataLength(3))
        );
        assert_eq!(
            unpack_data_bytes(b"ABCD", 1),
            Err(LineParseError::MismatchedDataLength(1, 2))
        );
    }
}
