use core::fmt;

use embedded_can::Id;

use crate::{
    codec::{dec_digit_to_u8, extended_id_from_hex, standard_id_from_hex, unpack_data_bytes},
    MAX_DATA_LENGTH,
};

/// Represents a classic CAN frame which supports RTR (Remote Transmission Request).
///
/// The DLC can be up to 8 bytes, and the data if absent means that it is an
/// RTR frame.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CanFrame {
    #[cfg_attr(feature = "defmt", defmt(Debug2Format))]
    id: Id,
    dlc: usize,
    data: Option<[u8; MAX_DATA_LENGTH]>,
}

impl CanFrame {
    /// Creates a new data frame. `data` must have a length in the range 0..=8
    /// or else `None` will be returned instead.
    pub fn new_data(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        if data.len() > MAX_DATA_LENGTH {
            return None;
        }

        let mut copy = [0u8; MAX_DATA_LENGTH];
        copy[..data.len()].copy_from_slice(data);

        Some(Self {
            id: id.into(),
            dlc: data.len(),
            data: Some(copy),
        })
    }

    /// Creates a new remote frame. `dlc` must be in the range 0..=8 or else
    /// `None` will be returned instead.
    pub fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        if dlc > MAX_DATA_LENGTH {
            return None;
        }

        Some(Self {
            id: id.into(),
            dlc,
            data: None,
        })
    }

    /// Parses one SLCAN line (`t` or `T`), with or without its trailing `\r`.
    pub fn from_slcan(line: &[u8]) -> Result<Self, LineParseError> {
        let line = line.strip_suffix(b"\r").unwrap_or(line);

        let Some((&kind, rest)) = line.split_first() else {
            return Err(LineParseError::Empty);
        };

        let id_len = match kind {
            b't' => 3,
            b'T' => 8,
            _ => return Err(LineParseError::UnsupportedLineKind(kind)),
        };

        if rest.len() < id_len + 1 {
            return Err(LineParseError::NotEnoughBytes(line.len()));
        }

        let (id_hex, rest) = rest.split_at(id_len);
        let id = match kind {
            b't' => Id::Standard(standard_id_from_hex(
                id_hex
                    .try_into()
                    .map_err(|_| LineParseError::NotEnoughBytes(line.len()))?,
            )?),
            _ => Id::Extended(extended_id_from_hex(
                id_hex
                    .try_into()
                    .map_err(|_| LineParseError::NotEnoughBytes(line.len()))?,
            )?),
        };

        let dlc = dec_digit_to_u8(rest[0])?;
        if dlc as usize > MAX_DATA_LENGTH {
            return Err(LineParseError::InvalidDataLengthCode(dlc));
        }

        let data = unpack_data_bytes(&rest[1..], dlc as usize)?;

        Self::new_data(id, &data).ok_or(LineParseError::InvalidDataLengthCode(dlc))
    }

    /// Gets the message ID of the frame
    pub fn id(&self) -> Id {
        self.id
    }

    /// Gets the DLC (Data Length Code) of the frame
    pub fn dlc(&self) -> usize {
        self.dlc
    }

    /// Gets the data associated with the frame. Will return an empty slice
    /// for RTR frames.
    pub fn data(&self) -> &[u8] {
        self.data.as_ref().map(|d| &d[..self.dlc]).unwrap_or(&[])
    }

    pub fn is_remote(&self) -> bool {
        self.data.is_none()
    }
}

impl embedded_can::Frame for CanFrame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        Self::new_data(id, data)
    }

    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        Self::new_remote(id, dlc)
    }

    fn is_extended(&self) -> bool {
        matches!(self.id, Id::Extended(_))
    }

    fn is_remote_frame(&self) -> bool {
        self.is_remote()
    }

    fn id(&self) -> Id {
        self.id
    }

    fn dlc(&self) -> usize {
        self.dlc
    }

    fn data(&self) -> &[u8] {
        CanFrame::data(self)
    }
}

/// candump notation: `0000012C#AB CD`
impl fmt::Display for CanFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raw = match self.id {
            Id::Standard(id) => id.as_raw() as u32,
            Id::Extended(id) => id.as_raw(),
        };

        write!(f, "{raw:08X}#")?;

        if self.is_remote() {
            return write!(f, "R{}", self.dlc);
        }

        for (i, byte) in self.data().iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02X}")?;
        }

        Ok(())
    }
}

/// Various errors which can arise while parsing an SLCAN line
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineParseError {
    #[error("Tried to parse an empty line")]
    Empty,
    #[error("Received a line with an unsupported specifier ({0:?})")]
    UnsupportedLineKind(u8),
    #[error("Received a line with fewer bytes than a frame header needs ({0:?})")]
    NotEnoughBytes(usize),
    #[error("Tried to decode a hex digit but it was out of range ({0:?})")]
    IllegalHexDigit(u8),
    #[error("Received a CAN Standard ID ({0:?}) that was out of the valid range (0..=0x7FF)")]
    StandardIdOutOfRange(u16),
    #[error("Received a CAN Extended ID ({0:?}) that was out of the valid range (0..=0x1FFFFFFF)")]
    ExtendedIdOutOfRange(u32),
    #[error("Tried to decode a decimal digit but it was out of range ({0:?})")]
    IllegalDecimalDigit(u8),
    #[error("Received a DLC ({0:?}) that was out of the valid range (0..=8)")]
    InvalidDataLengthCode(u8),
    #[error("Received encoded data with a length ({0:?}) that was not a multiple of 2")]
    InvalidEncodedDataLength(usize),
    #[error("Received a frame with expected length ({0:?}) but ({1:?}) bytes of data")]
    MismatchedDataLength(u8, usize),
}

#[cfg(test)]
mod tests {
    use core::fmt::Write;

    use embedded_can::{ExtendedId, StandardId};

    use crate::{CanFrame, LineParseError};

    #[test]
    fn line_parse_errors() {
        assert_eq!(CanFrame::from_slcan(b""), Err(LineParseError::Empty));
        assert_eq!(CanFrame::from_slcan(b"\r"), Err(LineParseError::Empty));

        assert_eq!(
            CanFrame::from_slcan(b"r1230"),
            Err(LineParseError::UnsupportedLineKind(b'r'))
        );

        assert_eq!(
            CanFrame::from_slcan(b"t12"),
            Err(LineParseError::NotEnoughBytes(3))
        );

        assert_eq!(
            CanFrame::from_slcan(b"tFFG0"),
            Err(LineParseError::IllegalHexDigit(b'G'))
        );

        assert_eq!(
            CanFrame::from_slcan(b"tFFF0"),
            Err(LineParseError::StandardIdOutOfRange(0xFFF))
        );

        assert_eq!(
            CanFrame::from_slcan(b"T2FFFFFFF0"),
            Err(LineParseError::ExtendedIdOutOfRange(0x2FFFFFFF))
        );

        assert_eq!(
            CanFrame::from_slcan(b"t0009"),
            Err(LineParseError::InvalidDataLengthCode(9))
        );

        assert_eq!(
            CanFrame::from_slcan(b"t000A"),
            Err(LineParseError::IllegalDecimalDigit(b'A'))
        );

        assert_eq!(
            CanFrame::from_slcan(b"t0002AB"),
            Err(LineParseError::MismatchedDataLength(2, 1))
        );
    }

    #[test]
    fn parse_standard_and_extended_lines() {
        assert_eq!(
            CanFrame::from_slcan(b"t12C2ABCD\r"),
            Ok(CanFrame::new_data(StandardId::new(0x12C).unwrap(), &[0xAB, 0xCD]).unwrap())
        );

        assert_eq!(
            CanFrame::from_slcan(b"t7ff0"),
            Ok(CanFrame::new_data(StandardId::MAX, &[]).unwrap())
        );

        assert_eq!(
            CanFrame::from_slcan(b"T1FFFFFFF80001020304050607"),
            Ok(CanFrame::new_data(ExtendedId::MAX, &[0, 1, 2, 3, 4, 5, 6, 7]).unwrap())
        );
    }

    #[test]
    fn frame_constructors_enforce_dlc() {
        assert!(CanFrame::new_data(StandardId::ZERO, &[0; 9]).is_none());
        assert!(CanFrame::new_remote(StandardId::ZERO, 9).is_none());

        let remote = CanFrame::new_remote(StandardId::ZERO, 4).unwrap();
        assert!(remote.is_remote());
        assert_eq!(remote.dlc(), 4);
        assert!(remote.data().is_empty());
    }

    #[test]
    fn candump_rendering() {
        let mut out = heapless::String::<64>::new();

        let frame = CanFrame::new_data(StandardId::new(300).unwrap(), &[0xAB, 0xCD]).unwrap();
        write!(out, "{frame}").unwrap();
        assert_eq!(out.as_str(), "0000012C#AB CD");

        out.clear();
        let frame = CanFrame::new_remote(ExtendedId::MAX, 2).unwrap();
        write!(out, "{frame}").unwrap();
        assert_eq!(out.as_str(), "1FFFFFFF#R2");
    }
}
