use embedded_can::{Frame, Id};
use heapless::Vec;

use crate::{
    codec::{bytes_to_hex, standard_id_to_hex, to_hex_digit},
    LINE_BUFFER_SIZE, MAX_DATA_LENGTH,
};

/// One encoded SLCAN line, including its trailing `\r`.
pub type SlcanLine = Vec<u8, LINE_BUFFER_SIZE>;

/// Reasons a frame could not be turned into an SLCAN line
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    #[error("Extended (29-bit) frames are not forwarded")]
    ExtendedFrame,
    #[error("Remote frames are not forwarded")]
    RemoteFrame,
    #[error("Line needs {needed} bytes but the buffer holds {capacity}")]
    BufferTooSmall { needed: usize, capacity: usize },
}

/// Number of characters of the line for a frame carrying `dlc` bytes.
pub const fn encoded_len(dlc: usize) -> usize {
    1 + 3 + 1 + 2 * dlc + 1
}

/// Writes `t<iii><l><dd..>\r` for a standard data frame into `out` and returns
/// the number of line bytes. A NUL is appended when `out` has a spare byte.
///
/// Nothing is written when the frame is rejected.
pub fn encode_into<F: Frame>(frame: &F, out: &mut [u8]) -> Result<usize, EncodeError> {
    let id = match frame.id() {
        Id::Standard(id) => id,
        Id::Extended(_) => return Err(EncodeError::ExtendedFrame),
    };

    if frame.is_remote_frame() {
        return Err(EncodeError::RemoteFrame);
    }

    let data = frame.data();
    let dlc = (frame.dlc() & 0xF).min(MAX_DATA_LENGTH).min(data.len());
    let needed = encoded_len(dlc);

    if out.len() < needed {
        return Err(EncodeError::BufferTooSmall {
            needed,
            capacity: out.len(),
        });
    }

    out[0] = b't';
    out[1..4].copy_from_slice(&standard_id_to_hex(id));
    out[4] = to_hex_digit(dlc as u32);
    bytes_to_hex(&data[..dlc], &mut out[5..5 + 2 * dlc]);
    out[needed - 1] = b'\r';

    if let Some(terminator) = out.get_mut(needed) {
        *terminator = 0;
    }

    Ok(needed)
}

/// Encodes a frame into an owned, fixed-capacity line.
pub fn encode<F: Frame>(frame: &F) -> Result<SlcanLine, EncodeError> {
    let mut buf = [0u8; LINE_BUFFER_SIZE];
    let len = encode_into(frame, &mut buf)?;

    // `len` never exceeds the buffer it was written to
    Vec::from_slice(&buf[..len]).map_err(|_| EncodeError::BufferTooSmall {
        needed: len,
        capacity: LINE_BUFFER_SIZE,
    })
}
