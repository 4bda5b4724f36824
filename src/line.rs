use heapless::Vec;

/// Reassembles `\r`-terminated SLCAN lines from arbitrarily chunked reads, as
/// delivered by BLE notifications or serial reads on the host side.
///
/// A line longer than `N` bytes is discarded up to its terminator.
#[derive(Debug, Default)]
pub struct LineAssembler<const N: usize> {
    buf: Vec<u8, N>,
    overflowed: bool,
}

impl<const N: usize> LineAssembler<N> {
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            overflowed: false,
        }
    }

    /// Feeds `chunk` and calls `on_line` for every completed line (without its `\r`).
    /// Returns the number of lines that were discarded for being too long.
    pub fn push(&mut self, chunk: &[u8], mut on_line: impl FnMut(&[u8])) -> usize {
        let mut discarded = 0;

        for &byte in chunk {
            if byte == b'\r' {
                if self.overflowed {
                    discarded += 1;
                } else if !self.buf.is_empty() {
                    on_line(self.buf.as_slice());
                }

                self.buf.clear();
                self.overflowed = false;
                continue;
            }

            if !self.overflowed && self.buf.push(byte).is_err() {
                self.overflowed = true;
            }
        }

        discarded
    }

    /// Bytes of the current, unterminated line.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }
}

#[cfg(test)]
mod tests {
    use heapless::Vec;

    use super::LineAssembler;
    use crate::{CanFrame, LINE_BUFFER_SIZE};

    type Lines = Vec<Vec<u8, LINE_BUFFER_SIZE>, 8>;

    fn collect(assembler: &mut LineAssembler<LINE_BUFFER_SIZE>, chunk: &[u8], lines: &mut Lines) -> usize {
        assembler.push(chunk, |line| {
            lines.push(Vec::from_slice(line).unwrap()).unwrap();
        })
    }

    #[test]
    fn lines_split_across_chunks() {
        let mut assembler = LineAssembler::new();
        let mut lines = Lines::new();

        collect(&mut assembler, b"t12C2AB", &mut lines);
        assert!(lines.is_empty());
        assert_eq!(assembler.pending(), b"t12C2AB");

        collect(&mut assembler, b"CD\rt1200\r\rt40C", &mut lines);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].as_slice(), b"t12C2ABCD");
        assert_eq!(lines[1].as_slice(), b"t1200");
        assert_eq!(assembler.pending(), b"t40C");

        let frame = CanFrame::from_slcan(&lines[0]).unwrap();
        assert_eq!(frame.data(), &[0xAB, 0xCD]);
    }

    #[test]
    fn overlong_line_is_discarded() {
        let mut assembler = LineAssembler::new();
        let mut lines = Lines::new();

        let discarded = collect(&mut assembler, &[b'0'; LINE_BUFFER_SIZE + 4], &mut lines);
        assert_eq!(discarded, 0);

        let discarded = collect(&mut assembler, b"\rt1200\r", &mut lines);
        assert_eq!(discarded, 1);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].as_slice(), b"t1200");
    }
}
