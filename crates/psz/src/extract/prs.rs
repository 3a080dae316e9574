//! Decompresses PRS, the control-bit driven LZ77 variant used underneath [ZPR](super::zpr) files.
//!
//! A PRS stream interleaves control bytes with data. Control bits are consumed low-bit-first, and a fresh control byte
//! is pulled from the input only at the moment the next bit is needed, so the bytes between two control bytes are
//! whatever data the preceding eight bits asked for. Each step is one of:
//!
//! - `1`: copy one literal byte from the input.
//! - `0 1`: long back-reference. Two bytes `b1, b2` give a 13-bit displacement and a 3-bit length. A zero length field
//!   means a third byte holds the length minus 10. `b1 == b2 == 0` marks the end of the stream.
//! - `0 0 x y`: short back-reference, length `2 + 2x + y`, displacement from one following byte.
//!
//! There is no checksum, so a stream that runs out of input early just produces shorter output.

use log::trace;


/// Why [`decompress_prs_with_status`] stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The output reached the target size.
    OutputFull,
    /// The input ran out before the output was full.
    InputExhausted,
    /// A long back-reference of `00 00` was found.
    EndMarker,
}


/// Decompresses a PRS stream into at most `output_size` bytes.
///
/// When `output_size` is `None`, four times the input length is used as the upper bound. The result may be shorter
/// than the target if the input is exhausted first; that is not treated as an error.
pub fn decompress_prs(data: &[u8], output_size: Option<usize>) -> Vec<u8> {
    decompress_prs_with_status(data, output_size).0
}


/// Same as [`decompress_prs`], but also reports how decoding ended.
pub fn decompress_prs_with_status(data: &[u8], output_size: Option<usize>) -> (Vec<u8>, Termination) {
    let target = output_size.unwrap_or(data.len().saturating_mul(4));
    let mut decoder = Decoder::new(data, target);
    let status = decoder.run();

    trace!("PRS: {} -> {} bytes ({status:?})", data.len(), decoder.output.len());
    (decoder.output, status)
}


struct Decoder<'a> {
    input: &'a [u8],
    input_ptr: usize,
    output: Vec<u8>,
    target: usize,

    /// The current control byte, shifted right as bits are consumed.
    ctrl: u8,
    /// How many bits of `ctrl` are still unread. Zero forces a fetch on the next query.
    ctrl_bits: u8,
}


impl<'a> Decoder<'a> {
    fn new(input: &'a [u8], target: usize) -> Self {
        Self {
            input,
            input_ptr: 0,
            // Only reserve what the input could plausibly expand to, the target comes from an untrusted header
            output: Vec::with_capacity(target.min(input.len().saturating_mul(8))),
            target,
            ctrl: 0,
            ctrl_bits: 0,
        }
    }

    fn next_byte(&mut self) -> Option<u8> {
        let byte = *self.input.get(self.input_ptr)?;
        self.input_ptr += 1;
        Some(byte)
    }

    fn input_done(&self) -> bool {
        self.input_ptr >= self.input.len()
    }

    fn output_full(&self) -> bool {
        self.output.len() >= self.target
    }

    /// Reads the next control bit. Once the input is gone, every bit reads as `0`.
    fn control_bit(&mut self) -> bool {
        if self.ctrl_bits == 0 {
            let Some(byte) = self.next_byte() else {
                return false;
            };

            self.ctrl = byte;
            self.ctrl_bits = 8;
        }

        let bit = self.ctrl & 1 != 0;
        self.ctrl >>= 1;
        self.ctrl_bits -= 1;
        bit
    }

    fn run(&mut self) -> Termination {
        loop {
            if self.output_full() {
                return Termination::OutputFull;
            }
            if self.input_done() {
                return Termination::InputExhausted;
            }

            // Literal run
            while self.control_bit() {
                if self.input_done() || self.output_full() {
                    break;
                }
                let byte = self.input[self.input_ptr];
                self.input_ptr += 1;
                self.output.push(byte);
            }

            if self.output_full() {
                return Termination::OutputFull;
            }
            if self.input_done() {
                return Termination::InputExhausted;
            }

            let (offset, length) = if self.control_bit() {
                // Long form: needs both bytes or nothing
                if self.input_ptr + 1 >= self.input.len() {
                    return Termination::InputExhausted;
                }

                let b1 = self.input[self.input_ptr];
                let b2 = self.input[self.input_ptr + 1];
                self.input_ptr += 2;

                if b1 == 0 && b2 == 0 {
                    return Termination::EndMarker;
                }

                let offset = ((b2 as isize) << 5) + ((b1 as isize) >> 3) - 8192;
                let length = match b1 & 7 {
                    0 => match self.next_byte() {
                        Some(extended) => extended as usize + 10,
                        None => return Termination::InputExhausted,
                    },
                    short => short as usize + 2,
                };

                (offset, length)
            } else {
                // Short form: two more control bits for the length, then one byte of offset
                let mut length = 2;
                if self.control_bit() {
                    length += 2;
                }
                if self.control_bit() {
                    length += 1;
                }

                let Some(byte) = self.next_byte() else {
                    return Termination::InputExhausted;
                };

                (byte as isize - 256, length)
            };

            self.copy_back(offset, length);
        }
    }

    /// Copies `length` bytes from `offset` bytes behind the write position, one at a time, so that the copy can read
    /// bytes it has just written. A source before the start of the output yields a zero byte.
    fn copy_back(&mut self, offset: isize, length: usize) {
        let start = self.output.len() as isize + offset;

        for i in 0..length as isize {
            if self.output_full() {
                break;
            }

            let src = start + i;
            let byte = if src >= 0 && (src as usize) < self.output.len() {
                self.output[src as usize]
            } else {
                0
            };

            self.output.push(byte);
        }
    }
}
