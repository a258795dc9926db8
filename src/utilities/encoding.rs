//! Wire encoding of protocol messages.
//!
//! * An integer is written as 4 little-endian bytes.
//! * A bit sequence of length L takes ceil(L/8) bytes, with the unused high
//!   bits of the last byte set to zero.
//! * A `BitMatrix` with R rows and C columns is written as R consecutive row
//!   encodings of C bits each.
//!
//! No dimensions are embedded: both parties know them from the parameters of
//! the call. A message that is too short or too long for the expected
//! dimensions is a protocol error.

use crate::utilities::bit_matrix::BitMatrix;
use crate::utilities::bits::{byte_length, BitArray, BitSequence};
use crate::utilities::ot::ErrorOT;

#[derive(Debug, Default)]
pub struct MessageComposer {
    buffer: Vec<u8>,
}

impl MessageComposer {
    #[must_use]
    pub fn new() -> MessageComposer {
        MessageComposer::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> MessageComposer {
        MessageComposer {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// # Errors
    ///
    /// Will return `Err` if `value` does not fit in 32 bits.
    pub fn write_int(&mut self, value: usize) -> Result<(), ErrorOT> {
        let value = u32::try_from(value)
            .map_err(|_| ErrorOT::Argument(format!("{value} does not fit the wire format")))?;
        self.buffer.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn write_bits<S: BitSequence + ?Sized>(&mut self, bits: &S) {
        self.buffer.extend((0..bits.byte_len()).map(|i| bits.byte(i)));
    }

    pub fn write_matrix(&mut self, matrix: &BitMatrix) {
        let bits = matrix.as_bit_array();
        if matrix.cols() % 8 == 0 {
            // Rows are byte aligned, so the packed array is already the encoding.
            self.buffer.extend_from_slice(bits.as_bytes());
            return;
        }
        for row in 0..matrix.rows() {
            let offset = row * matrix.cols();
            for i in 0..byte_length(matrix.cols()) {
                let count = (matrix.cols() - 8 * i).min(8);
                self.buffer.push(bits.read_byte(offset + 8 * i, count));
            }
        }
    }

    #[must_use]
    pub fn compose(self) -> Vec<u8> {
        self.buffer
    }
}

#[derive(Debug)]
pub struct MessageDecomposer<'a> {
    message: &'a [u8],
    position: usize,
}

impl<'a> MessageDecomposer<'a> {
    #[must_use]
    pub fn new(message: &'a [u8]) -> MessageDecomposer<'a> {
        MessageDecomposer {
            message,
            position: 0,
        }
    }

    /// # Errors
    ///
    /// Will return `Err` if fewer than `count` bytes remain.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], ErrorOT> {
        let remaining = self.message.len() - self.position;
        if remaining < count {
            return Err(ErrorOT::Protocol(format!(
                "Message too short: needed {count} more bytes, {remaining} left"
            )));
        }
        let bytes = &self.message[self.position..self.position + count];
        self.position += count;
        Ok(bytes)
    }

    /// # Errors
    ///
    /// Will return `Err` if fewer than 4 bytes remain.
    pub fn read_int(&mut self) -> Result<usize, ErrorOT> {
        let bytes = self.read_bytes(4)?;
        let value = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        usize::try_from(value)
            .map_err(|_| ErrorOT::Protocol(format!("{value} does not fit this platform")))
    }

    /// # Errors
    ///
    /// Will return `Err` if the message does not hold `len` more bits.
    pub fn read_bits(&mut self, len: usize) -> Result<BitArray, ErrorOT> {
        let bytes = self.read_bytes(byte_length(len))?;
        BitArray::from_bytes(bytes, len)
    }

    /// # Errors
    ///
    /// Will return `Err` if the message does not hold the matrix.
    pub fn read_matrix(&mut self, rows: usize, cols: usize) -> Result<BitMatrix, ErrorOT> {
        let row_bytes = byte_length(cols);
        let bytes = self.read_bytes(rows * row_bytes)?;

        if cols % 8 == 0 {
            return BitMatrix::from_bit_array(rows, cols, BitArray::from_bytes(bytes, rows * cols)?);
        }

        let mut matrix = BitMatrix::new(rows, cols);
        for (row, chunk) in bytes.chunks_exact(row_bytes).enumerate() {
            matrix.set_row(row, &BitArray::from_bytes(chunk, cols)?)?;
        }
        Ok(matrix)
    }

    /// # Errors
    ///
    /// Will return `Err` if bytes remain unread.
    pub fn finish(self) -> Result<(), ErrorOT> {
        let remaining = self.message.len() - self.position;
        if remaining != 0 {
            return Err(ErrorOT::Protocol(format!(
                "Message has {remaining} unexpected trailing bytes"
            )));
        }
        Ok(())
    }
}
