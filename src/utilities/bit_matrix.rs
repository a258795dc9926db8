//! Row-major matrices over GF(2).
//!
//! A matrix with `rows` rows and `cols` columns is stored as a single
//! [`BitArray`] of `rows * cols` bits, row after row. Reading a row is an O(1)
//! view into that array, while reading a column has to collect one bit from
//! every row and returns a fresh array.

use serde::{Deserialize, Serialize};

use crate::utilities::bits::{Bit, BitArray, BitArraySlice, BitSequence};
use crate::utilities::ot::ErrorOT;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitMatrix {
    rows: usize,
    cols: usize,
    bits: BitArray,
}

impl BitMatrix {
    /// The zero matrix.
    #[must_use]
    pub fn new(rows: usize, cols: usize) -> BitMatrix {
        BitMatrix {
            rows,
            cols,
            bits: BitArray::new(rows * cols),
        }
    }

    /// Wraps `bits`, read row by row.
    ///
    /// # Errors
    ///
    /// Will return `Err` if `bits` does not have exactly `rows * cols` bits.
    pub fn from_bit_array(rows: usize, cols: usize, bits: BitArray) -> Result<BitMatrix, ErrorOT> {
        if bits.len() != rows * cols {
            return Err(ErrorOT::Argument(format!(
                "{} bits cannot form a {rows}x{cols} matrix",
                bits.len()
            )));
        }
        Ok(BitMatrix { rows, cols, bits })
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[must_use]
    pub fn as_bit_array(&self) -> &BitArray {
        &self.bits
    }

    #[must_use]
    pub fn into_bit_array(self) -> BitArray {
        self.bits
    }

    /// # Panics
    ///
    /// Will panic if the position is outside the matrix.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Bit {
        assert!(row < self.rows && col < self.cols, "Position ({row}, {col}) outside the matrix");
        self.bits.bit(row * self.cols + col)
    }

    /// # Panics
    ///
    /// Will panic if the position is outside the matrix.
    pub fn set(&mut self, row: usize, col: usize, bit: Bit) {
        assert!(row < self.rows && col < self.cols, "Position ({row}, {col}) outside the matrix");
        self.bits.set(row * self.cols + col, bit);
    }

    /// View of the `row`-th row.
    ///
    /// # Errors
    ///
    /// Will return `Err` if `row` is out of range or the matrix has no columns.
    pub fn row(&self, row: usize) -> Result<BitArraySlice<'_, BitArray>, ErrorOT> {
        if row >= self.rows {
            return Err(ErrorOT::Argument(format!(
                "Row {row} out of range for {} rows",
                self.rows
            )));
        }
        self.bits.slice(row * self.cols, (row + 1) * self.cols)
    }

    /// # Errors
    ///
    /// Will return `Err` if `row` is out of range or `values` does not have `cols` bits.
    pub fn set_row<S: BitSequence + ?Sized>(
        &mut self,
        row: usize,
        values: &S,
    ) -> Result<(), ErrorOT> {
        if row >= self.rows {
            return Err(ErrorOT::Argument(format!(
                "Row {row} out of range for {} rows",
                self.rows
            )));
        }
        if values.len() != self.cols {
            return Err(ErrorOT::Argument(format!(
                "Row must have {} bits, got {}",
                self.cols,
                values.len()
            )));
        }
        self.bits.write_bits(row * self.cols, values)
    }

    /// Copies the `col`-th column into a new array.
    ///
    /// # Errors
    ///
    /// Will return `Err` if `col` is out of range.
    pub fn column(&self, col: usize) -> Result<BitArray, ErrorOT> {
        if col >= self.cols {
            return Err(ErrorOT::Argument(format!(
                "Column {col} out of range for {} columns",
                self.cols
            )));
        }
        Ok((0..self.rows)
            .map(|row| self.bits.bit(row * self.cols + col))
            .collect())
    }

    /// # Errors
    ///
    /// Will return `Err` if `col` is out of range or `values` does not have `rows` bits.
    pub fn set_column<S: BitSequence + ?Sized>(
        &mut self,
        col: usize,
        values: &S,
    ) -> Result<(), ErrorOT> {
        if col >= self.cols {
            return Err(ErrorOT::Argument(format!(
                "Column {col} out of range for {} columns",
                self.cols
            )));
        }
        if values.len() != self.rows {
            return Err(ErrorOT::Argument(format!(
                "Column must have {} bits, got {}",
                self.rows,
                values.len()
            )));
        }
        for (row, bit) in values.bits().enumerate() {
            self.bits.set(row * self.cols + col, bit);
        }
        Ok(())
    }

    /// The transposed matrix, with `cols` rows and `rows` columns.
    #[must_use]
    pub fn transpose(&self) -> BitMatrix {
        let mut output = BitMatrix::new(self.cols, self.rows);
        for row in 0..self.rows {
            for col in 0..self.cols {
                output
                    .bits
                    .set(col * self.rows + row, self.bits.bit(row * self.cols + col));
            }
        }
        output
    }
}
