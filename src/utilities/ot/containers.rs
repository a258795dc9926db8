//! Inputs and outputs of oblivious transfer batches.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::utilities::bit_matrix::BitMatrix;
use crate::utilities::bits::{BitArray, BitArraySlice, BitSequence};
use crate::utilities::ot::ErrorOT;

/// The sender's messages: `invocations` x `options` x `message_bits` bits.
///
/// The cube is flattened into a single array, so message `(i, j)` is stored
/// at bit offset `(i * options + j) * message_bits`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObliviousTransferOptions {
    invocations: usize,
    options: usize,
    message_bits: usize,
    values: BitArray,
}

impl ObliviousTransferOptions {
    /// All messages set to zero.
    #[must_use]
    pub fn new(
        invocations: usize,
        options: usize,
        message_bits: usize,
    ) -> ObliviousTransferOptions {
        ObliviousTransferOptions {
            invocations,
            options,
            message_bits,
            values: BitArray::new(invocations * options * message_bits),
        }
    }

    /// Uniformly random messages.
    pub fn random<R: RngCore + ?Sized>(
        invocations: usize,
        options: usize,
        message_bits: usize,
        rng: &mut R,
    ) -> ObliviousTransferOptions {
        ObliviousTransferOptions {
            invocations,
            options,
            message_bits,
            values: BitArray::random(invocations * options * message_bits, rng),
        }
    }

    /// Wraps `values` as a cube of the given dimensions.
    ///
    /// # Errors
    ///
    /// Will return `Err` if `values` has the wrong length.
    pub fn from_bit_array(
        invocations: usize,
        options: usize,
        message_bits: usize,
        values: BitArray,
    ) -> Result<ObliviousTransferOptions, ErrorOT> {
        if values.len() != invocations * options * message_bits {
            return Err(ErrorOT::Argument(format!(
                "{} bits cannot hold {invocations} invocations of {options} options with {message_bits} bits",
                values.len()
            )));
        }
        Ok(ObliviousTransferOptions {
            invocations,
            options,
            message_bits,
            values,
        })
    }

    #[must_use]
    pub fn invocations(&self) -> usize {
        self.invocations
    }

    #[must_use]
    pub fn options(&self) -> usize {
        self.options
    }

    #[must_use]
    pub fn message_bits(&self) -> usize {
        self.message_bits
    }

    #[must_use]
    pub fn as_bit_array(&self) -> &BitArray {
        &self.values
    }

    fn offset(&self, invocation: usize, option: usize) -> Result<usize, ErrorOT> {
        if invocation >= self.invocations || option >= self.options {
            return Err(ErrorOT::Argument(format!(
                "Message ({invocation}, {option}) outside {} invocations of {} options",
                self.invocations, self.options
            )));
        }
        Ok((invocation * self.options + option) * self.message_bits)
    }

    /// View of the message with index `option` in the given invocation.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the indices are out of range or the messages are empty.
    pub fn message(
        &self,
        invocation: usize,
        option: usize,
    ) -> Result<BitArraySlice<'_, BitArray>, ErrorOT> {
        let offset = self.offset(invocation, option)?;
        self.values.slice(offset, offset + self.message_bits)
    }

    /// # Errors
    ///
    /// Will return `Err` if the indices are out of range or `value` does not
    /// have `message_bits` bits.
    pub fn set_message<S: BitSequence + ?Sized>(
        &mut self,
        invocation: usize,
        option: usize,
        value: &S,
    ) -> Result<(), ErrorOT> {
        let offset = self.offset(invocation, option)?;
        if value.len() != self.message_bits {
            return Err(ErrorOT::Argument(format!(
                "Message must have {} bits, got {}",
                self.message_bits,
                value.len()
            )));
        }
        self.values.write_bits(offset, value)
    }
}

/// The messages obtained by one party: `invocations` x `message_bits` bits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObliviousTransferResult {
    values: BitMatrix,
}

impl ObliviousTransferResult {
    #[must_use]
    pub fn new(invocations: usize, message_bits: usize) -> ObliviousTransferResult {
        ObliviousTransferResult {
            values: BitMatrix::new(invocations, message_bits),
        }
    }

    #[must_use]
    pub fn invocations(&self) -> usize {
        self.values.rows()
    }

    #[must_use]
    pub fn message_bits(&self) -> usize {
        self.values.cols()
    }

    #[must_use]
    pub fn as_matrix(&self) -> &BitMatrix {
        &self.values
    }

    /// # Errors
    ///
    /// Will return `Err` if `invocation` is out of range.
    pub fn invocation_result(
        &self,
        invocation: usize,
    ) -> Result<BitArraySlice<'_, BitArray>, ErrorOT> {
        self.values.row(invocation)
    }

    /// # Errors
    ///
    /// Will return `Err` if `invocation` is out of range or `value` does not
    /// have `message_bits` bits.
    pub fn set_invocation_result<S: BitSequence + ?Sized>(
        &mut self,
        invocation: usize,
        value: &S,
    ) -> Result<(), ErrorOT> {
        self.values.set_row(invocation, value)
    }
}

impl From<BitMatrix> for ObliviousTransferResult {
    fn from(values: BitMatrix) -> ObliviousTransferResult {
        ObliviousTransferResult { values }
    }
}
