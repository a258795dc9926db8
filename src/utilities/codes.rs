//! Binary codes used to hide the selection index during OT extension.
//!
//! A code maps every message in `0..=maximum_message` to a codeword of
//! `code_length` bits such that any two distinct codewords differ in at least
//! `distance` positions. The extension engine masks each option with the
//! codeword of its index, so a large distance means that the keys for
//! options which were not selected depend on many unknown bits.
//!
//! Following KOS (<https://eprint.iacr.org/2015/546.pdf>), the 1-out-of-N
//! variant uses a Walsh-Hadamard code, while the 1-out-of-2 case can use the
//! repetition code, which recovers the original IKNP protocol.

use serde::{Deserialize, Serialize};

use crate::utilities::bits::{Bit, BitArray};
use crate::utilities::ot::ErrorOT;

pub trait BinaryCode {
    fn code_length(&self) -> usize;

    /// Minimum Hamming distance between two distinct codewords.
    fn distance(&self) -> usize;

    fn maximum_message(&self) -> usize;

    /// # Errors
    ///
    /// Will return `Err` if `message` exceeds [`maximum_message`](BinaryCode::maximum_message).
    fn encode(&self, message: usize) -> Result<BitArray, ErrorOT>;
}

/// Longest supported Walsh-Hadamard code: codeword indices must fit 32 bits.
pub const MAX_WALSH_HADAMARD_LENGTH: u64 = 1 << 32;

/// The Walsh-Hadamard code: bit `i` of the codeword for `x` is the parity of `x & i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalshHadamardCode {
    code_length: usize,
}

impl WalshHadamardCode {
    /// # Errors
    ///
    /// Will return `Err` if `code_length` is not a power of two or exceeds
    /// [`MAX_WALSH_HADAMARD_LENGTH`].
    pub fn new(code_length: usize) -> Result<WalshHadamardCode, ErrorOT> {
        if !code_length.is_power_of_two() {
            return Err(ErrorOT::Argument(format!(
                "Walsh-Hadamard code length must be a power of two, got {code_length}"
            )));
        }
        if code_length as u64 > MAX_WALSH_HADAMARD_LENGTH {
            return Err(ErrorOT::Argument(format!(
                "Walsh-Hadamard code length {code_length} exceeds {MAX_WALSH_HADAMARD_LENGTH}"
            )));
        }
        Ok(WalshHadamardCode { code_length })
    }

    /// The shortest Walsh-Hadamard code with distance at least `distance`.
    ///
    /// # Errors
    ///
    /// Will return `Err` if such a code would be longer than
    /// [`MAX_WALSH_HADAMARD_LENGTH`].
    pub fn with_distance(distance: usize) -> Result<WalshHadamardCode, ErrorOT> {
        let code_length = distance
            .checked_mul(2)
            .and_then(|length| length.max(1).checked_next_power_of_two())
            .ok_or_else(|| {
                ErrorOT::Argument(format!("No Walsh-Hadamard code has distance {distance}"))
            })?;
        WalshHadamardCode::new(code_length)
    }

    /// Parity of the number of set bits of `value`.
    #[must_use]
    pub fn parity(value: u32) -> Bit {
        let mut value = value;
        value ^= value >> 16;
        value ^= value >> 8;
        value ^= value >> 4;
        value ^= value >> 2;
        value ^= value >> 1;
        Bit::from((value & 1) as u8)
    }
}

impl BinaryCode for WalshHadamardCode {
    fn code_length(&self) -> usize {
        self.code_length
    }

    fn distance(&self) -> usize {
        self.code_length / 2
    }

    fn maximum_message(&self) -> usize {
        self.code_length - 1
    }

    fn encode(&self, message: usize) -> Result<BitArray, ErrorOT> {
        if message > self.maximum_message() {
            return Err(ErrorOT::Argument(format!(
                "Message {message} out of range for a Walsh-Hadamard code of length {}",
                self.code_length
            )));
        }
        // Both operands are below code_length, so they fit 32 bits.
        Ok((0..self.code_length)
            .map(|i| WalshHadamardCode::parity((message & i) as u32))
            .collect())
    }
}

/// A single bit repeated `code_length` times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatingBitCode {
    code_length: usize,
}

impl RepeatingBitCode {
    #[must_use]
    pub fn new(code_length: usize) -> RepeatingBitCode {
        RepeatingBitCode { code_length }
    }
}

impl BinaryCode for RepeatingBitCode {
    fn code_length(&self) -> usize {
        self.code_length
    }

    fn distance(&self) -> usize {
        self.code_length
    }

    fn maximum_message(&self) -> usize {
        1
    }

    fn encode(&self, message: usize) -> Result<BitArray, ErrorOT> {
        match message {
            0 => Ok(BitArray::new(self.code_length)),
            1 => Ok(BitArray::ones(self.code_length)),
            _ => Err(ErrorOT::Argument(format!(
                "Repeating bit code only encodes 0 or 1, got {message}"
            ))),
        }
    }
}

/// Which code an extension channel uses. Both parties must agree on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeKind {
    #[default]
    WalshHadamard,
    RepeatingBit,
}

/// A code chosen at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Code {
    WalshHadamard(WalshHadamardCode),
    RepeatingBit(RepeatingBitCode),
}

impl Code {
    /// Builds the code of the given kind with `code_length` bits.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the kind cannot have this length.
    pub fn build(kind: CodeKind, code_length: usize) -> Result<Code, ErrorOT> {
        match kind {
            CodeKind::WalshHadamard => {
                Ok(Code::WalshHadamard(WalshHadamardCode::new(code_length)?))
            }
            CodeKind::RepeatingBit => Ok(Code::RepeatingBit(RepeatingBitCode::new(code_length))),
        }
    }
}

impl BinaryCode for Code {
    fn code_length(&self) -> usize {
        match self {
            Code::WalshHadamard(code) => code.code_length(),
            Code::RepeatingBit(code) => code.code_length(),
        }
    }

    fn distance(&self) -> usize {
        match self {
            Code::WalshHadamard(code) => code.distance(),
            Code::RepeatingBit(code) => code.distance(),
        }
    }

    fn maximum_message(&self) -> usize {
        match self {
            Code::WalshHadamard(code) => code.maximum_message(),
            Code::RepeatingBit(code) => code.maximum_message(),
        }
    }

    fn encode(&self, message: usize) -> Result<BitArray, ErrorOT> {
        match self {
            Code::WalshHadamard(code) => code.encode(message),
            Code::RepeatingBit(code) => code.encode(message),
        }
    }
}
