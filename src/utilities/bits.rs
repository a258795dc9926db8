//! Packed bit data model.
//!
//! Every sequence of bits in this crate is packed in the same way: bit `i`
//! occupies byte `i / 8` at position `i % 8`. In other words, a byte is a
//! little-endian representation of eight consecutive bits. For example, the
//! bits [1110000010100000] correspond to the bytes [7, 5] (and not [224, 160]).
//!
//! Whenever a sequence is turned into bytes, the unused high bits of the last
//! byte are zero. This holds for owned arrays as well as for slices starting
//! at arbitrary bit offsets.
//!
//! There are three realizations of [`BitSequence`]:
//!
//! * [`BitArray`] owns its bytes and can be modified.
//! * [`BitArraySlice`] is a range `[start, stop)` of another sequence.
//! * [`BitArrayView`] borrows a byte slice, for example a received message.
//!
//! The views never copy. Use [`BitSequence::to_bit_array`] to materialize one.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::utilities::ot::ErrorOT;

/// A single bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Bit(bool);

impl Bit {
    pub const ZERO: Bit = Bit(false);
    pub const ONE: Bit = Bit(true);

    #[must_use]
    pub const fn new(value: bool) -> Bit {
        Bit(value)
    }

    #[must_use]
    pub const fn is_set(self) -> bool {
        self.0
    }
}

impl From<bool> for Bit {
    fn from(value: bool) -> Bit {
        Bit(value)
    }
}

impl From<Bit> for bool {
    fn from(bit: Bit) -> bool {
        bit.0
    }
}

/// Only the lowest bit of the byte is taken into account.
impl From<u8> for Bit {
    fn from(value: u8) -> Bit {
        Bit(value & 1 == 1)
    }
}

impl From<Bit> for u8 {
    fn from(bit: Bit) -> u8 {
        u8::from(bit.0)
    }
}

impl Not for Bit {
    type Output = Bit;

    fn not(self) -> Bit {
        Bit(!self.0)
    }
}

impl BitAnd for Bit {
    type Output = Bit;

    fn bitand(self, rhs: Bit) -> Bit {
        Bit(self.0 & rhs.0)
    }
}

impl BitOr for Bit {
    type Output = Bit;

    fn bitor(self, rhs: Bit) -> Bit {
        Bit(self.0 | rhs.0)
    }
}

impl BitXor for Bit {
    type Output = Bit;

    fn bitxor(self, rhs: Bit) -> Bit {
        Bit(self.0 ^ rhs.0)
    }
}

impl fmt::Display for Bit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.0 { "1" } else { "0" })
    }
}

/// Number of bytes needed to store `bit_count` packed bits.
#[must_use]
pub const fn byte_length(bit_count: usize) -> usize {
    (bit_count + 7) / 8
}

/// A byte whose lowest `count` bits are set.
#[must_use]
fn low_mask(count: usize) -> u8 {
    if count >= 8 {
        0xFF
    } else {
        (1u8 << count) - 1
    }
}

// Reads `count` bits starting at bit `offset` of a packed buffer.
// The caller guarantees that offset + count does not exceed the packed length.
fn read_packed(bytes: &[u8], offset: usize, count: usize) -> u8 {
    let index = offset / 8;
    let shift = offset % 8;

    let mut value = bytes[index] >> shift;
    if shift != 0 && index + 1 < bytes.len() {
        value |= bytes[index + 1] << (8 - shift);
    }

    value & low_mask(count)
}

/// An ordered, indexable collection of bits.
///
/// Implementors only have to provide [`len`](BitSequence::len) and
/// [`bit`](BitSequence::bit). Packed implementations should also override
/// [`read_byte`](BitSequence::read_byte), since every byte-oriented operation
/// goes through it.
pub trait BitSequence {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the bit at `index`.
    ///
    /// # Panics
    ///
    /// Will panic if `index` is not smaller than the length.
    fn bit(&self, index: usize) -> Bit;

    /// Reads `count` (at most 8) bits starting at bit `offset` into the low
    /// bits of a byte. The remaining high bits are zero.
    fn read_byte(&self, offset: usize, count: usize) -> u8 {
        let mut value = 0u8;
        for k in 0..count.min(8) {
            value |= u8::from(self.bit(offset + k)) << k;
        }
        value
    }

    fn byte_len(&self) -> usize {
        byte_length(self.len())
    }

    /// Returns the `index`-th byte of the packed representation.
    ///
    /// # Panics
    ///
    /// Will panic if `index` is not smaller than [`byte_len`](BitSequence::byte_len).
    fn byte(&self, index: usize) -> u8 {
        assert!(
            index < self.byte_len(),
            "Byte index {index} out of range for {} bits",
            self.len()
        );
        let offset = 8 * index;
        self.read_byte(offset, (self.len() - offset).min(8))
    }

    /// Enumerates the bits in order.
    fn bits(&self) -> Bits<'_, Self> {
        Bits {
            source: self,
            position: 0,
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        (0..self.byte_len()).map(|i| self.byte(i)).collect()
    }

    /// Writes the packed representation to the beginning of `buffer`.
    ///
    /// # Errors
    ///
    /// Will return `Err` if `buffer` is shorter than [`byte_len`](BitSequence::byte_len).
    fn copy_to(&self, buffer: &mut [u8]) -> Result<(), ErrorOT> {
        let byte_len = self.byte_len();
        if buffer.len() < byte_len {
            return Err(ErrorOT::Argument(format!(
                "Buffer of {} bytes cannot hold {} bits",
                buffer.len(),
                self.len()
            )));
        }
        for (i, target) in buffer[..byte_len].iter_mut().enumerate() {
            *target = self.byte(i);
        }
        Ok(())
    }

    /// Copies the bits into a new owned array.
    fn to_bit_array(&self) -> BitArray {
        BitArray {
            bytes: self.to_bytes(),
            len: self.len(),
        }
    }

    /// Returns the view of the bits in `[start, stop)`.
    ///
    /// # Errors
    ///
    /// Will return `Err` if `stop` exceeds the length or `stop <= start`.
    fn slice(&self, start: usize, stop: usize) -> Result<BitArraySlice<'_, Self>, ErrorOT> {
        BitArraySlice::new(self, start, stop)
    }

    /// # Errors
    ///
    /// Will return `Err` if the lengths differ.
    fn xor<S: BitSequence + ?Sized>(&self, other: &S) -> Result<BitArray, ErrorOT> {
        combine_bytes(self, other, |a, b| a ^ b)
    }

    /// # Errors
    ///
    /// Will return `Err` if the lengths differ.
    fn and<S: BitSequence + ?Sized>(&self, other: &S) -> Result<BitArray, ErrorOT> {
        combine_bytes(self, other, |a, b| a & b)
    }

    /// # Errors
    ///
    /// Will return `Err` if the lengths differ.
    fn or<S: BitSequence + ?Sized>(&self, other: &S) -> Result<BitArray, ErrorOT> {
        combine_bytes(self, other, |a, b| a | b)
    }

    fn xor_bit(&self, bit: Bit) -> BitArray {
        if bit.is_set() {
            self.complement()
        } else {
            self.to_bit_array()
        }
    }

    fn and_bit(&self, bit: Bit) -> BitArray {
        if bit.is_set() {
            self.to_bit_array()
        } else {
            BitArray::new(self.len())
        }
    }

    fn or_bit(&self, bit: Bit) -> BitArray {
        if bit.is_set() {
            BitArray::ones(self.len())
        } else {
            self.to_bit_array()
        }
    }

    /// Bitwise NOT.
    fn complement(&self) -> BitArray {
        let mut result = BitArray {
            bytes: (0..self.byte_len()).map(|i| !self.byte(i)).collect(),
            len: self.len(),
        };
        result.clear_tail();
        result
    }

    /// Returns the bits of `self` followed by the bits of `other`.
    fn concat<S: BitSequence + ?Sized>(&self, other: &S) -> BitArray {
        let mut result = BitArray::new(self.len() + other.len());
        result.write_bits_unchecked(0, self);
        result.write_bits_unchecked(self.len(), other);
        result
    }

    /// Number of bits that are set.
    fn hamming_weight(&self) -> usize {
        (0..self.byte_len())
            .map(|i| self.byte(i).count_ones() as usize)
            .sum()
    }

    /// Number of positions in which `self` and `other` differ.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the lengths differ.
    fn hamming_distance<S: BitSequence + ?Sized>(&self, other: &S) -> Result<usize, ErrorOT> {
        Ok(self.xor(other)?.hamming_weight())
    }
}

fn combine_bytes<A, B, F>(left: &A, right: &B, op: F) -> Result<BitArray, ErrorOT>
where
    A: BitSequence + ?Sized,
    B: BitSequence + ?Sized,
    F: Fn(u8, u8) -> u8,
{
    if left.len() != right.len() {
        return Err(ErrorOT::Argument(format!(
            "Length mismatch: {} bits against {} bits",
            left.len(),
            right.len()
        )));
    }

    let mut result = BitArray {
        bytes: (0..left.byte_len())
            .map(|i| op(left.byte(i), right.byte(i)))
            .collect(),
        len: left.len(),
    };
    result.clear_tail();
    Ok(result)
}

/// Iterator over the bits of a [`BitSequence`].
pub struct Bits<'a, S: BitSequence + ?Sized> {
    source: &'a S,
    position: usize,
}

impl<S: BitSequence + ?Sized> Iterator for Bits<'_, S> {
    type Item = Bit;

    fn next(&mut self) -> Option<Bit> {
        if self.position >= self.source.len() {
            return None;
        }
        let bit = self.source.bit(self.position);
        self.position += 1;
        Some(bit)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.source.len() - self.position;
        (remaining, Some(remaining))
    }
}

impl<S: BitSequence + ?Sized> ExactSizeIterator for Bits<'_, S> {}

/// Owned, mutable, packed bit storage.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PackedBits", into = "PackedBits")]
pub struct BitArray {
    bytes: Vec<u8>,
    len: usize,
}

// Serialized form of a `BitArray`. Deserialization goes through
// `BitArray::from_bytes`, so the packing invariant holds for remote data too.
#[derive(Serialize, Deserialize)]
struct PackedBits {
    #[serde(with = "serde_bytes")]
    bytes: Vec<u8>,
    len: usize,
}

impl TryFrom<PackedBits> for BitArray {
    type Error = ErrorOT;

    fn try_from(packed: PackedBits) -> Result<BitArray, ErrorOT> {
        BitArray::from_bytes(&packed.bytes, packed.len)
    }
}

impl From<BitArray> for PackedBits {
    fn from(array: BitArray) -> PackedBits {
        PackedBits {
            bytes: array.bytes,
            len: array.len,
        }
    }
}

impl BitArray {
    /// An array of `len` zero bits.
    #[must_use]
    pub fn new(len: usize) -> BitArray {
        BitArray {
            bytes: vec![0u8; byte_length(len)],
            len,
        }
    }

    /// An array of `len` one bits.
    #[must_use]
    pub fn ones(len: usize) -> BitArray {
        let mut array = BitArray {
            bytes: vec![0xFF; byte_length(len)],
            len,
        };
        array.clear_tail();
        array
    }

    /// Interprets the first `len` bits of `bytes`. Surplus bytes are dropped
    /// and the unused high bits of the last byte are cleared.
    ///
    /// # Errors
    ///
    /// Will return `Err` if `bytes` holds fewer than `len` bits.
    pub fn from_bytes(bytes: &[u8], len: usize) -> Result<BitArray, ErrorOT> {
        let byte_len = byte_length(len);
        if bytes.len() < byte_len {
            return Err(ErrorOT::Argument(format!(
                "{} bytes cannot hold {len} bits",
                bytes.len()
            )));
        }

        let mut array = BitArray {
            bytes: bytes[..byte_len].to_vec(),
            len,
        };
        array.clear_tail();
        Ok(array)
    }

    /// Samples `len` uniformly random bits.
    pub fn random<R: RngCore + ?Sized>(len: usize, rng: &mut R) -> BitArray {
        let mut array = BitArray::new(len);
        rng.fill_bytes(&mut array.bytes);
        array.clear_tail();
        array
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Sets the bit at `index`.
    ///
    /// # Panics
    ///
    /// Will panic if `index` is not smaller than the length.
    pub fn set(&mut self, index: usize, bit: Bit) {
        assert!(
            index < self.len,
            "Bit index {index} out of range for {} bits",
            self.len
        );
        let mask = 1u8 << (index % 8);
        if bit.is_set() {
            self.bytes[index / 8] |= mask;
        } else {
            self.bytes[index / 8] &= !mask;
        }
    }

    /// Overwrites the bits starting at `offset` with `bits`.
    ///
    /// # Errors
    ///
    /// Will return `Err` if `bits` does not fit in the array from `offset` on.
    pub fn write_bits<S: BitSequence + ?Sized>(
        &mut self,
        offset: usize,
        bits: &S,
    ) -> Result<(), ErrorOT> {
        if offset + bits.len() > self.len {
            return Err(ErrorOT::Argument(format!(
                "Cannot write {} bits at offset {offset} into {} bits",
                bits.len(),
                self.len
            )));
        }
        self.write_bits_unchecked(offset, bits);
        Ok(())
    }

    fn write_bits_unchecked<S: BitSequence + ?Sized>(&mut self, offset: usize, bits: &S) {
        if offset % 8 == 0 {
            // Aligned: whole bytes can be copied, only the last one is merged.
            let first = offset / 8;
            let full = bits.len() / 8;
            for i in 0..full {
                self.bytes[first + i] = bits.byte(i);
            }
            let remaining = bits.len() % 8;
            if remaining > 0 {
                let mask = low_mask(remaining);
                let target = &mut self.bytes[first + full];
                *target = (*target & !mask) | bits.byte(full);
            }
        } else {
            for (i, bit) in bits.bits().enumerate() {
                self.set(offset + i, bit);
            }
        }
    }

    /// In-place XOR with a sequence of the same length.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the lengths differ.
    pub fn xor_assign<S: BitSequence + ?Sized>(&mut self, other: &S) -> Result<(), ErrorOT> {
        if self.len != other.len() {
            return Err(ErrorOT::Argument(format!(
                "Length mismatch: {} bits against {} bits",
                self.len,
                other.len()
            )));
        }
        for (i, byte) in self.bytes.iter_mut().enumerate() {
            *byte ^= other.byte(i);
        }
        Ok(())
    }

    // Restores the packing invariant after a whole-byte operation.
    fn clear_tail(&mut self) {
        let used = self.len % 8;
        if used != 0 {
            if let Some(last) = self.bytes.last_mut() {
                *last &= low_mask(used);
            }
        }
    }
}

impl BitSequence for BitArray {
    fn len(&self) -> usize {
        self.len
    }

    fn bit(&self, index: usize) -> Bit {
        assert!(
            index < self.len,
            "Bit index {index} out of range for {} bits",
            self.len
        );
        Bit::from(self.bytes[index / 8] >> (index % 8))
    }

    fn read_byte(&self, offset: usize, count: usize) -> u8 {
        read_packed(&self.bytes, offset, count)
    }

    fn byte(&self, index: usize) -> u8 {
        self.bytes[index]
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    fn to_bit_array(&self) -> BitArray {
        self.clone()
    }
}

impl Not for &BitArray {
    type Output = BitArray;

    fn not(self) -> BitArray {
        self.complement()
    }
}

impl FromIterator<Bit> for BitArray {
    fn from_iter<I: IntoIterator<Item = Bit>>(iter: I) -> BitArray {
        let mut bytes = Vec::new();
        let mut len = 0;
        for bit in iter {
            if len % 8 == 0 {
                bytes.push(0);
            }
            if let Some(last) = bytes.last_mut() {
                *last |= u8::from(bit) << (len % 8);
            }
            len += 1;
        }
        BitArray { bytes, len }
    }
}

impl FromIterator<bool> for BitArray {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> BitArray {
        iter.into_iter().map(Bit::from).collect()
    }
}

impl fmt::Display for BitArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.bits() {
            write!(f, "{bit}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for BitArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitArray")
            .field("len", &self.len)
            .field("bits", &format_args!("{self}"))
            .finish()
    }
}

/// The bits `[start, stop)` of another sequence, without copying.
pub struct BitArraySlice<'a, S: BitSequence + ?Sized> {
    source: &'a S,
    start: usize,
    stop: usize,
}

impl<'a, S: BitSequence + ?Sized> BitArraySlice<'a, S> {
    /// # Errors
    ///
    /// Will return `Err` if `stop` exceeds the length of `source` or `stop <= start`.
    pub fn new(source: &'a S, start: usize, stop: usize) -> Result<BitArraySlice<'a, S>, ErrorOT> {
        if stop > source.len() || stop <= start {
            return Err(ErrorOT::Argument(format!(
                "Invalid slice [{start}, {stop}) of {} bits",
                source.len()
            )));
        }
        Ok(BitArraySlice {
            source,
            start,
            stop,
        })
    }
}

impl<S: BitSequence + ?Sized> Clone for BitArraySlice<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: BitSequence + ?Sized> Copy for BitArraySlice<'_, S> {}

impl<S: BitSequence + ?Sized> BitSequence for BitArraySlice<'_, S> {
    fn len(&self) -> usize {
        self.stop - self.start
    }

    fn bit(&self, index: usize) -> Bit {
        assert!(
            index < self.len(),
            "Bit index {index} out of range for {} bits",
            self.len()
        );
        self.source.bit(self.start + index)
    }

    fn read_byte(&self, offset: usize, count: usize) -> u8 {
        self.source.read_byte(self.start + offset, count)
    }
}

impl<S: BitSequence + ?Sized> fmt::Debug for BitArraySlice<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitArraySlice")
            .field("start", &self.start)
            .field("stop", &self.stop)
            .field("bits", &format_args!("{}", self.to_bit_array()))
            .finish()
    }
}

/// Packed bits borrowed from a byte slice.
#[derive(Debug, Clone, Copy)]
pub struct BitArrayView<'a> {
    bytes: &'a [u8],
    len: usize,
}

impl<'a> BitArrayView<'a> {
    /// # Errors
    ///
    /// Will return `Err` if `bytes` holds fewer than `len` bits.
    pub fn new(bytes: &'a [u8], len: usize) -> Result<BitArrayView<'a>, ErrorOT> {
        if bytes.len() < byte_length(len) {
            return Err(ErrorOT::Argument(format!(
                "{} bytes cannot hold {len} bits",
                bytes.len()
            )));
        }
        Ok(BitArrayView { bytes, len })
    }
}

impl BitSequence for BitArrayView<'_> {
    fn len(&self) -> usize {
        self.len
    }

    fn bit(&self, index: usize) -> Bit {
        assert!(
            index < self.len,
            "Bit index {index} out of range for {} bits",
            self.len
        );
        Bit::from(self.bytes[index / 8] >> (index % 8))
    }

    fn read_byte(&self, offset: usize, count: usize) -> u8 {
        read_packed(self.bytes, offset, count)
    }
}
