//! Random oracle with unbounded output.
//!
//! A query is first hashed into a seed. The output stream is then the
//! concatenation of the blocks `H(seed || k)` for k = 0, 1, 2, ..., where the
//! counter k is written as 4 little-endian bytes. This is the pseudorandom
//! generator used to extend base OT seeds and to derive masking keys.
//!
//! A [`RandomByteSequence`] cannot be rewound. Two parties holding the same
//! seed stay in sync only if they draw exactly the same amounts in the same
//! order, so every draw consumes the stream for good.

use std::fmt;

use crate::utilities::bits::{BitArray, BitSequence};
use crate::utilities::hashes::{HashFunction, Sha256Hash};
use crate::utilities::ot::ErrorOT;

#[derive(Debug, Clone, Default)]
pub struct HashRandomOracle<H = Sha256Hash> {
    hash: H,
}

impl<H: HashFunction + Clone> HashRandomOracle<H> {
    #[must_use]
    pub fn new(hash: H) -> HashRandomOracle<H> {
        HashRandomOracle { hash }
    }

    /// Starts the output stream for `query`.
    #[must_use]
    pub fn invoke(&self, query: &[u8]) -> RandomByteSequence<H> {
        RandomByteSequence {
            seed: self.hash.compute_hash(query),
            hash: self.hash.clone(),
            counter: 0,
            exhausted: false,
            block: Vec::new(),
            position: 0,
        }
    }

    /// XORs `message` with the output stream for `query`.
    ///
    /// The stream is drawn one byte at a time while the message is read, so
    /// neither side is copied into an intermediate buffer.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the stream cannot supply enough bytes.
    pub fn mask<S: BitSequence + ?Sized>(
        &self,
        message: &S,
        query: &[u8],
    ) -> Result<BitArray, ErrorOT> {
        let mut stream = self.invoke(query);
        let masked = (0..message.byte_len())
            .map(|i| Ok(stream.next_byte()? ^ message.byte(i)))
            .collect::<Result<Vec<u8>, ErrorOT>>()?;
        BitArray::from_bytes(&masked, message.len())
    }
}

/// Pseudorandom byte stream keyed by a single oracle query.
pub struct RandomByteSequence<H = Sha256Hash> {
    hash: H,
    seed: Vec<u8>,
    counter: u32,
    exhausted: bool,
    block: Vec<u8>,
    position: usize,
}

impl<H: HashFunction> RandomByteSequence<H> {
    fn refill(&mut self) -> Result<(), ErrorOT> {
        if self.exhausted {
            return Err(ErrorOT::StreamExhausted(format!(
                "Random oracle stream ran out after {} blocks",
                u64::from(u32::MAX) + 1
            )));
        }

        let input = [self.seed.as_slice(), &self.counter.to_le_bytes()].concat();
        self.block = self.hash.compute_hash(&input);
        self.position = 0;

        match self.counter.checked_add(1) {
            Some(next) => self.counter = next,
            None => self.exhausted = true,
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Will return `Err` if the stream is exhausted.
    pub fn next_byte(&mut self) -> Result<u8, ErrorOT> {
        if self.position >= self.block.len() {
            self.refill()?;
        }
        let byte = self.block[self.position];
        self.position += 1;
        Ok(byte)
    }

    /// Fills `buffer` with the next bytes of the stream.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the stream is exhausted.
    pub fn fill_bytes(&mut self, buffer: &mut [u8]) -> Result<(), ErrorOT> {
        let mut filled = 0;
        while filled < buffer.len() {
            if self.position >= self.block.len() {
                self.refill()?;
            }
            let available = (self.block.len() - self.position).min(buffer.len() - filled);
            buffer[filled..filled + available]
                .copy_from_slice(&self.block[self.position..self.position + available]);
            self.position += available;
            filled += available;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Will return `Err` if the stream is exhausted.
    pub fn take_bytes(&mut self, count: usize) -> Result<Vec<u8>, ErrorOT> {
        let mut bytes = vec![0u8; count];
        self.fill_bytes(&mut bytes)?;
        Ok(bytes)
    }

    /// Draws `count` bits. The stream advances by whole bytes, so the unused
    /// high bits of the last byte are discarded.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the stream is exhausted.
    pub fn take_bits(&mut self, count: usize) -> Result<BitArray, ErrorOT> {
        let bytes = self.take_bytes(crate::utilities::bits::byte_length(count))?;
        BitArray::from_bytes(&bytes, count)
    }
}

impl<H> fmt::Debug for RandomByteSequence<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomByteSequence")
            .field("counter", &self.counter)
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utilities::hashes::Sha3Hash;

    #[test]
    fn test_stream_blocks() {
        let oracle = HashRandomOracle::new(Sha256Hash);
        let mut stream = oracle.invoke(b"query");

        let seed = Sha256Hash.compute_hash(b"query");
        let block0 = Sha256Hash.compute_hash(&[seed.as_slice(), &0u32.to_le_bytes()].concat());
        let block1 = Sha256Hash.compute_hash(&[seed.as_slice(), &1u32.to_le_bytes()].concat());

        assert_eq!(stream.take_bytes(64).unwrap(), [block0, block1].concat());
    }

    #[test]
    fn test_draws_are_one_continuous_stream() {
        let oracle = HashRandomOracle::new(Sha3Hash);
        let mut pieces = oracle.invoke(b"seed");
        let mut first = pieces.take_bytes(10).unwrap();
        first.push(pieces.next_byte().unwrap());
        first.extend(pieces.take_bytes(89).unwrap());

        let whole = oracle.invoke(b"seed").take_bytes(100).unwrap();
        assert_eq!(first, whole);
    }

    #[test]
    fn test_distinct_queries_differ() {
        let oracle = HashRandomOracle::<Sha256Hash>::default();
        let a = oracle.invoke(b"query-a").take_bytes(48).unwrap();
        let b = oracle.invoke(b"query-b").take_bytes(48).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, oracle.invoke(b"query-a").take_bytes(48).unwrap());
    }

    #[test]
    fn test_take_bits_consumes_whole_bytes() {
        let oracle = HashRandomOracle::new(Sha256Hash);
        let mut stream = oracle.invoke(b"bits");
        let bits = stream.take_bits(12).unwrap();
        let next = stream.next_byte().unwrap();

        let bytes = oracle.invoke(b"bits").take_bytes(3).unwrap();
        assert_eq!(bits.to_bytes(), vec![bytes[0], bytes[1] & 0x0F]);
        assert_eq!(next, bytes[2]);
    }

    #[test]
    fn test_mask_is_an_involution() {
        let oracle = HashRandomOracle::new(Sha256Hash);
        let message: BitArray = (0..77).map(|i| i % 5 == 1).collect();
        let masked = oracle.mask(&message, b"key").unwrap();

        assert_eq!(masked.len(), 77);
        assert_ne!(masked, message);
        assert_eq!(oracle.mask(&masked, b"key").unwrap(), message);
    }

    #[test]
    fn test_mask_xors_the_stream() {
        let oracle = HashRandomOracle::new(Sha3Hash);
        let source: BitArray = (0..150).map(|i| i % 3 == 0).collect();
        let message = source.slice(3, 144).unwrap();
        let masked = oracle.mask(&message, b"slice").unwrap();

        let stream = oracle.invoke(b"slice").take_bits(141).unwrap();
        assert_eq!(masked, message.xor(&stream).unwrap());
        assert_eq!(masked.as_bytes()[17] & 0xE0, 0);
    }

    #[test]
    fn test_exhausted_stream() {
        let oracle = HashRandomOracle::new(Sha256Hash);
        let mut stream = oracle.invoke(b"end");
        stream.counter = u32::MAX;

        assert_eq!(stream.take_bytes(32).unwrap().len(), 32);
        assert!(matches!(
            stream.next_byte(),
            Err(ErrorOT::StreamExhausted(_))
        ));
    }
}
