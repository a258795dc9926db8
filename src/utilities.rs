//! Building blocks of the protocols.

pub mod bit_matrix;
pub mod bits;
pub mod channel;
pub mod codes;
pub mod encoding;
pub mod hashes;
pub mod oracle;
pub mod ot;
pub mod rng;
