//! Source of randomness for the protocols.
//!
//! With the `insecure-rng` feature, every generator starts from the same
//! fixed seed so that runs can be reproduced. Never enable it in production.

use rand::rngs::StdRng;
use rand::SeedableRng;

pub const DEFAULT_SEED: u64 = 42;

#[cfg(not(feature = "insecure-rng"))]
#[must_use]
pub fn get_rng() -> StdRng {
    StdRng::from_entropy()
}

#[cfg(feature = "insecure-rng")]
#[must_use]
pub fn get_rng() -> StdRng {
    StdRng::seed_from_u64(DEFAULT_SEED)
}
