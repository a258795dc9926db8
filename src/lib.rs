//! Oblivious transfer with a Naor-Pinkas base OT and OT extension.
//!
//! The base OT in [`utilities::ot::base`] is used a number of times
//! proportional to the security level. Afterwards, the extension engine in
//! [`utilities::ot::extension`] produces as many transfers as needed from
//! hash evaluations only. The variants in [`protocols`] turn the engine into
//! standard, correlated or random 1-out-of-N oblivious transfer.

pub mod protocols;
pub mod utilities;

/// Computational security parameter lambda used by default, in bits.
pub const DEFAULT_SECURITY_LEVEL: usize = 128;
