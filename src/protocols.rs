//! Oblivious transfer protocols built on the extension engine.
//!
//! The three variants run the same online phase and only differ in the way
//! the shared correlation is used afterwards:
//!
//! | Variant | Sender input | Sender output | Extra message | Receiver output |
//! |---|---|---|---|---|
//! | [`StandardOtExtension`] | N messages | none | N masked messages | the selected message |
//! | [`CorrelatedOtExtension`] | c_1..c_{N-1} | x_0 | N-1 masked values | x_0 ^ c_s (c_0 = 0) |
//! | [`RandomOtExtension`] | none | N random strings | none | the string at index s |
//!
//! All variants are created from an [`ExtensionEngine`], which can be moved
//! from one variant to another. The invocation counters of the engine keep
//! the oracle queries of different batches apart.

use async_trait::async_trait;

use crate::utilities::bits::BitArray;
use crate::utilities::ot::containers::{ObliviousTransferOptions, ObliviousTransferResult};
use crate::utilities::ot::ErrorOT;

pub mod correlated;
pub mod random;
pub mod standard;

pub use crate::utilities::ot::extension::{ExtensionEngine, ExtensionParameters};
pub use correlated::CorrelatedOtExtension;
pub use random::RandomOtExtension;
pub use standard::StandardOtExtension;

/// Correlated oblivious transfer.
///
/// For every invocation the sender fixes N-1 correlations `c_1, ..., c_{N-1}`
/// and gets a random string `x_0`. The receiver with selection `s` gets `x_0`
/// if `s = 0` and `x_0 ^ c_s` otherwise.
#[async_trait]
pub trait CorrelatedObliviousTransfer: Send {
    fn security_level(&self) -> usize;

    /// Message `(i, j)` of `correlations` is the correlation of option `j + 1`.
    /// Returns `x_0` for every invocation.
    async fn send(
        &mut self,
        correlations: &ObliviousTransferOptions,
    ) -> Result<ObliviousTransferResult, ErrorOT>;

    async fn receive(
        &mut self,
        selection_indices: &[usize],
        number_of_options: usize,
        message_bits: usize,
    ) -> Result<ObliviousTransferResult, ErrorOT>;
}

/// Random oblivious transfer: the sender's messages are chosen by the protocol.
#[async_trait]
pub trait RandomObliviousTransfer: Send {
    fn security_level(&self) -> usize;

    async fn send(
        &mut self,
        invocations: usize,
        number_of_options: usize,
        message_bits: usize,
    ) -> Result<ObliviousTransferOptions, ErrorOT>;

    async fn receive(
        &mut self,
        selection_indices: &[usize],
        number_of_options: usize,
        message_bits: usize,
    ) -> Result<ObliviousTransferResult, ErrorOT>;
}

// Stacks one row per invocation.
fn collect_result(
    rows: &[BitArray],
    message_bits: usize,
) -> Result<ObliviousTransferResult, ErrorOT> {
    let mut result = ObliviousTransferResult::new(rows.len(), message_bits);
    for (invocation, row) in rows.iter().enumerate() {
        result.set_invocation_result(invocation, row)?;
    }
    Ok(result)
}
