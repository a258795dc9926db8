pub mod base;
pub mod containers;
pub mod extension;

use async_trait::async_trait;

use crate::utilities::channel::ChannelError;
use crate::utilities::ot::containers::{ObliviousTransferOptions, ObliviousTransferResult};

#[derive(Debug, thiserror::Error)]
pub enum ErrorOT {
    /// Bad sizes, indices or lengths. Raised before any message is exchanged.
    #[error("Invalid argument: {0}")]
    Argument(String),
    /// The peer or the base OT returned structurally wrong data.
    #[error("Protocol error: {0}")]
    Protocol(String),
    /// An internal source of bytes ran out. This should never happen.
    #[error("Stream exhausted: {0}")]
    StreamExhausted(String),
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// A 1-out-of-N oblivious transfer.
///
/// This is the contract of the base OT used to bootstrap the extension, and
/// it is also offered by the extended standard OT itself.
#[async_trait]
pub trait ObliviousTransferChannel: Send {
    /// Computational security parameter, in bits.
    fn security_level(&self) -> usize;

    /// Offers `options.options()` messages per invocation to the receiver.
    async fn send(&mut self, options: &ObliviousTransferOptions) -> Result<(), ErrorOT>;

    /// Obtains, for every invocation `i`, the message with index
    /// `selection_indices[i]`.
    async fn receive(
        &mut self,
        selection_indices: &[usize],
        number_of_options: usize,
        message_bits: usize,
    ) -> Result<ObliviousTransferResult, ErrorOT>;
}

/// Checks the selection indices against the number of options.
///
/// # Errors
///
/// Will return `Err` if an index is not smaller than `number_of_options`.
pub fn validate_selection_indices(
    selection_indices: &[usize],
    number_of_options: usize,
) -> Result<(), ErrorOT> {
    if let Some(index) = selection_indices
        .iter()
        .find(|&&index| index >= number_of_options)
    {
        return Err(ErrorOT::Argument(format!(
            "Selection index {index} out of range for {number_of_options} options"
        )));
    }
    Ok(())
}
