/// Correlated oblivious transfer over the extension engine.
///
/// The oracle output for option 0 becomes the sender's random string x_0.
/// For every other option o, the sender transmits x_0 ^ c_o masked with the
/// oracle output for o. Since x_0 itself is never sent, the extra message is
/// one option shorter than in the standard protocol.
use async_trait::async_trait;
use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::protocols::{collect_result, CorrelatedObliviousTransfer};
use crate::utilities::bits::{byte_length, BitArray, BitSequence};
use crate::utilities::channel::MessageChannel;
use crate::utilities::encoding::{MessageComposer, MessageDecomposer};
use crate::utilities::hashes::{HashFunction, Sha256Hash};
use crate::utilities::ot::containers::{ObliviousTransferOptions, ObliviousTransferResult};
use crate::utilities::ot::extension::{ExtensionEngine, ExtensionParameters};
use crate::utilities::ot::{ErrorOT, ObliviousTransferChannel};

pub struct CorrelatedOtExtension<B, C, H = Sha256Hash> {
    engine: ExtensionEngine<B, C, H>,
}

impl<B, C, H> CorrelatedOtExtension<B, C, H>
where
    B: ObliviousTransferChannel,
    C: MessageChannel,
    H: HashFunction + Clone + Default,
{
    /// # Errors
    ///
    /// Will return `Err` if the parameters do not describe a valid code.
    pub fn new(
        base_ot: B,
        channel: C,
        parameters: &ExtensionParameters,
    ) -> Result<CorrelatedOtExtension<B, C, H>, ErrorOT> {
        Ok(CorrelatedOtExtension {
            engine: ExtensionEngine::new(base_ot, channel, parameters)?,
        })
    }
}

impl<B, C, H> CorrelatedOtExtension<B, C, H> {
    #[must_use]
    pub fn from_engine(engine: ExtensionEngine<B, C, H>) -> CorrelatedOtExtension<B, C, H> {
        CorrelatedOtExtension { engine }
    }

    #[must_use]
    pub fn engine(&self) -> &ExtensionEngine<B, C, H> {
        &self.engine
    }

    #[must_use]
    pub fn into_engine(self) -> ExtensionEngine<B, C, H> {
        self.engine
    }
}

#[async_trait]
impl<B, C, H> CorrelatedObliviousTransfer for CorrelatedOtExtension<B, C, H>
where
    B: ObliviousTransferChannel,
    C: MessageChannel,
    H: HashFunction + Clone,
{
    fn security_level(&self) -> usize {
        self.engine.security_level()
    }

    #[instrument(level = "debug", skip_all, err)]
    async fn send(
        &mut self,
        correlations: &ObliviousTransferOptions,
    ) -> Result<ObliviousTransferResult, ErrorOT> {
        let invocations = correlations.invocations();
        let number_of_options = correlations.options() + 1;
        let message_bits = correlations.message_bits();

        let batch = self
            .engine
            .sender_online(invocations, number_of_options, message_bits)
            .await?;

        let oracle = self.engine.oracle();
        let zero = BitArray::new(message_bits);
        let outputs: Vec<(BitArray, Vec<BitArray>)> = (0..invocations)
            .into_par_iter()
            .map(|i| {
                let x_0 = oracle.mask(&zero, &batch.query(i, 0)?)?;
                let masked = (1..number_of_options)
                    .map(|option| {
                        let value = x_0.xor(&correlations.message(i, option - 1)?)?;
                        oracle.mask(&value, &batch.query(i, option)?)
                    })
                    .collect::<Result<Vec<BitArray>, ErrorOT>>()?;
                Ok((x_0, masked))
            })
            .collect::<Result<Vec<(BitArray, Vec<BitArray>)>, ErrorOT>>()?;

        let mut composer = MessageComposer::with_capacity(
            invocations * (number_of_options - 1) * byte_length(message_bits),
        );
        for value in outputs.iter().flat_map(|(_, masked)| masked) {
            composer.write_bits(value);
        }
        debug!(first_invocation = batch.first_invocation(), "sending masked correlations");
        self.engine.channel_mut().write_message(&composer.compose()).await?;

        let x_0: Vec<BitArray> = outputs.into_iter().map(|(x_0, _)| x_0).collect();
        collect_result(&x_0, message_bits)
    }

    #[instrument(level = "debug", skip_all, err)]
    async fn receive(
        &mut self,
        selection_indices: &[usize],
        number_of_options: usize,
        message_bits: usize,
    ) -> Result<ObliviousTransferResult, ErrorOT> {
        let batch = self
            .engine
            .receiver_online(selection_indices, number_of_options, message_bits)
            .await?;

        let message = self.engine.channel_mut().read_message().await?;
        let mut decomposer = MessageDecomposer::new(&message);
        let mut selected: Vec<BitArray> = Vec::with_capacity(selection_indices.len());
        for &selection in selection_indices {
            // Selection 0 unmasks zero, which gives x_0 itself.
            let mut value = BitArray::new(message_bits);
            for option in 1..number_of_options {
                let masked = decomposer.read_bits(message_bits)?;
                if option == selection {
                    value = masked;
                }
            }
            selected.push(value);
        }
        decomposer.finish()?;

        let oracle = self.engine.oracle();
        let rows: Vec<BitArray> = selected
            .par_iter()
            .enumerate()
            .map(|(i, value)| oracle.mask(value, &batch.query(i)?))
            .collect::<Result<Vec<BitArray>, ErrorOT>>()?;

        collect_result(&rows, message_bits)
    }
}
