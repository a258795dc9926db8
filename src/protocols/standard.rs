/// Standard 1-out-of-N oblivious transfer over the extension engine.
///
/// After the online phase, the sender masks every option with the oracle
/// output for its query and transmits all of them. The receiver can only
/// compute the query of the option it selected.
use async_trait::async_trait;
use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::protocols::collect_result;
use crate::utilities::bits::{byte_length, BitArray};
use crate::utilities::channel::MessageChannel;
use crate::utilities::encoding::{MessageComposer, MessageDecomposer};
use crate::utilities::hashes::{HashFunction, Sha256Hash};
use crate::utilities::ot::containers::{ObliviousTransferOptions, ObliviousTransferResult};
use crate::utilities::ot::extension::{ExtensionEngine, ExtensionParameters};
use crate::utilities::ot::{ErrorOT, ObliviousTransferChannel};

pub struct StandardOtExtension<B, C, H = Sha256Hash> {
    engine: ExtensionEngine<B, C, H>,
}

impl<B, C, H> StandardOtExtension<B, C, H>
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
    ) -> Result<StandardOtExtension<B, C, H>, ErrorOT> {
        Ok(StandardOtExtension {
            engine: ExtensionEngine::new(base_ot, channel, parameters)?,
        })
    }
}

impl<B, C, H> StandardOtExtension<B, C, H> {
    #[must_use]
    pub fn from_engine(engine: ExtensionEngine<B, C, H>) -> StandardOtExtension<B, C, H> {
        StandardOtExtension { engine }
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
impl<B, C, H> ObliviousTransferChannel for StandardOtExtension<B, C, H>
where
    B: ObliviousTransferChannel,
    C: MessageChannel,
    H: HashFunction + Clone,
{
    fn security_level(&self) -> usize {
        self.engine.security_level()
    }

    #[instrument(level = "debug", skip_all, err)]
    async fn send(&mut self, options: &ObliviousTransferOptions) -> Result<(), ErrorOT> {
        let invocations = options.invocations();
        let number_of_options = options.options();
        let message_bits = options.message_bits();

        let batch = self
            .engine
            .sender_online(invocations, number_of_options, message_bits)
            .await?;

        let oracle = self.engine.oracle();
        let masked: Vec<Vec<BitArray>> = (0..invocations)
            .into_par_iter()
            .map(|i| {
                (0..number_of_options)
                    .map(|j| oracle.mask(&options.message(i, j)?, &batch.query(i, j)?))
                    .collect::<Result<Vec<BitArray>, ErrorOT>>()
            })
            .collect::<Result<Vec<Vec<BitArray>>, ErrorOT>>()?;

        let mut composer = MessageComposer::with_capacity(
            invocations * number_of_options * byte_length(message_bits),
        );
        for value in masked.iter().flatten() {
            composer.write_bits(value);
        }
        debug!(first_invocation = batch.first_invocation(), "sending masked options");
        self.engine.channel_mut().write_message(&composer.compose()).await?;

        Ok(())
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
            for option in 0..number_of_options {
                let value = decomposer.read_bits(message_bits)?;
                if option == selection {
                    selected.push(value);
                }
            }
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
