/// Random oblivious transfer over the extension engine.
///
/// Every output is an oracle output of the online phase, so nothing is sent
/// after U.
use async_trait::async_trait;
use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::protocols::{collect_result, RandomObliviousTransfer};
use crate::utilities::bits::BitArray;
use crate::utilities::channel::MessageChannel;
use crate::utilities::hashes::{HashFunction, Sha256Hash};
use crate::utilities::ot::containers::{ObliviousTransferOptions, ObliviousTransferResult};
use crate::utilities::ot::extension::{ExtensionEngine, ExtensionParameters};
use crate::utilities::ot::{ErrorOT, ObliviousTransferChannel};

pub struct RandomOtExtension<B, C, H = Sha256Hash> {
    engine: ExtensionEngine<B, C, H>,
}

impl<B, C, H> RandomOtExtension<B, C, H>
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
    ) -> Result<RandomOtExtension<B, C, H>, ErrorOT> {
        Ok(RandomOtExtension {
            engine: ExtensionEngine::new(base_ot, channel, parameters)?,
        })
    }
}

impl<B, C, H> RandomOtExtension<B, C, H> {
    #[must_use]
    pub fn from_engine(engine: ExtensionEngine<B, C, H>) -> RandomOtExtension<B, C, H> {
        RandomOtExtension { engine }
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
impl<B, C, H> RandomObliviousTransfer for RandomOtExtension<B, C, H>
where
    B: ObliviousTransferChannel,
    C: MessageChannel,
    H: HashFunction + Clone,
{
    fn security_level(&self) -> usize {
        self.engine.security_level()
    }

    #[instrument(level = "debug", skip(self), err)]
    async fn send(
        &mut self,
        invocations: usize,
        number_of_options: usize,
        message_bits: usize,
    ) -> Result<ObliviousTransferOptions, ErrorOT> {
        let batch = self
            .engine
            .sender_online(invocations, number_of_options, message_bits)
            .await?;

        let oracle = self.engine.oracle();
        let zero = BitArray::new(message_bits);
        let values: Vec<Vec<BitArray>> = (0..invocations)
            .into_par_iter()
            .map(|i| {
                (0..number_of_options)
                    .map(|option| oracle.mask(&zero, &batch.query(i, option)?))
                    .collect::<Result<Vec<BitArray>, ErrorOT>>()
            })
            .collect::<Result<Vec<Vec<BitArray>>, ErrorOT>>()?;

        let mut options =
            ObliviousTransferOptions::new(invocations, number_of_options, message_bits);
        for (i, row) in values.iter().enumerate() {
            for (option, value) in row.iter().enumerate() {
                options.set_message(i, option, value)?;
            }
        }
        debug!(first_invocation = batch.first_invocation(), "random options ready");
        Ok(options)
    }

    #[instrument(level = "debug", skip(self, selection_indices), err)]
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

        let oracle = self.engine.oracle();
        let zero = BitArray::new(message_bits);
        let rows: Vec<BitArray> = (0..selection_indices.len())
            .into_par_iter()
            .map(|i| oracle.mask(&zero, &batch.query(i)?))
            .collect::<Result<Vec<BitArray>, ErrorOT>>()?;

        collect_result(&rows, message_bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utilities::bits::BitSequence;
    use crate::utilities::codes::CodeKind;
    use crate::utilities::ot::extension::tests::engine_pair;
    use crate::utilities::rng;
    use rand::Rng;

    fn check_outputs(
        options: &ObliviousTransferOptions,
        selections: &[usize],
        result: &ObliviousTransferResult,
    ) {
        for (i, &selection) in selections.iter().enumerate() {
            let received = result.invocation_result(i).unwrap().to_bit_array();
            assert_eq!(received, options.message(i, selection).unwrap().to_bit_array());
        }
    }

    #[tokio::test]
    async fn test_random_ot_small_scenario() {
        let parameters = ExtensionParameters {
            security_level: 8,
            code: CodeKind::WalshHadamard,
        };
        let (sender_engine, receiver_engine) = engine_pair(&parameters);
        let mut sender = RandomOtExtension::from_engine(sender_engine);
        let mut receiver = RandomOtExtension::from_engine(receiver_engine);

        let selections = [0, 3];
        let (sent, received) = tokio::join!(
            sender.send(2, 6, 5),
            receiver.receive(&selections, 6, 5)
        );
        let options = sent.unwrap();
        let result = received.unwrap();

        assert_eq!(options.invocations(), 2);
        assert_eq!(options.options(), 6);
        assert_eq!(options.message_bits(), 5);
        check_outputs(&options, &selections, &result);
    }

    #[tokio::test]
    async fn test_random_ot() {
        let parameters = ExtensionParameters {
            security_level: 64,
            code: CodeKind::WalshHadamard,
        };
        let (sender_engine, receiver_engine) = engine_pair(&parameters);
        let mut sender = RandomOtExtension::from_engine(sender_engine);
        let mut receiver = RandomOtExtension::from_engine(receiver_engine);
        let mut rng = rng::get_rng();

        let selections: Vec<usize> = (0..100).map(|_| rng.gen_range(0..8)).collect();
        let (sent, received) = tokio::join!(
            sender.send(100, 8, 128),
            receiver.receive(&selections, 8, 128)
        );
        let options = sent.unwrap();
        let result = received.unwrap();
        check_outputs(&options, &selections, &result);

        // The unselected strings are unrelated to what the receiver got.
        for (i, &selection) in selections.iter().enumerate() {
            for option in (0..8).filter(|&option| option != selection) {
                assert_ne!(
                    result.invocation_result(i).unwrap().to_bit_array(),
                    options.message(i, option).unwrap().to_bit_array()
                );
            }
        }
    }

    #[tokio::test]
    async fn test_random_batches_do_not_repeat() {
        let parameters = ExtensionParameters {
            security_level: 16,
            code: CodeKind::RepeatingBit,
        };
        let (sender_engine, receiver_engine) = engine_pair(&parameters);
        let mut sender = RandomOtExtension::from_engine(sender_engine);
        let mut receiver = RandomOtExtension::from_engine(receiver_engine);

        let selections = [1, 0, 1];
        let mut previous: Option<ObliviousTransferOptions> = None;
        for _ in 0..3 {
            let (sent, received) = tokio::join!(
                sender.send(3, 2, 64),
                receiver.receive(&selections, 2, 64)
            );
            let options = sent.unwrap();
            check_outputs(&options, &selections, &received.unwrap());
            if let Some(previous) = previous {
                assert_ne!(previous, options);
            }
            previous = Some(options);
        }
        assert_eq!(receiver.engine().total_receiver_invocations(), 9);
    }

    #[tokio::test]
    async fn test_engine_moves_between_protocols() {
        use crate::protocols::StandardOtExtension;

        let parameters = ExtensionParameters {
            security_level: 16,
            code: CodeKind::WalshHadamard,
        };
        let (sender_engine, receiver_engine) = engine_pair(&parameters);
        let mut sender = RandomOtExtension::from_engine(sender_engine);
        let mut receiver = RandomOtExtension::from_engine(receiver_engine);

        let (sent, received) = tokio::join!(
            sender.send(4, 3, 16),
            receiver.receive(&[2, 1, 0, 2], 3, 16)
        );
        check_outputs(&sent.unwrap(), &[2, 1, 0, 2], &received.unwrap());

        let mut sender = StandardOtExtension::from_engine(sender.into_engine());
        let mut receiver = StandardOtExtension::from_engine(receiver.into_engine());
        let options = ObliviousTransferOptions::random(4, 3, 16, &mut rng::get_rng());
        let (sent, received) = tokio::join!(
            sender.send(&options),
            receiver.receive(&[0, 0, 1, 2], 3, 16)
        );
        sent.unwrap();
        check_outputs(&options, &[0, 0, 1, 2], &received.unwrap());
        assert_eq!(sender.engine().total_sender_invocations(), 8);
    }
}
