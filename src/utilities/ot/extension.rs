/// This file implements the engine of the 1-out-of-N Oblivious Transfer
/// Extension of Kolesnikov and Kumaresan, in the presentation of KOS
/// (<https://eprint.iacr.org/2015/546.pdf>). With the repetition code, it
/// specializes to the 1-out-of-2 protocol of IKNP.
///
/// The engine only produces the correlation shared by both parties after
/// each batch. How the correlation is turned into outputs (standard,
/// correlated or random OT) is decided in the protocols module.
///
/// Notation: `code_length` = 2 * `security_level`, `Delta` = the sender's random
/// choice bits, `c_j` = the codeword of the receiver's selection for invocation j.
/// After a batch, the sender holds the rows q_j and the receiver holds the rows
/// t_j, with q_j = t_j ^ (c_j & Delta).
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::utilities::bit_matrix::BitMatrix;
use crate::utilities::bits::{BitArray, BitSequence};
use crate::utilities::channel::MessageChannel;
use crate::utilities::codes::{BinaryCode, Code, CodeKind};
use crate::utilities::encoding::{MessageComposer, MessageDecomposer};
use crate::utilities::hashes::{HashFunction, Sha256Hash};
use crate::utilities::oracle::{HashRandomOracle, RandomByteSequence};
use crate::utilities::ot::containers::ObliviousTransferOptions;
use crate::utilities::ot::{validate_selection_indices, ErrorOT, ObliviousTransferChannel};
use crate::utilities::rng;
use crate::DEFAULT_SECURITY_LEVEL;

/// Configuration of an extension engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionParameters {
    /// Computational security parameter, in bits.
    pub security_level: usize,
    pub code: CodeKind,
}

impl Default for ExtensionParameters {
    fn default() -> ExtensionParameters {
        ExtensionParameters {
            security_level: DEFAULT_SECURITY_LEVEL,
            code: CodeKind::default(),
        }
    }
}

impl ExtensionParameters {
    #[must_use]
    pub fn code_length(&self) -> usize {
        2 * self.security_level
    }

    /// # Errors
    ///
    /// Will return `Err` if the security level is zero or the code cannot
    /// have length `2 * security_level`.
    pub fn build_code(&self) -> Result<Code, ErrorOT> {
        if self.security_level == 0 {
            return Err(ErrorOT::Argument("Security level must be positive".into()));
        }
        Code::build(self.code, self.code_length())
    }
}

// Bootstrap data of the sender: one seeded stream per code bit.
struct SenderBootstrap<H> {
    random_choices: BitArray,
    streams: Vec<RandomByteSequence<H>>,
}

// Bootstrap data of the receiver: two seeded streams per code bit.
struct ReceiverBootstrap<H> {
    streams: Vec<[RandomByteSequence<H>; 2]>,
}

/// The sender's view of an online batch.
#[derive(Debug, Clone)]
pub struct SenderBatch {
    q: BitMatrix,
    option_masks: Vec<BitArray>,
    first_invocation: usize,
}

impl SenderBatch {
    #[must_use]
    pub fn invocations(&self) -> usize {
        self.q.rows()
    }

    #[must_use]
    pub fn options(&self) -> usize {
        self.option_masks.len()
    }

    /// Global index of the first invocation of the batch.
    #[must_use]
    pub fn first_invocation(&self) -> usize {
        self.first_invocation
    }

    /// Oracle query that masks `option` in the given invocation of the batch.
    ///
    /// It is `q_i ^ (Encode(option) & Delta)` followed by the global
    /// invocation index. The receiver obtains the same query only for the
    /// option it selected.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the indices are out of range.
    pub fn query(&self, invocation: usize, option: usize) -> Result<Vec<u8>, ErrorOT> {
        let mask = self.option_masks.get(option).ok_or_else(|| {
            ErrorOT::Argument(format!(
                "Option {option} outside a batch of {} options",
                self.option_masks.len()
            ))
        })?;
        let key = self.q.row(invocation)?.xor(mask)?;
        build_query(&key, self.first_invocation + invocation)
    }
}

/// The receiver's view of an online batch.
#[derive(Debug, Clone)]
pub struct ReceiverBatch {
    t: BitMatrix,
    first_invocation: usize,
}

impl ReceiverBatch {
    #[must_use]
    pub fn invocations(&self) -> usize {
        self.t.rows()
    }

    #[must_use]
    pub fn first_invocation(&self) -> usize {
        self.first_invocation
    }

    /// Oracle query of the selected option in the given invocation of the batch.
    ///
    /// # Errors
    ///
    /// Will return `Err` if `invocation` is out of range.
    pub fn query(&self, invocation: usize) -> Result<Vec<u8>, ErrorOT> {
        build_query(&self.t.row(invocation)?, self.first_invocation + invocation)
    }
}

fn build_query<S: BitSequence + ?Sized>(key: &S, invocation: usize) -> Result<Vec<u8>, ErrorOT> {
    let mut composer = MessageComposer::with_capacity(key.byte_len() + 4);
    composer.write_bits(key);
    composer.write_int(invocation)?;
    Ok(composer.compose())
}

/// Shared state of both roles of the extension protocol.
///
/// The engine owns the base OT, the message channel, the seeded streams and
/// the random number generator. Every draw goes through `&mut self`, so the
/// streams of the two parties advance in the same order.
///
/// If a batch fails, the streams of the two parties may no longer be aligned.
/// The engine must then be discarded.
pub struct ExtensionEngine<B, C, H = Sha256Hash> {
    base_ot: B,
    channel: C,
    code: Code,
    oracle: HashRandomOracle<H>,
    security_level: usize,
    rng: StdRng,

    sender: Option<SenderBootstrap<H>>,
    receiver: Option<ReceiverBootstrap<H>>,
    sender_invocations: usize,
    receiver_invocations: usize,
}

impl<B, C, H> ExtensionEngine<B, C, H>
where
    B: ObliviousTransferChannel,
    C: MessageChannel,
    H: HashFunction + Clone + Default,
{
    /// # Errors
    ///
    /// Will return `Err` if the parameters do not describe a valid code or
    /// if the base OT is weaker than the requested security level.
    pub fn new(
        base_ot: B,
        channel: C,
        parameters: &ExtensionParameters,
    ) -> Result<ExtensionEngine<B, C, H>, ErrorOT> {
        ExtensionEngine::with_hash(base_ot, channel, parameters, H::default())
    }
}

impl<B, C, H> ExtensionEngine<B, C, H>
where
    B: ObliviousTransferChannel,
    C: MessageChannel,
    H: HashFunction + Clone,
{
    /// # Errors
    ///
    /// Will return `Err` if the parameters do not describe a valid code or
    /// if the base OT is weaker than the requested security level.
    pub fn with_hash(
        base_ot: B,
        channel: C,
        parameters: &ExtensionParameters,
        hash: H,
    ) -> Result<ExtensionEngine<B, C, H>, ErrorOT> {
        let code = parameters.build_code()?;
        if base_ot.security_level() < parameters.security_level {
            return Err(ErrorOT::Argument(format!(
                "Base OT offers {} bits of security, the extension needs {}",
                base_ot.security_level(),
                parameters.security_level
            )));
        }
        Ok(ExtensionEngine {
            base_ot,
            channel,
            code,
            oracle: HashRandomOracle::new(hash),
            security_level: parameters.security_level,
            rng: rng::get_rng(),
            sender: None,
            receiver: None,
            sender_invocations: 0,
            receiver_invocations: 0,
        })
    }

    #[must_use]
    pub fn security_level(&self) -> usize {
        self.security_level
    }

    #[must_use]
    pub fn code_length(&self) -> usize {
        self.code.code_length()
    }

    #[must_use]
    pub fn code(&self) -> &Code {
        &self.code
    }

    #[must_use]
    pub fn oracle(&self) -> &HashRandomOracle<H> {
        &self.oracle
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Number of invocations started as sender, including failed ones.
    #[must_use]
    pub fn total_sender_invocations(&self) -> usize {
        self.sender_invocations
    }

    /// Number of invocations started as receiver, including failed ones.
    #[must_use]
    pub fn total_receiver_invocations(&self) -> usize {
        self.receiver_invocations
    }

    #[must_use]
    pub fn is_sender_bootstrapped(&self) -> bool {
        self.sender.is_some()
    }

    #[must_use]
    pub fn is_receiver_bootstrapped(&self) -> bool {
        self.receiver.is_some()
    }

    /// Checks the dimensions of a batch.
    ///
    /// # Errors
    ///
    /// Will return `Err` if a dimension is zero, if there are more options
    /// than codewords or if the invocation counter would leave 32 bits.
    fn validate_batch(
        &self,
        total_invocations: usize,
        invocations: usize,
        options: usize,
        message_bits: usize,
    ) -> Result<(), ErrorOT> {
        if invocations == 0 || options == 0 || message_bits == 0 {
            return Err(ErrorOT::Argument(format!(
                "Empty batch: {invocations} invocations, {options} options, {message_bits} bits"
            )));
        }
        if options > self.code.maximum_message() + 1 {
            return Err(ErrorOT::Argument(format!(
                "{options} options exceed the {} codewords available",
                self.code.maximum_message() + 1
            )));
        }
        let last = total_invocations
            .checked_add(invocations)
            .ok_or_else(|| ErrorOT::Argument("Invocation counter overflow".into()))?;
        if u32::try_from(last - 1).is_err() {
            return Err(ErrorOT::Argument(format!(
                "Invocation counter would reach {last}, beyond 32 bits"
            )));
        }
        Ok(())
    }

    // INITIALIZE

    // Attention: The roles are reversed during this part!
    // The sender of the extension is the receiver of the base OT.

    #[instrument(level = "debug", skip_all, err)]
    async fn bootstrap_sender(&mut self) -> Result<(), ErrorOT> {
        let code_length = self.code.code_length();
        let security_level = self.security_level;
        debug!(code_length, security_level, "bootstrapping extension sender");

        let random_choices = BitArray::random(code_length, &mut self.rng);
        let selections: Vec<usize> = random_choices
            .bits()
            .map(|bit| usize::from(u8::from(bit)))
            .collect();

        let seeds = self.base_ot.receive(&selections, 2, security_level).await?;
        if seeds.invocations() != code_length || seeds.message_bits() != security_level {
            return Err(ErrorOT::Protocol(format!(
                "Base OT returned {} seeds of {} bits, expected {code_length} of {security_level}",
                seeds.invocations(),
                seeds.message_bits()
            )));
        }

        let mut streams = Vec::with_capacity(code_length);
        for k in 0..code_length {
            streams.push(self.oracle.invoke(&seeds.invocation_result(k)?.to_bytes()));
        }

        self.sender = Some(SenderBootstrap {
            random_choices,
            streams,
        });
        Ok(())
    }

    #[instrument(level = "debug", skip_all, err)]
    async fn bootstrap_receiver(&mut self) -> Result<(), ErrorOT> {
        let code_length = self.code.code_length();
        let security_level = self.security_level;
        debug!(code_length, security_level, "bootstrapping extension receiver");

        let seeds = ObliviousTransferOptions::random(code_length, 2, security_level, &mut self.rng);
        self.base_ot.send(&seeds).await?;

        let mut streams = Vec::with_capacity(code_length);
        for k in 0..code_length {
            streams.push([
                self.oracle.invoke(&seeds.message(k, 0)?.to_bytes()),
                self.oracle.invoke(&seeds.message(k, 1)?.to_bytes()),
            ]);
        }

        self.receiver = Some(ReceiverBootstrap { streams });
        Ok(())
    }

    // ONLINE

    /// Sender side of a batch: bootstraps if needed, receives U and derives Q.
    ///
    /// The invocation counter advances as soon as the dimensions are valid,
    /// even if the batch fails afterwards.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the dimensions are invalid, if the base OT or the
    /// peer misbehaves or if the channel fails.
    #[instrument(level = "debug", skip(self), err)]
    pub async fn sender_online(
        &mut self,
        invocations: usize,
        options: usize,
        message_bits: usize,
    ) -> Result<SenderBatch, ErrorOT> {
        self.validate_batch(self.sender_invocations, invocations, options, message_bits)?;
        let first_invocation = self.sender_invocations;
        self.sender_invocations += invocations;

        if self.sender.is_none() {
            self.bootstrap_sender().await?;
        }
        let code_length = self.code.code_length();

        // Step 1 - Receive U, one row of code_length bits per invocation.
        let message = self.channel.read_message().await?;
        let mut decomposer = MessageDecomposer::new(&message);
        let u = decomposer.read_matrix(invocations, code_length)?;
        decomposer.finish()?;
        let u_transposed = u.transpose();

        let bootstrap = self
            .sender
            .as_mut()
            .ok_or_else(|| ErrorOT::Protocol("Sender is not bootstrapped".into()))?;

        // Step 2 - Column k of Q is (column k of U & Delta_k) ^ (next bits of stream k).
        let mut q_transposed = BitMatrix::new(code_length, invocations);
        for (k, stream) in bootstrap.streams.iter_mut().enumerate() {
            let mut column = u_transposed
                .row(k)?
                .and_bit(bootstrap.random_choices.bit(k));
            column.xor_assign(&stream.take_bits(invocations)?)?;
            q_transposed.set_row(k, &column)?;
        }

        // Step 3 - Precompute Encode(option) & Delta for every option.
        let mut option_masks = Vec::with_capacity(options);
        for option in 0..options {
            option_masks.push(self.code.encode(option)?.and(&bootstrap.random_choices)?);
        }

        trace!(first_invocation, "sender batch ready");
        Ok(SenderBatch {
            q: q_transposed.transpose(),
            option_masks,
            first_invocation,
        })
    }

    /// Receiver side of a batch: bootstraps if needed, derives T and sends U.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the dimensions or the selections are invalid, if
    /// the base OT misbehaves or if the channel fails.
    #[instrument(level = "debug", skip(self, selection_indices), err)]
    pub async fn receiver_online(
        &mut self,
        selection_indices: &[usize],
        options: usize,
        message_bits: usize,
    ) -> Result<ReceiverBatch, ErrorOT> {
        let invocations = selection_indices.len();
        self.validate_batch(self.receiver_invocations, invocations, options, message_bits)?;
        validate_selection_indices(selection_indices, options)?;
        let first_invocation = self.receiver_invocations;
        self.receiver_invocations += invocations;

        if self.receiver.is_none() {
            self.bootstrap_receiver().await?;
        }
        let code_length = self.code.code_length();

        let bootstrap = self
            .receiver
            .as_mut()
            .ok_or_else(|| ErrorOT::Protocol("Receiver is not bootstrapped".into()))?;

        // Step 1 - Draw T0 and T1, one row of invocations bits per code bit.
        let mut t0_transposed = BitMatrix::new(code_length, invocations);
        let mut t1_transposed = BitMatrix::new(code_length, invocations);
        for (k, [stream_0, stream_1]) in bootstrap.streams.iter_mut().enumerate() {
            t0_transposed.set_row(k, &stream_0.take_bits(invocations)?)?;
            t1_transposed.set_row(k, &stream_1.take_bits(invocations)?)?;
        }
        let t = t0_transposed.transpose();
        let t1 = t1_transposed.transpose();

        // Step 2 - Row j of U is t0_j ^ t1_j ^ Encode(s_j).
        let mut u = BitMatrix::from_bit_array(
            invocations,
            code_length,
            t.as_bit_array().xor(t1.as_bit_array())?,
        )?;
        for (j, &selection) in selection_indices.iter().enumerate() {
            let row = u.row(j)?.xor(&self.code.encode(selection)?)?;
            u.set_row(j, &row)?;
        }

        let mut composer = MessageComposer::with_capacity(invocations * code_length / 8);
        composer.write_matrix(&u);
        self.channel.write_message(&composer.compose()).await?;

        trace!(first_invocation, "receiver batch ready");
        Ok(ReceiverBatch {
            t,
            first_invocation,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::utilities::channel::{memory_channel_pair, MemoryChannel};
    use crate::utilities::ot::base::NaorPinkasObliviousTransfer;
    use crate::utilities::ot::containers::ObliviousTransferResult;
    use async_trait::async_trait;

    pub(crate) type TestEngine =
        ExtensionEngine<NaorPinkasObliviousTransfer<MemoryChannel>, MemoryChannel>;

    /// Two engines connected through in-memory channels.
    pub(crate) fn engine_pair(parameters: &ExtensionParameters) -> (TestEngine, TestEngine) {
        let (base_a, base_b) = memory_channel_pair();
        let (channel_a, channel_b) = memory_channel_pair();
        let level = parameters.security_level;
        (
            ExtensionEngine::new(
                NaorPinkasObliviousTransfer::new(base_a, level),
                channel_a,
                parameters,
            )
            .unwrap(),
            ExtensionEngine::new(
                NaorPinkasObliviousTransfer::new(base_b, level),
                channel_b,
                parameters,
            )
            .unwrap(),
        )
    }

    // Returns zero seeds of at most `seed_bits` bits without talking to anyone.
    struct LocalBaseOt {
        security_level: usize,
        seed_bits: usize,
    }

    #[async_trait]
    impl ObliviousTransferChannel for LocalBaseOt {
        fn security_level(&self) -> usize {
            self.security_level
        }

        async fn send(&mut self, _options: &ObliviousTransferOptions) -> Result<(), ErrorOT> {
            Ok(())
        }

        async fn receive(
            &mut self,
            selection_indices: &[usize],
            _number_of_options: usize,
            message_bits: usize,
        ) -> Result<ObliviousTransferResult, ErrorOT> {
            Ok(ObliviousTransferResult::new(
                selection_indices.len(),
                message_bits.min(self.seed_bits),
            ))
        }
    }

    fn check_correlation(
        sender: &TestEngine,
        sender_batch: &SenderBatch,
        receiver_batch: &ReceiverBatch,
        selections: &[usize],
    ) {
        let delta = &sender.sender.as_ref().unwrap().random_choices;
        for (j, &selection) in selections.iter().enumerate() {
            let codeword = sender.code.encode(selection).unwrap();
            let expected = sender_batch
                .q
                .row(j)
                .unwrap()
                .xor(&codeword.and(delta).unwrap())
                .unwrap();
            assert_eq!(receiver_batch.t.row(j).unwrap().to_bit_array(), expected);
            assert_eq!(
                sender_batch.query(j, selection).unwrap(),
                receiver_batch.query(j).unwrap()
            );
        }
    }

    #[test]
    fn test_parameters() {
        let parameters = ExtensionParameters::default();
        assert_eq!(parameters.security_level, 128);
        assert_eq!(parameters.code_length(), 256);
        assert_eq!(parameters.build_code().unwrap().maximum_message(), 255);

        let odd = ExtensionParameters {
            security_level: 12,
            code: CodeKind::WalshHadamard,
        };
        assert!(matches!(odd.build_code(), Err(ErrorOT::Argument(_))));

        let repeating = ExtensionParameters {
            security_level: 12,
            code: CodeKind::RepeatingBit,
        };
        assert_eq!(repeating.build_code().unwrap().code_length(), 24);

        let parsed: ExtensionParameters =
            serde_json::from_str(r#"{"security_level": 64, "code": "repeating_bit"}"#).unwrap();
        assert_eq!(parsed.code_length(), 128);
        assert_eq!(parsed.code, CodeKind::RepeatingBit);
        let defaulted: ExtensionParameters = serde_json::from_str("{}").unwrap();
        assert_eq!(defaulted, ExtensionParameters::default());
    }

    #[tokio::test]
    async fn test_online_correlation() {
        let parameters = ExtensionParameters {
            security_level: 16,
            code: CodeKind::WalshHadamard,
        };
        let (mut sender, mut receiver) = engine_pair(&parameters);

        // Two batches: the first one also bootstraps both parties.
        for (selections, options) in [(vec![0, 5, 31, 7, 7], 32), (vec![2, 0, 1], 3)] {
            let (sender_batch, receiver_batch) = tokio::join!(
                sender.sender_online(selections.len(), options, 9),
                receiver.receiver_online(&selections, options, 9)
            );
            let sender_batch = sender_batch.unwrap();
            let receiver_batch = receiver_batch.unwrap();
            assert_eq!(sender_batch.first_invocation(), receiver_batch.first_invocation());
            check_correlation(&sender, &sender_batch, &receiver_batch, &selections);
        }

        assert!(sender.is_sender_bootstrapped());
        assert!(!sender.is_receiver_bootstrapped());
        assert!(receiver.is_receiver_bootstrapped());
        assert_eq!(sender.total_sender_invocations(), 8);
        assert_eq!(receiver.total_receiver_invocations(), 8);
        assert_eq!(sender.total_receiver_invocations(), 0);
    }

    #[tokio::test]
    async fn test_online_repeating_code() {
        let parameters = ExtensionParameters {
            security_level: 10,
            code: CodeKind::RepeatingBit,
        };
        let (mut sender, mut receiver) = engine_pair(&parameters);
        let selections = vec![1, 0, 0, 1, 1, 0, 1, 0, 1, 1, 1];

        let (sender_batch, receiver_batch) = tokio::join!(
            sender.sender_online(selections.len(), 2, 4),
            receiver.receiver_online(&selections, 2, 4)
        );
        check_correlation(
            &sender,
            &sender_batch.unwrap(),
            &receiver_batch.unwrap(),
            &selections,
        );
    }

    #[tokio::test]
    async fn test_unselected_queries_differ() {
        let parameters = ExtensionParameters {
            security_level: 64,
            code: CodeKind::WalshHadamard,
        };
        let (mut sender, mut receiver) = engine_pair(&parameters);
        let selections = vec![3];

        let (sender_batch, receiver_batch) = tokio::join!(
            sender.sender_online(1, 16, 8),
            receiver.receiver_online(&selections, 16, 8)
        );
        let sender_batch = sender_batch.unwrap();
        let receiver_query = receiver_batch.unwrap().query(0).unwrap();
        for option in (0..16).filter(|&option| option != 3) {
            assert_ne!(sender_batch.query(0, option).unwrap(), receiver_query);
        }
    }

    #[tokio::test]
    async fn test_invalid_batches_are_rejected_before_io() {
        let parameters = ExtensionParameters {
            security_level: 8,
            code: CodeKind::WalshHadamard,
        };
        let (mut sender, mut receiver) = engine_pair(&parameters);

        assert!(matches!(
            sender.sender_online(2, 17, 5).await,
            Err(ErrorOT::Argument(_))
        ));
        assert!(matches!(
            sender.sender_online(0, 2, 5).await,
            Err(ErrorOT::Argument(_))
        ));
        assert!(matches!(
            receiver.receiver_online(&[0, 6], 6, 5).await,
            Err(ErrorOT::Argument(_))
        ));
        assert!(matches!(
            receiver.receiver_online(&[0, 1], 6, 0).await,
            Err(ErrorOT::Argument(_))
        ));

        assert_eq!(sender.total_sender_invocations(), 0);
        assert_eq!(receiver.total_receiver_invocations(), 0);
        assert!(!sender.is_sender_bootstrapped());
        assert!(!receiver.is_receiver_bootstrapped());
    }

    #[test]
    fn test_base_ot_must_be_as_strong_as_the_extension() {
        let parameters = ExtensionParameters::default();

        let (base, _) = memory_channel_pair();
        let (channel, _) = memory_channel_pair();
        let weak: Result<TestEngine, ErrorOT> = ExtensionEngine::new(
            NaorPinkasObliviousTransfer::new(base, 40),
            channel,
            &parameters,
        );
        assert!(matches!(weak, Err(ErrorOT::Argument(_))));

        let (channel, _) = memory_channel_pair();
        let base_ot = LocalBaseOt {
            security_level: 127,
            seed_bits: 128,
        };
        let weak: Result<ExtensionEngine<_, _>, ErrorOT> =
            ExtensionEngine::new(base_ot, channel, &parameters);
        assert!(matches!(weak, Err(ErrorOT::Argument(_))));

        let (base, _) = memory_channel_pair();
        let (channel, _) = memory_channel_pair();
        let strong: TestEngine = ExtensionEngine::new(
            NaorPinkasObliviousTransfer::new(base, 256),
            channel,
            &parameters,
        )
        .unwrap();
        assert_eq!(strong.security_level(), 128);
    }

    #[tokio::test]
    async fn test_base_ot_with_wrong_seed_length() {
        let parameters = ExtensionParameters {
            security_level: 8,
            code: CodeKind::WalshHadamard,
        };
        let (channel, _peer) = memory_channel_pair();
        let base_ot = LocalBaseOt {
            security_level: 8,
            seed_bits: 4,
        };
        let mut sender: ExtensionEngine<_, _> =
            ExtensionEngine::new(base_ot, channel, &parameters).unwrap();

        assert!(matches!(
            sender.sender_online(3, 2, 5).await,
            Err(ErrorOT::Protocol(_))
        ));
        // The failed batch still counts.
        assert_eq!(sender.total_sender_invocations(), 3);
        assert!(!sender.is_sender_bootstrapped());
    }

    #[tokio::test]
    async fn test_malformed_u() {
        let parameters = ExtensionParameters {
            security_level: 8,
            code: CodeKind::WalshHadamard,
        };
        let (channel, mut peer) = memory_channel_pair();
        let base_ot = LocalBaseOt {
            security_level: 8,
            seed_bits: 8,
        };
        let mut sender: ExtensionEngine<_, _> =
            ExtensionEngine::new(base_ot, channel, &parameters).unwrap();

        // Three invocations need 3 * 16 bits, one byte is missing.
        peer.write_message(&[0u8; 5]).await.unwrap();
        assert!(matches!(
            sender.sender_online(3, 2, 5).await,
            Err(ErrorOT::Protocol(_))
        ));

        peer.write_message(&[0u8; 7]).await.unwrap();
        assert!(matches!(
            sender.sender_online(3, 2, 5).await,
            Err(ErrorOT::Protocol(_))
        ));
        assert_eq!(sender.total_sender_invocations(), 6);

        drop(peer);
        assert!(matches!(
            sender.sender_online(1, 2, 5).await,
            Err(ErrorOT::Channel(_))
        ));
    }

    #[tokio::test]
    async fn test_with_sha3() {
        use crate::utilities::hashes::Sha3Hash;

        let parameters = ExtensionParameters {
            security_level: 8,
            code: CodeKind::WalshHadamard,
        };
        let (base_a, base_b) = memory_channel_pair();
        let (channel_a, channel_b) = memory_channel_pair();
        let mut sender = ExtensionEngine::with_hash(
            NaorPinkasObliviousTransfer::with_hash(base_a, 8, Sha3Hash),
            channel_a,
            &parameters,
            Sha3Hash,
        )
        .unwrap();
        let mut receiver = ExtensionEngine::with_hash(
            NaorPinkasObliviousTransfer::with_hash(base_b, 8, Sha3Hash),
            channel_b,
            &parameters,
            Sha3Hash,
        )
        .unwrap();

        let selections = vec![4, 2];
        let (sender_batch, receiver_batch) = tokio::join!(
            sender.sender_online(2, 6, 5),
            receiver.receiver_online(&selections, 6, 5)
        );
        let sender_batch = sender_batch.unwrap();
        let receiver_batch = receiver_batch.unwrap();
        for (j, &selection) in selections.iter().enumerate() {
            assert_eq!(
                sender_batch.query(j, selection).unwrap(),
                receiver_batch.query(j).unwrap()
            );
        }
    }
}
