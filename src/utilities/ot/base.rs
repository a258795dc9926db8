/// This file implements the 1-out-of-N oblivious transfer of Naor and Pinkas
/// (Section 3 of <https://dl.acm.org/doi/10.5555/365411.365502>, "Efficient
/// Oblivious Transfer Protocols"). It serves as the base OT for the extension
/// protocol, but it can also be used on its own.
///
/// We work over the curve secp256k1 and write the group additively. For each
/// invocation, the protocol has two messages from the sender and one from
/// the receiver:
///
/// 1. The sender samples r and random points C_1, ..., C_{N-1} and transmits
///    them together with R = r * G.
/// 2. The receiver with choice s samples k and sets PK_s = k * G. It transmits
///    PK_0, which equals PK_s if s = 0 and C_s - PK_s otherwise.
/// 3. The sender computes r * PK_0 and r * PK_j = r * C_j - r * PK_0 for j >= 1.
///    Every message is masked with the random oracle evaluated at r * PK_j.
///    The receiver can only compute r * PK_s = k * R.
///
/// All invocations of a batch are processed together, so the whole batch
/// takes three messages.
use async_trait::async_trait;
use k256::elliptic_curve::Field;
use k256::{AffinePoint, ProjectivePoint, Scalar};
use rand::rngs::StdRng;
use tracing::{debug, instrument};

use crate::utilities::bits::byte_length;
use crate::utilities::channel::MessageChannel;
use crate::utilities::encoding::{MessageComposer, MessageDecomposer};
use crate::utilities::hashes::{point_from_bytes, point_to_bytes, HashFunction, Sha256Hash};
use crate::utilities::oracle::HashRandomOracle;
use crate::utilities::ot::containers::{ObliviousTransferOptions, ObliviousTransferResult};
use crate::utilities::ot::{validate_selection_indices, ErrorOT, ObliviousTransferChannel};
use crate::utilities::rng;

/// Length of a compressed point.
const POINT_LEN: usize = 33;

pub struct NaorPinkasObliviousTransfer<C, H = Sha256Hash> {
    channel: C,
    oracle: HashRandomOracle<H>,
    security_level: usize,
    rng: StdRng,
}

impl<C: MessageChannel, H: HashFunction + Clone + Default> NaorPinkasObliviousTransfer<C, H> {
    #[must_use]
    pub fn new(channel: C, security_level: usize) -> NaorPinkasObliviousTransfer<C, H> {
        NaorPinkasObliviousTransfer::with_hash(channel, security_level, H::default())
    }
}

impl<C: MessageChannel, H: HashFunction + Clone> NaorPinkasObliviousTransfer<C, H> {
    #[must_use]
    pub fn with_hash(
        channel: C,
        security_level: usize,
        hash: H,
    ) -> NaorPinkasObliviousTransfer<C, H> {
        NaorPinkasObliviousTransfer {
            channel,
            oracle: HashRandomOracle::new(hash),
            security_level,
            rng: rng::get_rng(),
        }
    }

    #[must_use]
    pub fn into_channel(self) -> C {
        self.channel
    }

    fn random_nonzero_scalar(&mut self) -> Scalar {
        let mut scalar = Scalar::ZERO;
        while scalar == Scalar::ZERO {
            scalar = Scalar::random(&mut self.rng);
        }
        scalar
    }

    // Every key is bound to its position in the batch, so equal points in
    // different positions still give independent masks.
    fn key_query(key: &AffinePoint, invocation: usize, option: usize) -> Result<Vec<u8>, ErrorOT> {
        let mut composer = MessageComposer::with_capacity(POINT_LEN + 8);
        composer.write_bytes(&point_to_bytes(key));
        composer.write_int(invocation)?;
        composer.write_int(option)?;
        Ok(composer.compose())
    }
}

fn read_point(decomposer: &mut MessageDecomposer<'_>) -> Result<AffinePoint, ErrorOT> {
    let bytes = decomposer.read_bytes(POINT_LEN)?;
    point_from_bytes(bytes).ok_or_else(|| ErrorOT::Protocol("Received an invalid point".into()))
}

#[async_trait]
impl<C, H> ObliviousTransferChannel for NaorPinkasObliviousTransfer<C, H>
where
    C: MessageChannel,
    H: HashFunction + Clone,
{
    fn security_level(&self) -> usize {
        self.security_level
    }

    #[instrument(level = "debug", skip_all, err)]
    async fn send(&mut self, options: &ObliviousTransferOptions) -> Result<(), ErrorOT> {
        let invocations = options.invocations();
        let number_of_options = options.options();
        if number_of_options == 0 {
            return Err(ErrorOT::Argument("At least one option is needed".into()));
        }
        debug!(invocations, number_of_options, "naor-pinkas send");

        // Step 1 - Sample r and the points C_j for every invocation.
        let mut secrets: Vec<Scalar> = Vec::with_capacity(invocations);
        let mut points_c: Vec<Vec<ProjectivePoint>> = Vec::with_capacity(invocations);

        let mut composer =
            MessageComposer::with_capacity(8 + invocations * number_of_options * POINT_LEN);
        composer.write_int(invocations)?;
        composer.write_int(number_of_options)?;
        for _ in 0..invocations {
            let r = self.random_nonzero_scalar();
            composer.write_bytes(&point_to_bytes(&(AffinePoint::GENERATOR * &r).to_affine()));

            let mut c = Vec::with_capacity(number_of_options - 1);
            for _ in 1..number_of_options {
                let point = ProjectivePoint::GENERATOR * self.random_nonzero_scalar();
                composer.write_bytes(&point_to_bytes(&point.to_affine()));
                c.push(point);
            }

            secrets.push(r);
            points_c.push(c);
        }
        self.channel.write_message(&composer.compose()).await?;

        // Step 2 - Receive PK_0 for every invocation.
        let message = self.channel.read_message().await?;
        let mut decomposer = MessageDecomposer::new(&message);
        let mut public_keys: Vec<AffinePoint> = Vec::with_capacity(invocations);
        for _ in 0..invocations {
            public_keys.push(read_point(&mut decomposer)?);
        }
        decomposer.finish()?;

        // Step 3 - Mask every message with the key of its option.
        let mut composer = MessageComposer::with_capacity(
            invocations * number_of_options * byte_length(options.message_bits()),
        );
        for i in 0..invocations {
            let r = secrets[i];
            let key_0 = ProjectivePoint::from(public_keys[i]) * r;

            for j in 0..number_of_options {
                let key = if j == 0 {
                    key_0
                } else {
                    points_c[i][j - 1] * r - key_0
                };

                let query = Self::key_query(&key.to_affine(), i, j)?;
                let masked = self.oracle.mask(&options.message(i, j)?, &query)?;
                composer.write_bits(&masked);
            }
        }
        self.channel.write_message(&composer.compose()).await?;

        Ok(())
    }

    #[instrument(level = "debug", skip_all, err)]
    async fn receive(
        &mut self,
        selection_indices: &[usize],
        number_of_options: usize,
        message_bits: usize,
    ) -> Result<ObliviousTransferResult, ErrorOT> {
        validate_selection_indices(selection_indices, number_of_options)?;
        let invocations = selection_indices.len();
        debug!(invocations, number_of_options, "naor-pinkas receive");

        // Step 1 - Receive R and the points C_j.
        let message = self.channel.read_message().await?;
        let mut decomposer = MessageDecomposer::new(&message);
        let sent_invocations = decomposer.read_int()?;
        let sent_options = decomposer.read_int()?;
        if sent_invocations != invocations || sent_options != number_of_options {
            return Err(ErrorOT::Protocol(format!(
                "Sender offers {sent_invocations} invocations of {sent_options} options, expected {invocations} of {number_of_options}"
            )));
        }

        let mut points_r: Vec<AffinePoint> = Vec::with_capacity(invocations);
        let mut selected_c: Vec<Option<AffinePoint>> = Vec::with_capacity(invocations);
        for &selection in selection_indices {
            points_r.push(read_point(&mut decomposer)?);
            let mut selected = None;
            for j in 1..number_of_options {
                let point = read_point(&mut decomposer)?;
                if j == selection {
                    selected = Some(point);
                }
            }
            selected_c.push(selected);
        }
        decomposer.finish()?;

        // Step 2 - Compute PK_0 from the choice and transmit it.
        let mut secrets: Vec<Scalar> = Vec::with_capacity(invocations);
        let mut composer = MessageComposer::with_capacity(invocations * POINT_LEN);
        for selected in &selected_c {
            let k = self.random_nonzero_scalar();
            let public_key = ProjectivePoint::GENERATOR * k;

            let public_key_0 = match selected {
                None => public_key,
                Some(c) => ProjectivePoint::from(*c) - public_key,
            };
            composer.write_bytes(&point_to_bytes(&public_key_0.to_affine()));
            secrets.push(k);
        }
        self.channel.write_message(&composer.compose()).await?;

        // Step 3 - Unmask the selected message with k * R.
        let message = self.channel.read_message().await?;
        let mut decomposer = MessageDecomposer::new(&message);
        let mut result = ObliviousTransferResult::new(invocations, message_bits);
        for (i, &selection) in selection_indices.iter().enumerate() {
            for j in 0..number_of_options {
                let masked = decomposer.read_bits(message_bits)?;
                if j == selection {
                    let key = (points_r[i] * &secrets[i]).to_affine();
                    let query = Self::key_query(&key, i, j)?;
                    result.set_invocation_result(i, &self.oracle.mask(&masked, &query)?)?;
                }
            }
        }
        decomposer.finish()?;

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utilities::bits::BitSequence;
    use crate::utilities::channel::memory_channel_pair;
    use crate::utilities::hashes::Sha3Hash;
    use rand::Rng;

    #[tokio::test]
    async fn test_ot_base() {
        let (sender_channel, receiver_channel) = memory_channel_pair();
        let mut sender = NaorPinkasObliviousTransfer::<_, Sha256Hash>::new(sender_channel, 128);
        let mut receiver = NaorPinkasObliviousTransfer::<_, Sha256Hash>::new(receiver_channel, 128);

        let mut rng = rng::get_rng();
        let options = ObliviousTransferOptions::random(10, 5, 37, &mut rng);
        let selections: Vec<usize> = (0..10).map(|_| rng.gen_range(0..5)).collect();

        let (sent, received) = tokio::join!(
            sender.send(&options),
            receiver.receive(&selections, 5, 37)
        );
        sent.unwrap();
        let result = received.unwrap();

        for (i, &selection) in selections.iter().enumerate() {
            assert_eq!(
                result.invocation_result(i).unwrap().to_bit_array(),
                options.message(i, selection).unwrap().to_bit_array()
            );
        }
    }

    #[tokio::test]
    async fn test_ot_base_one_of_two() {
        let (sender_channel, receiver_channel) = memory_channel_pair();
        let mut sender = NaorPinkasObliviousTransfer::with_hash(sender_channel, 128, Sha3Hash);
        let mut receiver = NaorPinkasObliviousTransfer::with_hash(receiver_channel, 128, Sha3Hash);

        let mut rng = rng::get_rng();
        let options = ObliviousTransferOptions::random(16, 2, 128, &mut rng);
        let selections: Vec<usize> = (0..16).map(|i| i % 2).collect();

        let (sent, received) = tokio::join!(
            sender.send(&options),
            receiver.receive(&selections, 2, 128)
        );
        sent.unwrap();
        let result = received.unwrap();

        for (i, &selection) in selections.iter().enumerate() {
            assert_eq!(
                result.invocation_result(i).unwrap().to_bit_array(),
                options.message(i, selection).unwrap().to_bit_array()
            );
            assert_ne!(
                result.invocation_result(i).unwrap().to_bit_array(),
                options.message(i, 1 - selection).unwrap().to_bit_array()
            );
        }
    }

    #[tokio::test]
    async fn test_ot_base_rejects_bad_selection() {
        let (_, receiver_channel) = memory_channel_pair();
        let mut receiver = NaorPinkasObliviousTransfer::<_, Sha256Hash>::new(receiver_channel, 128);
        assert!(matches!(
            receiver.receive(&[0, 3], 3, 8).await,
            Err(ErrorOT::Argument(_))
        ));
    }

    #[tokio::test]
    async fn test_ot_base_dimension_mismatch() {
        let (sender_channel, receiver_channel) = memory_channel_pair();
        let mut sender = NaorPinkasObliviousTransfer::<_, Sha256Hash>::new(sender_channel, 128);
        let mut receiver = NaorPinkasObliviousTransfer::<_, Sha256Hash>::new(receiver_channel, 128);

        let options = ObliviousTransferOptions::new(3, 4, 8);
        let send = async {
            // The receiver aborts, so the sender never gets an answer.
            let _ = sender.send(&options).await;
        };
        let (_, received) = tokio::join!(send, async move {
            let result = receiver.receive(&[0, 1], 4, 8).await;
            drop(receiver);
            result
        });
        assert!(matches!(received, Err(ErrorOT::Protocol(_))));
    }
}
