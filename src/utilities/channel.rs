//! Message transport between the two parties.
//!
//! The protocols only need an ordered, reliable, full-duplex exchange of
//! whole messages. [`MemoryChannel`] connects two tasks of the same process,
//! while [`FramedChannel`] turns any byte stream into a message channel by
//! prefixing every message with its length (4 little-endian bytes).

use async_trait::async_trait;
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use futures::StreamExt;

/// Largest frame accepted by [`FramedChannel`] unless configured otherwise.
pub const DEFAULT_MAX_FRAME_LEN: usize = 1 << 30;

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel closed by the peer")]
    Closed,
    #[error("Frame of {0} bytes exceeds the limit")]
    FrameTooLarge(usize),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait MessageChannel: Send {
    async fn read_message(&mut self) -> Result<Vec<u8>, ChannelError>;

    async fn write_message(&mut self, message: &[u8]) -> Result<(), ChannelError>;
}

/// One end of an in-process duplex channel.
#[derive(Debug)]
pub struct MemoryChannel {
    outgoing: UnboundedSender<Vec<u8>>,
    incoming: UnboundedReceiver<Vec<u8>>,
}

/// Creates two connected ends: whatever one writes, the other reads.
#[must_use]
pub fn memory_channel_pair() -> (MemoryChannel, MemoryChannel) {
    let (a_to_b, from_a) = unbounded();
    let (b_to_a, from_b) = unbounded();
    (
        MemoryChannel {
            outgoing: a_to_b,
            incoming: from_b,
        },
        MemoryChannel {
            outgoing: b_to_a,
            incoming: from_a,
        },
    )
}

#[async_trait]
impl MessageChannel for MemoryChannel {
    async fn read_message(&mut self) -> Result<Vec<u8>, ChannelError> {
        self.incoming.next().await.ok_or(ChannelError::Closed)
    }

    async fn write_message(&mut self, message: &[u8]) -> Result<(), ChannelError> {
        self.outgoing
            .unbounded_send(message.to_vec())
            .map_err(|_| ChannelError::Closed)
    }
}

/// Length-prefixed messages over a byte stream.
#[derive(Debug)]
pub struct FramedChannel<T> {
    io: T,
    max_frame_len: usize,
}

impl<T> FramedChannel<T> {
    #[must_use]
    pub fn new(io: T) -> FramedChannel<T> {
        FramedChannel {
            io,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }

    #[must_use]
    pub fn with_max_frame_len(io: T, max_frame_len: usize) -> FramedChannel<T> {
        FramedChannel { io, max_frame_len }
    }

    #[must_use]
    pub fn into_inner(self) -> T {
        self.io
    }
}

#[async_trait]
impl<T> MessageChannel for FramedChannel<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn read_message(&mut self) -> Result<Vec<u8>, ChannelError> {
        let mut header = [0u8; 4];
        self.io.read_exact(&mut header).await?;
        let len = u32::from_le_bytes(header) as usize;
        if len > self.max_frame_len {
            return Err(ChannelError::FrameTooLarge(len));
        }

        let mut message = vec![0u8; len];
        self.io.read_exact(&mut message).await?;
        Ok(message)
    }

    async fn write_message(&mut self, message: &[u8]) -> Result<(), ChannelError> {
        if message.len() > self.max_frame_len || u32::try_from(message.len()).is_err() {
            return Err(ChannelError::FrameTooLarge(message.len()));
        }
        let header = (message.len() as u32).to_le_bytes();
        self.io.write_all(&header).await?;
        self.io.write_all(message).await?;
        self.io.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::io::Cursor;

    #[tokio::test]
    async fn test_memory_channel_is_ordered() {
        let (mut alice, mut bob) = memory_channel_pair();
        alice.write_message(b"first").await.unwrap();
        alice.write_message(b"second").await.unwrap();
        bob.write_message(b"reply").await.unwrap();

        assert_eq!(bob.read_message().await.unwrap(), b"first");
        assert_eq!(bob.read_message().await.unwrap(), b"second");
        assert_eq!(alice.read_message().await.unwrap(), b"reply");
    }

    #[tokio::test]
    async fn test_memory_channel_closed() {
        let (mut alice, bob) = memory_channel_pair();
        drop(bob);
        assert!(matches!(
            alice.read_message().await,
            Err(ChannelError::Closed)
        ));
        assert!(matches!(
            alice.write_message(b"lost").await,
            Err(ChannelError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_framed_channel() {
        let mut writer = FramedChannel::new(Cursor::new(Vec::new()));
        writer.write_message(b"hello").await.unwrap();
        writer.write_message(b"").await.unwrap();
        let written = writer.into_inner().into_inner();
        assert_eq!(&written[..4], &5u32.to_le_bytes());

        let mut reader = FramedChannel::new(Cursor::new(written));
        assert_eq!(reader.read_message().await.unwrap(), b"hello");
        assert_eq!(reader.read_message().await.unwrap(), b"");
        assert!(matches!(
            reader.read_message().await,
            Err(ChannelError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_framed_channel_limit() {
        let mut bytes = 100u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 100]);
        let mut reader = FramedChannel::with_max_frame_len(Cursor::new(bytes), 10);
        assert!(matches!(
            reader.read_message().await,
            Err(ChannelError::FrameTooLarge(100))
        ));
    }
}
