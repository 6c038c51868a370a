use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io;
use std::marker::PhantomData;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};

// Frames are a 4 byte big-endian length followed by one JSON document.

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("channel IO failure")]
    Io(#[from] io::Error),
    #[error("malformed message")]
    Malformed(#[from] serde_json::Error),
}

/// MessageReader decodes messages of type `T` from one end of a pipe.
pub struct MessageReader<R, T> {
    frames: FramedRead<R, LengthDelimitedCodec>,
    _pd: PhantomData<fn() -> T>,
}

impl<R, T> MessageReader<R, T>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    pub fn new(reader: R) -> Self {
        MessageReader {
            frames: FramedRead::new(reader, LengthDelimitedCodec::new()),
            _pd: PhantomData,
        }
    }

    /// Returns `Ok(None)` once the other side has closed the pipe.
    pub async fn next(&mut self) -> Result<Option<T>, ChannelError> {
        match self.frames.next().await {
            None => Ok(None),
            Some(frame) => {
                let frame = frame?;
                let message = serde_json::from_slice(&frame)?;
                Ok(Some(message))
            }
        }
    }
}

/// MessageWriter encodes messages of type `T` onto one end of a pipe.
pub struct MessageWriter<W, T> {
    frames: FramedWrite<W, LengthDelimitedCodec>,
    _pd: PhantomData<fn(T)>,
}

impl<W, T> MessageWriter<W, T>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    pub fn new(writer: W) -> Self {
        MessageWriter {
            frames: FramedWrite::new(writer, LengthDelimitedCodec::new()),
            _pd: PhantomData,
        }
    }

    /// Flushes after every message so the peer never waits on a buffered frame.
    pub async fn send(&mut self, message: &T) -> Result<(), ChannelError> {
        let encoded = serde_json::to_vec(message)?;
        self.frames.send(Bytes::from(encoded)).await?;
        Ok(())
    }
}
