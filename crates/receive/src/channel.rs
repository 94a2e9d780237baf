//! Request body sources.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::buf::Reader;
use bytes::{Buf, Bytes};
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

use crate::ReceiveError;

/// The raw, single-use byte source of a request body.
///
/// This is the value every receive call starts from. It can be read exactly
/// once; after [`ByteReadChannel::read_remaining`] the channel is gone.
pub struct ByteReadChannel {
    inner: Pin<Box<dyn AsyncRead + Send>>,
}

impl ByteReadChannel {
    /// Wraps any async reader supplied by the transport.
    pub fn from_reader(reader: impl AsyncRead + Send + 'static) -> Self {
        Self {
            inner: Box::pin(reader),
        }
    }

    /// A channel over an in-memory body.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self::from_reader(io::Cursor::new(bytes.into()))
    }

    /// A channel with no content.
    pub fn empty() -> Self {
        Self::from_bytes(Bytes::new())
    }

    /// Reads the whole remaining body.
    ///
    /// With a `limit`, at most `limit + 1` bytes are pulled from the source;
    /// a body longer than `limit` fails with [`ReceiveError::PayloadTooLarge`].
    pub async fn read_remaining(mut self, limit: Option<u64>) -> Result<Bytes, ReceiveError> {
        let mut buf = Vec::new();
        match limit {
            Some(limit) => {
                (&mut self.inner)
                    .take(limit.saturating_add(1))
                    .read_to_end(&mut buf)
                    .await?;
                if buf.len() as u64 > limit {
                    return Err(ReceiveError::PayloadTooLarge { limit });
                }
            }
            None => {
                self.inner.read_to_end(&mut buf).await?;
            }
        }
        Ok(Bytes::from(buf))
    }
}

impl AsyncRead for ByteReadChannel {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.inner.as_mut().poll_read(cx, buf)
    }
}

impl fmt::Debug for ByteReadChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ByteReadChannel { .. }")
    }
}

/// A blocking [`io::Read`] view of a body that has already been buffered.
///
/// For callers that hand the body to synchronous parsers.
pub struct InputStream {
    reader: Reader<Bytes>,
}

impl InputStream {
    pub fn new(bytes: Bytes) -> Self {
        Self {
            reader: bytes.reader(),
        }
    }

    /// Bytes not yet read.
    pub fn remaining(&self) -> usize {
        self.reader.get_ref().remaining()
    }
}

impl io::Read for InputStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl fmt::Debug for InputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputStream")
            .field("remaining", &self.remaining())
            .finish()
    }
}
