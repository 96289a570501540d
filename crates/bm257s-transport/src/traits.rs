use std::io::{ErrorKind, Read};

use crate::error::Result;

/// A blocking source of raw bytes from the meter.
///
/// `read_chunk` may return fewer bytes than requested. An empty chunk means
/// nothing arrived before the source's read timeout; it is not end-of-stream.
pub trait ByteSource: Send {
    /// Read up to `max_len` bytes.
    fn read_chunk(&mut self, max_len: usize) -> Result<Vec<u8>>;
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read_chunk(&mut self, max_len: usize) -> Result<Vec<u8>> {
        (**self).read_chunk(max_len)
    }
}

/// Adapts any [`Read`] into a [`ByteSource`].
///
/// Timeouts, `WouldBlock` and `Interrupted` become empty chunks so the caller
/// gets a chance to check for cancellation between reads.
pub struct ReadSource<R> {
    inner: R,
}

impl<R: Read + Send> ReadSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Borrow the underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Consume the adapter and return the inner reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Send> ByteSource for ReadSource<R> {
    fn read_chunk(&mut self, max_len: usize) -> Result<Vec<u8>> {
        let mut chunk = vec![0u8; max_len];
        match self.inner.read(&mut chunk) {
            Ok(n) => {
                chunk.truncate(n);
                Ok(chunk)
            }
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) =>
            {
                Ok(Vec::new())
            }
            Err(err) => Err(err.into()),
        }
    }
}

impl<R> std::fmt::Debug for ReadSource<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadSource").finish_non_exhaustive()
    }
}
