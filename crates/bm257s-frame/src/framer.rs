use bytes::{Buf, BytesMut};
use tracing::debug;

use crate::codec::{first_misplaced, FRAME_LEN, START_MARKER};

/// Finds validated 15-byte windows in a byte stream that may start mid-frame
/// or lose bytes.
///
/// Bytes are appended with [`push`](Self::push) and complete windows are taken
/// out with [`next_window`](Self::next_window). A window that fails the index
/// tag check is dropped up to the offending byte and the search restarts at
/// the next start marker, so a truncated frame never stalls the stream.
#[derive(Debug, Default)]
pub struct FrameFramer {
    pending: BytesMut,
}

impl FrameFramer {
    pub fn new() -> Self {
        Self {
            pending: BytesMut::with_capacity(2 * FRAME_LEN),
        }
    }

    /// Append freshly read bytes.
    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Take the next valid window, if the pending bytes hold one.
    pub fn next_window(&mut self) -> Option<[u8; FRAME_LEN]> {
        loop {
            self.resync();
            if self.pending.len() < FRAME_LEN {
                return None;
            }

            match first_misplaced(&self.pending[..FRAME_LEN]) {
                None => {
                    let mut window = [0u8; FRAME_LEN];
                    self.pending.copy_to_slice(&mut window);
                    return Some(window);
                }
                Some(length) => {
                    let drop = length.max(1);
                    debug!(length, dropped = drop, "discarding truncated frame");
                    self.pending.advance(drop);
                }
            }
        }
    }

    /// How many bytes to read next to complete the pending frame.
    pub fn wanted(&self) -> usize {
        FRAME_LEN.saturating_sub(self.pending.len()).max(1)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Forget all pending bytes.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    fn resync(&mut self) {
        match self.pending.iter().position(|&b| b == START_MARKER) {
            Some(0) => {}
            Some(skip) => {
                debug!(skipped = skip, "resynchronising on start marker");
                self.pending.advance(skip);
            }
            None if self.pending.is_empty() => {}
            None => {
                debug!(skipped = self.pending.len(), "no start marker pending");
                self.pending.clear();
            }
        }
    }
}

#[cfg(feature = "async")]
mod async_codec {
    use bytes::BytesMut;
    use chrono::Local;
    use tokio_util::codec::Decoder;

    use super::FrameFramer;
    use crate::codec::{decode_frame, Frame};
    use crate::error::FrameError;

    /// [`Decoder`] for use under `tokio_util::codec::FramedRead`.
    #[derive(Debug, Default)]
    pub struct FrameCodec {
        framer: FrameFramer,
    }

    impl FrameCodec {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl Decoder for FrameCodec {
        type Item = Frame;
        type Error = FrameError;

        fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
            if !src.is_empty() {
                self.framer.push(&src.split());
            }
            Ok(self
                .framer
                .next_window()
                .map(|window| decode_frame(&window, Local::now())))
        }
    }
}

#[cfg(feature = "async")]
pub use async_codec::FrameCodec;
