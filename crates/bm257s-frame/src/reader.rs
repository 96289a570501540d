use bm257s_transport::ByteSource;
use chrono::Local;

use crate::codec::{decode_frame, Frame};
use crate::error::Result;
use crate::framer::FrameFramer;

/// Pulls bytes from a [`ByteSource`] and turns them into [`Frame`]s.
///
/// Reads never ask for more than the framer still needs to complete a frame,
/// so bytes belonging to the next frame stay in the source until they are
/// wanted.
#[derive(Debug)]
pub struct FrameReader<S> {
    source: S,
    framer: FrameFramer,
}

impl<S: ByteSource> FrameReader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            framer: FrameFramer::new(),
        }
    }

    /// Run one read/decode cycle.
    ///
    /// Returns `Ok(None)` when the source timed out or the bytes read so far
    /// do not yet complete a frame. Source errors are returned as-is.
    pub fn poll_frame(&mut self) -> Result<Option<Frame>> {
        if let Some(frame) = self.decode_pending() {
            return Ok(Some(frame));
        }

        let chunk = self.source.read_chunk(self.framer.wanted())?;
        if chunk.is_empty() {
            return Ok(None);
        }
        self.framer.push(&chunk);
        Ok(self.decode_pending())
    }

    /// Drop any partially received frame.
    pub fn reset(&mut self) {
        self.framer.clear();
    }

    pub fn get_ref(&self) -> &S {
        &self.source
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Consume the reader and return the source. Pending bytes are lost.
    pub fn into_inner(self) -> S {
        self.source
    }

    fn decode_pending(&mut self) -> Option<Frame> {
        self.framer
            .next_window()
            .map(|window| decode_frame(&window, Local::now()))
    }
}
