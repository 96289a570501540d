/// Errors that can occur while framing and decoding meter output.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Fewer than 15 consistently tagged bytes are available. `length` is the
    /// number of bytes before the first out-of-place index tag.
    #[error("truncated frame window of length {length}")]
    TruncatedFrame { length: usize },

    /// A digit shows a segment pattern that is not a known glyph.
    #[error("cannot read character from digit {position}")]
    UnreadableDigit { position: usize },

    /// A raw frame could not be read back from text.
    #[error("invalid raw frame: {0}")]
    InvalidRawFrame(String),

    /// An I/O error occurred while reading bytes.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The byte source failed.
    #[error("byte source error: {0}")]
    Transport(#[from] bm257s_transport::TransportError),
}

pub type Result<T> = std::result::Result<T, FrameError>;
