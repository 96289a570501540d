//! Frame synchronisation and LCD segment decoding for BM250-series multimeters.
//!
//! The meter streams one 15-byte frame per display update. Every byte carries
//! its own position in the high nibble, which is what makes re-synchronising
//! a misaligned stream possible:
//! - [`FrameFramer`] finds and validates 15-byte windows in a noisy stream
//! - [`decode_frame`] turns a window into a [`Frame`] (digits, dots, sign, symbols)
//! - [`FrameReader`] runs one read/decode cycle against a byte source

pub mod codec;
pub mod error;
pub mod framer;
pub mod reader;
pub mod symbol;

pub use codec::{
    check_index_tags, decode_frame, parse_hex_window, Frame, Segments, DIGIT_COUNT, DOT_COUNT,
    FRAME_LEN, START_MARKER,
};
pub use error::{FrameError, Result};
#[cfg(feature = "async")]
pub use framer::FrameCodec;
pub use framer::FrameFramer;
pub use reader::FrameReader;
pub use symbol::{Symbol, SymbolSet, SYMBOL_LAYOUT};
