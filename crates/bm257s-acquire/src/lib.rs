//! Background acquisition and rolling frame buffer for BM250-series multimeters.
//!
//! A worker thread pulls frames from a [`FrameReader`](bm257s_frame::FrameReader)
//! into a [`RollingBuffer`], optionally recording every raw frame to a
//! [`FrameSink`]. Foreground calls on [`Acquisition`] read the buffer and
//! report a dead worker exactly once through the [`ErrorSlot`].

pub mod acquisition;
pub mod buffer;
pub mod error;
pub mod sink;
pub mod slot;

pub use acquisition::Acquisition;
pub use buffer::{Retention, RollingBuffer, Timestamped};
pub use error::{AcquireError, BoxError, Result};
pub use sink::{parse_log_line, FileFrameLog, FrameLog, FrameSink};
pub use slot::ErrorSlot;
