//! Typed measurements parsed from decoded BM250-series display frames.
//!
//! A [`Frame`](bm257s_frame::Frame) only knows which segments and indicators
//! are lit. This crate decides what the meter is measuring:
//! - [`parse_frame`] maps one frame to a [`Measurement`]
//! - [`parse_frames`] parses a batch, applying a [`ModeChange`] policy when
//!   the meter switches units mid-batch
//! - [`parse_readable_frames`] does the same but skips frames it cannot read
//! - [`average`] folds a batch of like readings into one

pub mod config;
pub mod error;
pub mod measurement;
pub mod parser;

pub use config::ModeChange;
pub use error::{MeasureError, Result};
pub use measurement::{
    average, Average, Coupling, Measurement, MeasurementKind, Prefix, Properties,
    TemperatureUnit, DISPLAY_PRECISION,
};
pub use parser::{parse_frame, parse_frames, parse_readable_frames};
