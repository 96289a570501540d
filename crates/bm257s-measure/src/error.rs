use bm257s_frame::{FrameError, SymbolSet};

/// Errors that can occur while turning frames into measurements.
#[derive(Debug, thiserror::Error)]
pub enum MeasureError {
    /// The frame's digits could not be read.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// The lit indicators match no known measurement mode.
    #[error("cannot parse multimeter frame configuration: {symbols}")]
    UnparseableConfiguration { symbols: SymbolSet },

    /// A current reading shows neither AC nor DC.
    #[error("unknown current type displayed")]
    UnknownCouplingType,

    /// The last digit of a temperature reading is not a unit letter.
    #[error("unknown temperature unit: '{0}'")]
    UnknownTemperatureUnit(char),

    /// The display shows a pattern that is invalid for the selected mode.
    #[error("unexpected display: '{text}'")]
    UnexpectedDisplay { text: String },

    /// The display text is not a number.
    #[error("invalid numeric display: '{text}'")]
    InvalidValue { text: String },

    /// The meter changed what it measures within one batch.
    #[error("meter changed from reading {from} to {to}")]
    UnitChanged {
        from: &'static str,
        to: &'static str,
    },

    /// A mode-change policy name was not recognised.
    #[error("mode change policy must be one of fail, truncate, ignore; got '{0}'")]
    InvalidModeChange(String),
}

pub type Result<T> = std::result::Result<T, MeasureError>;
