use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MeasureError;

/// What a batch parse does when the meter starts measuring something else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeChange {
    /// Stop with [`MeasureError::UnitChanged`].
    #[default]
    Fail,
    /// Keep only the trailing run of readings in the final unit.
    Truncate,
    /// Keep everything. Averaging a mixed batch still fails.
    Ignore,
}

impl ModeChange {
    pub fn as_str(self) -> &'static str {
        match self {
            ModeChange::Fail => "fail",
            ModeChange::Truncate => "truncate",
            ModeChange::Ignore => "ignore",
        }
    }
}

impl fmt::Display for ModeChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModeChange {
    type Err = MeasureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fail" => Ok(ModeChange::Fail),
            "truncate" => Ok(ModeChange::Truncate),
            "ignore" => Ok(ModeChange::Ignore),
            other => Err(MeasureError::InvalidModeChange(other.to_string())),
        }
    }
}
