use std::fmt;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::error::{MeasureError, Result};

/// Decimal places kept when converting a value back to display units.
pub const DISPLAY_PRECISION: i32 = 4;

/// Metric prefix shown next to the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Prefix {
    #[default]
    None,
    Kilo,
    Mega,
    Milli,
    Micro,
    Nano,
}

impl Prefix {
    pub fn multiplier(self) -> f64 {
        match self {
            Prefix::None => 1.0,
            Prefix::Kilo => 1.0e3,
            Prefix::Mega => 1.0e6,
            Prefix::Milli => 1.0e-3,
            Prefix::Micro => 1.0e-6,
            Prefix::Nano => 1.0e-9,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Prefix::None => "",
            Prefix::Kilo => "k",
            Prefix::Mega => "M",
            Prefix::Milli => "m",
            Prefix::Micro => "u",
            Prefix::Nano => "n",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Coupling {
    Ac,
    Dc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
    /// Shown while a probe is being attached; never carries a value.
    Unknown,
}

impl TemperatureUnit {
    pub fn symbol(self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "C",
            TemperatureUnit::Fahrenheit => "F",
            TemperatureUnit::Unknown => "?",
        }
    }
}

impl TryFrom<char> for TemperatureUnit {
    type Error = MeasureError;

    fn try_from(c: char) -> Result<Self> {
        match c {
            'C' => Ok(TemperatureUnit::Celsius),
            'F' => Ok(TemperatureUnit::Fahrenheit),
            other => Err(MeasureError::UnknownTemperatureUnit(other)),
        }
    }
}

/// What the meter was measuring, with any per-kind detail.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MeasurementKind {
    Voltage { coupling: Coupling },
    Current { coupling: Coupling },
    Resistance,
    Capacitance,
    Frequency,
    Temperature { unit: TemperatureUnit },
    DiodeTest,
    /// Free text such as `Auto` shown while switching modes.
    Text { text: String },
}

impl MeasurementKind {
    pub fn name(&self) -> &'static str {
        match self {
            MeasurementKind::Voltage { .. } => "Voltage",
            MeasurementKind::Current { .. } => "Current",
            MeasurementKind::Resistance => "Resistance",
            MeasurementKind::Capacitance => "Capacitance",
            MeasurementKind::Frequency => "Frequency",
            MeasurementKind::Temperature { .. } => "Temperature",
            MeasurementKind::DiodeTest => "Diode",
            MeasurementKind::Text { .. } => "Text",
        }
    }

    /// Unit label; two readings are of the same thing iff their units match.
    pub fn unit(&self) -> &'static str {
        match self {
            MeasurementKind::Voltage {
                coupling: Coupling::Ac,
            } => "Vrms",
            MeasurementKind::Voltage { .. } | MeasurementKind::DiodeTest => "V",
            MeasurementKind::Current {
                coupling: Coupling::Ac,
            } => "Arms",
            MeasurementKind::Current { .. } => "A",
            MeasurementKind::Resistance => "Ω",
            MeasurementKind::Capacitance => "F",
            MeasurementKind::Frequency => "Hz",
            MeasurementKind::Temperature { unit } => unit.symbol(),
            MeasurementKind::Text { .. } => "",
        }
    }

    fn base_symbol(&self) -> &'static str {
        match self {
            MeasurementKind::Voltage { .. } | MeasurementKind::DiodeTest => "V",
            MeasurementKind::Current { .. } => "A",
            other => other.unit(),
        }
    }

    fn coupling(&self) -> Option<Coupling> {
        match self {
            MeasurementKind::Voltage { coupling } | MeasurementKind::Current { coupling } => {
                Some(*coupling)
            }
            _ => None,
        }
    }
}

/// Mode indicators shared by every kind of reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Properties {
    pub prefix: Prefix,
    pub timestamp: DateTime<Local>,
    /// AUTO: the meter picks the range.
    pub autorange: bool,
    /// MIN and MAX together: min/max recording is active.
    pub recording: bool,
    pub min: bool,
    pub max: bool,
    /// CREST: peak hold.
    pub crest: bool,
    /// REL: relative to a stored zero.
    pub relative: bool,
}

impl Properties {
    pub fn new(prefix: Prefix, timestamp: DateTime<Local>) -> Self {
        Self {
            prefix,
            timestamp,
            autorange: false,
            recording: false,
            min: false,
            max: false,
            crest: false,
            relative: false,
        }
    }
}

/// One reading.
///
/// `value` is in base units with the prefix already applied; `None` means the
/// meter showed an open, overload or blank display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    #[serde(flatten)]
    pub kind: MeasurementKind,
    pub value: Option<f64>,
    pub properties: Properties,
}

impl Measurement {
    /// Build from the number as it appeared on the display.
    pub fn from_display(
        kind: MeasurementKind,
        display_value: Option<f64>,
        properties: Properties,
    ) -> Self {
        let value = display_value.map(|v| v * properties.prefix.multiplier());
        Self {
            kind,
            value,
            properties,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn unit(&self) -> &'static str {
        self.kind.unit()
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.properties.timestamp
    }

    /// Unit as shown on the meter, e.g. `mV` or `°F`.
    pub fn display_unit(&self) -> String {
        match &self.kind {
            MeasurementKind::Temperature { unit } => format!("°{}", unit.symbol()),
            kind => format!("{}{}", self.properties.prefix.symbol(), kind.base_symbol()),
        }
    }

    /// The value converted back to display units, rounded to
    /// [`DISPLAY_PRECISION`] places.
    pub fn display_value(&self) -> Option<f64> {
        let scale = 10f64.powi(DISPLAY_PRECISION);
        self.value
            .map(|v| (v / self.properties.prefix.multiplier() * scale).round() / scale)
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, self.display_value()) {
            (MeasurementKind::Text { text }, _) => f.write_str(text),
            (MeasurementKind::Temperature { unit }, Some(v)) => {
                write!(f, "{}°{}", format_temperature(v), unit.symbol())
            }
            (MeasurementKind::Temperature { unit }, None) => write!(f, "---°{}", unit.symbol()),
            (kind, value) => {
                match value {
                    Some(v) => write!(f, "{v:?}{}", self.display_unit())?,
                    None => f.write_str("OL")?,
                }
                if kind.coupling() == Some(Coupling::Ac) {
                    f.write_str(" [~]")?;
                }
                Ok(())
            }
        }
    }
}

fn format_temperature(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v:?}")
    }
}

/// Several readings folded into one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Average {
    /// The latest reading, with `value` replaced by the mean.
    pub measurement: Measurement,
    /// Every value that went into the mean.
    pub values: Vec<f64>,
}

/// Average the present values of `measurements`.
///
/// Absent values are skipped. Returns `None` for an empty slice and
/// [`MeasureError::UnitChanged`] if the readings do not all share a unit.
pub fn average(measurements: &[Measurement]) -> Result<Option<Average>> {
    let Some(latest) = measurements.last() else {
        return Ok(None);
    };

    let mut values = Vec::with_capacity(measurements.len());
    for m in measurements {
        if m.unit() != latest.unit() {
            return Err(MeasureError::UnitChanged {
                from: m.unit(),
                to: latest.unit(),
            });
        }
        values.extend(m.value);
    }

    let mut measurement = latest.clone();
    if !values.is_empty() {
        measurement.value = Some(values.iter().sum::<f64>() / values.len() as f64);
    }
    Ok(Some(Average {
        measurement,
        values,
    }))
}
