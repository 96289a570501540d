//! Frame-to-measurement mapping.
//!
//! Parsing runs in three steps. The metric prefix and mode flags are taken
//! out of the frame's symbol set first. The remaining symbols select the kind
//! of reading, tested in a fixed priority order. Finally the kind's parser
//! reads the value from the digit text.

use bm257s_frame::{Frame, Symbol, SymbolSet};
use tracing::{debug, warn};

use crate::config::ModeChange;
use crate::error::{MeasureError, Result};
use crate::measurement::{
    Coupling, Measurement, MeasurementKind, Prefix, Properties, TemperatureUnit,
};

/// Prefix indicators; at most one is expected, the first lit one wins.
const PREFIXES: [(Symbol, Prefix); 5] = [
    (Symbol::Kilo, Prefix::Kilo),
    (Symbol::Mega, Prefix::Mega),
    (Symbol::Milli, Prefix::Milli),
    (Symbol::Micro, Prefix::Micro),
    (Symbol::Nano, Prefix::Nano),
];

/// Kind parser: reads the kind and the displayed number from a frame.
type KindParser = fn(&Frame, &SymbolSet) -> Result<(MeasurementKind, Option<f64>)>;

/// Unit indicators in priority order; the first lit one picks the parser.
const DISPATCH: [(Symbol, KindParser); 5] = [
    (Symbol::Volt, parse_voltage),
    (Symbol::Ampere, parse_current),
    (Symbol::Ohm, parse_resistance),
    (Symbol::Farad, parse_capacitance),
    (Symbol::Hz, parse_frequency),
];

/// Parse one frame into a measurement.
pub fn parse_frame(frame: &Frame) -> Result<Measurement> {
    let mut remaining = frame.symbols;
    let properties = take_properties(&mut remaining, frame);

    let parser: KindParser = match DISPATCH
        .iter()
        .find(|(symbol, _)| remaining.contains(*symbol))
    {
        Some((_, parser)) => *parser,
        None if remaining.is_only(Symbol::Loz) => parse_text,
        None if remaining.is_empty() => parse_temperature,
        None => {
            return Err(MeasureError::UnparseableConfiguration { symbols: remaining });
        }
    };

    let (kind, display_value) = parser(frame, &remaining)?;
    Ok(Measurement::from_display(kind, display_value, properties))
}

/// Parse a batch of frames, handling a change of unit according to `mode`.
pub fn parse_frames<'a, I>(frames: I, mode: ModeChange) -> Result<Vec<Measurement>>
where
    I: IntoIterator<Item = &'a Frame>,
{
    let mut measurements: Vec<Measurement> = Vec::new();
    for frame in frames {
        push_reading(&mut measurements, parse_frame(frame)?, mode)?;
    }
    Ok(measurements)
}

/// Like [`parse_frames`], but frames the parser rejects are logged and
/// skipped instead of failing the batch.
pub fn parse_readable_frames<'a, I>(frames: I, mode: ModeChange) -> Result<Vec<Measurement>>
where
    I: IntoIterator<Item = &'a Frame>,
{
    let mut measurements: Vec<Measurement> = Vec::new();
    for frame in frames {
        match parse_frame(frame) {
            Ok(measurement) => push_reading(&mut measurements, measurement, mode)?,
            Err(err) => {
                warn!(error = %err, raw = %frame.raw_hex(), "skipping unreadable frame");
            }
        }
    }
    Ok(measurements)
}

fn push_reading(
    measurements: &mut Vec<Measurement>,
    measurement: Measurement,
    mode: ModeChange,
) -> Result<()> {
    if let Some(last) = measurements.last() {
        if last.unit() != measurement.unit() {
            match mode {
                ModeChange::Fail => {
                    return Err(MeasureError::UnitChanged {
                        from: last.unit(),
                        to: measurement.unit(),
                    });
                }
                ModeChange::Truncate => {
                    debug!(
                        from = last.unit(),
                        to = measurement.unit(),
                        dropped = measurements.len(),
                        "unit changed, dropping earlier readings"
                    );
                    measurements.clear();
                }
                ModeChange::Ignore => {}
            }
        }
    }
    measurements.push(measurement);
    Ok(())
}

fn take_properties(remaining: &mut SymbolSet, frame: &Frame) -> Properties {
    let prefix = PREFIXES
        .iter()
        .find(|(symbol, _)| remaining.contains(*symbol))
        .map_or(Prefix::None, |(symbol, prefix)| {
            remaining.remove(*symbol);
            *prefix
        });

    let mut properties = Properties::new(prefix, frame.timestamp);
    if remaining.contains(Symbol::Min) && remaining.contains(Symbol::Max) {
        remaining.remove(Symbol::Min);
        remaining.remove(Symbol::Max);
        properties.recording = true;
    } else {
        properties.min = remaining.remove(Symbol::Min);
        properties.max = remaining.remove(Symbol::Max);
    }
    properties.relative = remaining.remove(Symbol::Rel);
    properties.crest = remaining.remove(Symbol::Crest);
    properties.autorange = remaining.remove(Symbol::Auto);
    properties
}

fn coupling(symbols: &SymbolSet) -> Option<Coupling> {
    if symbols.contains(Symbol::Ac) {
        Some(Coupling::Ac)
    } else if symbols.contains(Symbol::Dc) {
        Some(Coupling::Dc)
    } else {
        None
    }
}

fn parse_float(text: &str) -> Result<f64> {
    text.trim()
        .parse()
        .map_err(|_| MeasureError::InvalidValue {
            text: text.to_string(),
        })
}

fn parse_voltage(frame: &Frame, symbols: &SymbolSet) -> Result<(MeasurementKind, Option<f64>)> {
    let text = frame.text()?;
    // `.0L` only shows up in diode test.
    let value = if text.contains(".0L") {
        None
    } else {
        Some(parse_float(&text)?)
    };

    match coupling(symbols) {
        None => Ok((MeasurementKind::DiodeTest, value)),
        Some(_) if value.is_none() => Err(MeasureError::UnexpectedDisplay { text }),
        Some(coupling) => Ok((MeasurementKind::Voltage { coupling }, value)),
    }
}

fn parse_current(frame: &Frame, symbols: &SymbolSet) -> Result<(MeasurementKind, Option<f64>)> {
    let coupling = coupling(symbols).ok_or(MeasureError::UnknownCouplingType)?;
    let value = parse_float(&frame.text()?)?;
    Ok((MeasurementKind::Current { coupling }, Some(value)))
}

fn parse_resistance(frame: &Frame, _: &SymbolSet) -> Result<(MeasurementKind, Option<f64>)> {
    let text = frame.text()?;
    // Open loop shows `0.L`, continuity mode `0L.`.
    let value = if text.contains("0.L") || text.contains("0L.") {
        None
    } else {
        Some(parse_float(&text)?)
    };
    Ok((MeasurementKind::Resistance, value))
}

fn parse_capacitance(frame: &Frame, _: &SymbolSet) -> Result<(MeasurementKind, Option<f64>)> {
    let value = parse_float(&frame.text()?)?;
    Ok((MeasurementKind::Capacitance, Some(value)))
}

fn parse_frequency(frame: &Frame, _: &SymbolSet) -> Result<(MeasurementKind, Option<f64>)> {
    let value = parse_float(&frame.text()?)?;
    Ok((MeasurementKind::Frequency, Some(value)))
}

fn parse_text(frame: &Frame, _: &SymbolSet) -> Result<(MeasurementKind, Option<f64>)> {
    Ok((MeasurementKind::Text { text: frame.text()? }, None))
}

fn parse_temperature(frame: &Frame, _: &SymbolSet) -> Result<(MeasurementKind, Option<f64>)> {
    let text = frame.text()?;
    let mut chars = text.chars();
    let last = chars.next_back().unwrap_or(' ');
    let body = chars.as_str();

    let unit = match TemperatureUnit::try_from(last) {
        Ok(unit) => unit,
        // Attaching a thermocouple mid-read briefly shows four digits and no
        // unit. Report that as a blank reading instead of failing.
        Err(MeasureError::UnknownTemperatureUnit(shown)) => {
            debug!(text = %text, shown = %shown, "transient temperature display");
            return Ok((
                MeasurementKind::Temperature {
                    unit: TemperatureUnit::Unknown,
                },
                None,
            ));
        }
        Err(err) => return Err(err),
    };

    let value = if body == "---" {
        None
    } else {
        let degrees: i64 = body.trim().parse().map_err(|_| MeasureError::InvalidValue {
            text: text.clone(),
        })?;
        Some(degrees as f64)
    };
    Ok((MeasurementKind::Temperature { unit }, value))
}

#[cfg(test)]
mod tests {
    use bm257s_frame::{decode_frame, parse_hex_window};
    use chrono::Local;

    use super::*;

    fn frame(hex: &str) -> Frame {
        decode_frame(&parse_hex_window(hex).unwrap(), Local::now())
    }

    fn parse(hex: &str) -> Measurement {
        parse_frame(&frame(hex)).unwrap()
    }

    const SAMPLES: &[(&str, &str, &str)] = &[
        ("02 1A 20 3C 47 50 6A 78 8F 9F A7 B0 C0 D0 E5", "Voltage", "513.6V [~]"),
        ("02 1c 20 3e 4b 5e 6b 7f 8b 9a ad b0 c0 d1 e5", "Voltage", "0.02mV"),
        ("02 1c 20 3e 4b 51 6a 74 8e 9c af b0 c0 d0 e5", "Voltage", "0.149V"),
        ("02 1c 20 3f 4b 5f 6b 7e 87 9e af b0 c0 d0 e5", "Voltage", "-0.068V"),
        ("02 10 20 3e 4b 5e 67 78 8a 9e a4 b0 c0 d0 e0", "Temperature", "67°F"),
        ("02 10 20 3e 4b 50 6a 7c 8f 9e a1 b0 c0 d0 e0", "Temperature", "19°C"),
        ("02 10 20 30 44 50 64 70 84 9e a4 b0 c0 d0 e0", "Temperature", "---°F"),
        ("02 10 20 3a 4d 5e 6b 7e 8b 9a ad b0 c0 d0 e0", "Temperature", "---°?"),
        ("02 18 20 3e 4b 50 6a 7e 8b 9b ad b0 c4 d0 e1", "Resistance", "10.2Ω"),
        ("02 18 20 30 4a 5f 6b 7e 8b 9a ad b1 c4 d0 e1", "Resistance", "1.002kΩ"),
        ("02 18 20 3e 4b 5e 67 71 8a 90 aa b1 c4 d0 e1", "Resistance", "6.11kΩ"),
        ("02 18 20 3a 4d 5d 67 7e 8b 9c a7 b2 c4 d0 e1", "Resistance", "2.505MΩ"),
        ("02 18 20 30 40 5e 6b 77 81 90 a0 b2 c4 d0 e1", "Resistance", "OL"),
        ("02 10 28 30 40 5e 6b 76 81 91 a0 b0 c4 d0 e1", "Resistance", "OL"),
        ("02 18 20 3e 4b 5e 6b 71 8a 9a ad b0 c1 d4 e0", "Capacitance", "0.12nF"),
        ("02 18 20 30 4a 5c 6f 7e 8b 9d a7 b0 c1 d4 e0", "Capacitance", "190.5nF"),
        ("02 18 20 30 4a 5b 6d 74 8e 90 aa b0 c0 d6 e0", "Capacitance", "1.241uF"),
        ("02 18 20 3a 4d 58 6a 7d 8f 9c a7 b0 c0 d6 e0", "Capacitance", "27.95uF"),
        ("02 1c 20 3e 4b 5a 6d 78 8a 95 ae b0 c0 d2 e3", "Current", "27.4uA"),
        ("02 14 20 30 4a 5e 6b 7a 8d 9e af b0 c8 da e2", "Current", "1028.0uA"),
        ("02 14 20 3e 4b 50 6a 7a 8d 91 aa b0 c8 d9 e2", "Current", "12.1mA"),
        ("02 14 20 3e 4b 58 6a 79 8a 9e af b0 c8 d8 e2", "Current", "7.78A"),
        ("02 1a 20 3e 4b 5f 6b 7e 8b 9c a7 b8 c0 d0 e3", "Current", "0.005A [~]"),
        ("02 10 20 3f 4b 5f 6b 7e 8b 9e ab b0 c0 d0 e4", "Diode", "-0.0V"),
        ("02 10 20 30 40 5f 6b 76 81 90 a0 b0 c0 d0 e4", "Diode", "OL"),
        ("02 18 20 3e 47 5e 6b 7f 8b 9e ab b0 c2 d0 e1", "Frequency", "60.0Hz"),
        ("02 18 20 34 4e 5c 6f 7d 8f 9e af b1 c2 d0 e1", "Frequency", "49.98kHz"),
        ("02 18 20 30 4a 5f 6b 7e 8b 9e ab b2 c2 d0 e1", "Frequency", "1.0MHz"),
        ("02 10 22 3e 4e 52 63 76 85 92 a7 b0 c0 d0 e0", "Text", "Auto"),
    ];

    #[test]
    fn sample_frames() {
        for (hex, kind, shown) in SAMPLES {
            let m = parse(hex);
            assert_eq!(m.kind_name(), *kind, "{hex}");
            assert_eq!(m.to_string(), *shown, "{hex}");
        }
    }

    #[test]
    fn values_are_in_base_units() {
        let m = parse("02 18 20 3a 4d 5d 67 7e 8b 9c a7 b2 c4 d0 e1");
        assert_eq!(m.properties.prefix, Prefix::Mega);
        assert!((m.value.unwrap() - 2.505e6).abs() < 1e-6);

        let m = parse("02 14 20 3e 4b 50 6a 7a 8d 91 aa b0 c8 d9 e2");
        assert!((m.value.unwrap() - 0.0121).abs() < 1e-12);
    }

    #[test]
    fn open_loop_has_no_value() {
        let m = parse("02 18 20 30 40 5e 6b 77 81 90 a0 b2 c4 d0 e1");
        assert_eq!(m.kind, MeasurementKind::Resistance);
        assert_eq!(m.value, None);
    }

    #[test]
    fn temperature_noise_is_a_blank_reading() {
        let m = parse("02 10 20 3a 4d 5e 6b 7e 8b 9a ad b0 c0 d0 e0");
        assert_eq!(
            m.kind,
            MeasurementKind::Temperature {
                unit: TemperatureUnit::Unknown
            }
        );
        assert_eq!(m.value, None);
        assert_eq!(m.unit(), "?");
    }

    #[test]
    fn text_display_has_no_value() {
        let m = parse("02 10 22 3e 4e 52 63 76 85 92 a7 b0 c0 d0 e0");
        assert_eq!(
            m.kind,
            MeasurementKind::Text {
                text: "Auto".to_string()
            }
        );
        assert_eq!(m.value, None);
        assert_eq!(m.unit(), "");
    }

    #[test]
    fn mode_flags() {
        let cases = [
            ("02 1A 20 3C 47 50 6A 78 8F 9F A7 B0 C0 D0 E5", None),
            ("02 11 20 3e 4b 5e 6b 7e 8b 9e a4 b0 c0 d0 e0", Some("relative")),
            ("02 18 20 3e 4b 5e 67 7c 8f 9e a4 b0 c0 d8 e8", Some("recording")),
            ("02 18 20 3e 4b 5e 67 78 8a 9e a4 b0 c0 d0 e8", Some("min")),
            ("02 18 20 3e 4b 58 6a 7e 8b 9e a4 b0 c0 d8 e0", Some("max")),
        ];
        for (hex, expected) in cases {
            let p = parse(hex).properties;
            assert_eq!(p.relative, expected == Some("relative"), "{hex}");
            assert_eq!(p.recording, expected == Some("recording"), "{hex}");
            assert_eq!(p.min, expected == Some("min"), "{hex}");
            assert_eq!(p.max, expected == Some("max"), "{hex}");
            assert!(!p.crest, "{hex}");
        }

        let crest = parse("02 12 20 3a 4d 59 6f 7e 8b 9c af b0 c8 d8 e4");
        assert!(crest.properties.crest);
        assert!(crest.properties.max);
        assert!(!crest.properties.recording);
    }

    #[test]
    fn autorange_flag() {
        assert!(parse("02 18 20 3e 4b 50 6a 7e 8b 9b ad b0 c4 d0 e1").properties.autorange);
        assert!(!parse("02 14 20 3e 4b 58 6a 79 8a 9e af b0 c8 d8 e2").properties.autorange);
    }

    #[test]
    fn current_without_coupling_fails() {
        // 7.78A with the DC indicator cleared.
        let err = parse_frame(&frame("02 10 20 3e 4b 58 6a 79 8a 9e af b0 c8 d8 e2")).unwrap_err();
        assert!(matches!(err, MeasureError::UnknownCouplingType));
    }

    #[test]
    fn overload_voltage_with_coupling_fails() {
        // Diode overload display with the DC indicator lit.
        let err = parse_frame(&frame("02 14 20 30 40 5f 6b 76 81 90 a0 b0 c0 d0 e4")).unwrap_err();
        assert!(matches!(err, MeasureError::UnexpectedDisplay { text } if text == " .0L "));
    }

    #[test]
    fn leftover_symbols_are_unparseable() {
        // Temperature frame with HOLD lit.
        let err = parse_frame(&frame("02 10 20 3e 4b 5e 67 78 8a 9e a4 b8 c0 d0 e0")).unwrap_err();
        match err {
            MeasureError::UnparseableConfiguration { symbols } => {
                assert!(symbols.is_only(Symbol::Hold));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_numeric_display_is_an_error() {
        // `Auto` with the VOLT and DC indicators lit.
        let err = parse_frame(&frame("02 14 22 3e 4e 52 63 76 85 92 a7 b0 c0 d0 e4")).unwrap_err();
        assert!(matches!(err, MeasureError::InvalidValue { .. }));
    }

    #[test]
    fn unreadable_digit_surfaces() {
        let mut raw = parse_hex_window("02 1A 20 3C 47 50 6A 78 8F 9F A7 B0 C0 D0 E5").unwrap();
        raw[5] = 0x50;
        raw[6] = 0x68;
        let err = parse_frame(&decode_frame(&raw, Local::now())).unwrap_err();
        assert!(matches!(
            err,
            MeasureError::Frame(bm257s_frame::FrameError::UnreadableDigit { position: 1 })
        ));
    }

    fn frames(hexes: &[&str]) -> Vec<Frame> {
        hexes.iter().map(|hex| frame(hex)).collect()
    }

    #[test]
    fn vrms_then_volts() {
        let batch = frames(&[
            "02 1A 20 3C 47 50 6A 78 8F 9F A7 B0 C0 D0 E5",
            "02 1c 20 3e 4b 5e 6b 7f 8b 9a ad b0 c0 d1 e5",
            "02 1c 20 3e 4b 51 6a 74 8e 9c af b0 c0 d0 e5",
        ]);
        assert!(matches!(
            parse_frames(&batch, ModeChange::Fail),
            Err(MeasureError::UnitChanged { from: "Vrms", to: "V" })
        ));
        assert_eq!(parse_frames(&batch, ModeChange::Truncate).unwrap().len(), 2);
        assert_eq!(parse_frames(&batch, ModeChange::Ignore).unwrap().len(), 3);
    }

    #[test]
    fn volts_then_temperatures() {
        let batch = frames(&[
            "02 1c 20 3f 4b 5f 6b 7e 87 9e af b0 c0 d0 e5",
            "02 10 20 3e 4b 50 6a 7c 8f 9e a1 b0 c0 d0 e0",
            "02 10 20 3e 4b 5e 67 78 8a 9e a4 b0 c0 d0 e0",
        ]);
        assert!(parse_frames(&batch, ModeChange::Fail).is_err());
        let kept = parse_frames(&batch, ModeChange::Truncate).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].to_string(), "67°F");
        assert_eq!(parse_frames(&batch, ModeChange::Ignore).unwrap().len(), 3);
    }

    #[test]
    fn two_volts_then_one_temperature() {
        let batch = frames(&[
            "02 1c 20 3e 4b 51 6a 74 8e 9c af b0 c0 d0 e5",
            "02 1c 20 3f 4b 5f 6b 7e 87 9e af b0 c0 d0 e5",
            "02 10 20 3e 4b 50 6a 7c 8f 9e a1 b0 c0 d0 e0",
        ]);
        let kept = parse_frames(&batch, ModeChange::Truncate).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].kind_name(), "Temperature");
    }

    #[test]
    fn blank_reading_keeps_unit() {
        let batch = frames(&[
            "02 10 20 3e 4b 5e 67 78 8a 9e a4 b0 c0 d0 e0",
            "02 10 20 30 44 50 64 70 84 9e a4 b0 c0 d0 e0",
        ]);
        let readings = parse_frames(&batch, ModeChange::Fail).unwrap();
        assert_eq!(readings.len(), 2);

        let avg = crate::average(&readings).unwrap().unwrap();
        assert_eq!(avg.measurement.value, readings[0].value);
        assert_eq!(avg.values.len(), 1);
    }

    #[test]
    fn unreadable_frame_fails_strict_batch() {
        let batch = frames(&[
            "02 1c 20 3e 4b 51 6a 74 8e 9c af b0 c0 d0 e5",
            "02 1c 20 3e 4b 51 68 74 8e 9c af b0 c0 d0 e5",
            "02 1c 20 3e 4b 51 6a 74 8e 9c af b0 c0 d0 e5",
        ]);
        assert!(matches!(
            parse_frames(&batch, ModeChange::Truncate),
            Err(MeasureError::Frame(bm257s_frame::FrameError::UnreadableDigit { position: 1 }))
        ));
    }

    #[test]
    fn readable_batch_skips_bad_frames() {
        let batch = frames(&[
            "02 1c 20 3e 4b 51 6a 74 8e 9c af b0 c0 d0 e5",
            "02 1c 20 3e 4b 51 68 74 8e 9c af b0 c0 d0 e5",
            "02 10 20 3e 4b 50 6a 7c 8f 9e a1 b8 c0 d0 e0",
            "02 1c 20 3e 4b 5e 6b 7f 8b 9a ad b0 c0 d1 e5",
        ]);
        let kept = parse_readable_frames(&batch, ModeChange::Fail).unwrap();
        let shown: Vec<String> = kept.iter().map(|m| m.to_string()).collect();
        assert_eq!(shown, ["0.149V", "0.02mV"]);
    }

    #[test]
    fn readable_batch_still_applies_mode() {
        let batch = frames(&[
            "02 18 20 3e 4b 50 6a 7e 8b 9b ad b0 c4 d0 e1",
            "02 1c 20 3e 4b 51 68 74 8e 9c af b0 c0 d0 e5",
            "02 1c 20 3e 4b 51 6a 74 8e 9c af b0 c0 d0 e5",
        ]);
        assert!(matches!(
            parse_readable_frames(&batch, ModeChange::Fail),
            Err(MeasureError::UnitChanged { from: "Ω", to: "V" })
        ));
        let kept = parse_readable_frames(&batch, ModeChange::Truncate).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].to_string(), "0.149V");
    }
}
