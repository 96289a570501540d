use std::io::IsTerminal;

use bm257s::measure::{Average, Measurement, Properties};
use bm257s::transport::PortInfo;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// A single reading, or the mean of `samples` readings.
#[derive(Clone, Copy)]
pub struct Reading<'a> {
    pub measurement: &'a Measurement,
    pub samples: Option<usize>,
}

impl<'a> Reading<'a> {
    pub fn single(measurement: &'a Measurement) -> Self {
        Self {
            measurement,
            samples: None,
        }
    }

    pub fn averaged(average: &'a Average) -> Self {
        Self {
            measurement: &average.measurement,
            samples: Some(average.values.len()),
        }
    }
}

#[derive(Serialize)]
struct ReadingOutput<'a> {
    #[serde(flatten)]
    measurement: &'a Measurement,
    display: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    samples: Option<usize>,
}

#[derive(Serialize)]
struct PortOutput<'a> {
    name: &'a str,
    kind: &'a str,
    product: Option<&'a str>,
}

pub fn print_readings(readings: &[Reading<'_>], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for reading in readings {
                let out = ReadingOutput {
                    measurement: reading.measurement,
                    display: reading.measurement.to_string(),
                    samples: reading.samples,
                };
                println!(
                    "{}",
                    serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        OutputFormat::Table => {
            let averaged = readings.iter().any(|r| r.samples.is_some());
            let mut header = vec!["TIME", "KIND", "READING", "FLAGS"];
            if averaged {
                header.push("SAMPLES");
            }

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(header);
            for reading in readings {
                let m = reading.measurement;
                let mut row = vec![
                    m.timestamp().format("%H:%M:%S%.3f").to_string(),
                    m.kind_name().to_string(),
                    m.to_string(),
                    flags(&m.properties).join(" "),
                ];
                if averaged {
                    row.push(reading.samples.map(|n| n.to_string()).unwrap_or_default());
                }
                table.add_row(row);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for reading in readings {
                let m = reading.measurement;
                let mut line = format!(
                    "{} {:<11} {}",
                    m.timestamp().format("%H:%M:%S%.3f"),
                    m.kind_name(),
                    m
                );
                let flags = flags(&m.properties);
                if !flags.is_empty() {
                    line.push_str(&format!(" [{}]", flags.join(" ")));
                }
                if let Some(samples) = reading.samples {
                    line.push_str(&format!(" (n={samples})"));
                }
                println!("{line}");
            }
        }
        OutputFormat::Raw => {
            for reading in readings {
                println!("{}", reading.measurement);
            }
        }
    }
}

pub fn print_ports(ports: &[PortInfo], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out: Vec<PortOutput<'_>> = ports
                .iter()
                .map(|port| PortOutput {
                    name: &port.name,
                    kind: port.kind,
                    product: port.product.as_deref(),
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PORT", "TYPE", "PRODUCT"]);
            for port in ports {
                table.add_row(vec![
                    port.name.clone(),
                    port.kind.to_string(),
                    port.product.clone().unwrap_or_default(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for port in ports {
                match &port.product {
                    Some(product) => println!("{} ({}, {})", port.name, port.kind, product),
                    None => println!("{} ({})", port.name, port.kind),
                }
            }
        }
        OutputFormat::Raw => {
            for port in ports {
                println!("{}", port.name);
            }
        }
    }
}

/// Mode indicators as they read on the LCD.
fn flags(properties: &Properties) -> Vec<&'static str> {
    [
        (properties.autorange, "AUTO"),
        (properties.relative, "REL"),
        (properties.recording, "MAX MIN"),
        (properties.min, "MIN"),
        (properties.max, "MAX"),
        (properties.crest, "CREST"),
    ]
    .into_iter()
    .filter_map(|(lit, name)| lit.then_some(name))
    .collect()
}
