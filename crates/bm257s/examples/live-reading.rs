//! Print ten readings from a meter on a serial port, then the mean of the
//! last two seconds.
//!
//! Run with:
//!   cargo run --example live-reading -- /dev/ttyUSB0

use std::thread;
use std::time::Duration;

use bm257s::transport::SerialConfig;
use bm257s::{Multimeter, MultimeterConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let port = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/dev/ttyUSB0".to_string());

    let config = MultimeterConfig {
        window: Some(Duration::from_secs(2)),
        log: None,
    };
    let mut meter = Multimeter::open(&SerialConfig::for_port(&port), config)?;
    meter.start()?;
    eprintln!("Reading from {port}");

    let mut shown = 0;
    while shown < 10 {
        if !meter.wait(Duration::from_secs(2))? {
            eprintln!("No frame yet; is the meter's PC link switched on?");
            continue;
        }
        if let Some(reading) = meter.read(false)? {
            println!("{:<12} {reading}", reading.kind_name());
            shown += 1;
        }
        thread::sleep(Duration::from_millis(250));
    }

    if let Some(avg) = meter.average(true)? {
        println!("mean of {} readings: {}", avg.values.len(), avg.measurement);
    }
    meter.close()?;
    Ok(())
}
