//! Replay a raw frame log written by `bm257s monitor --log` and print each
//! reading with its original timestamp.
//!
//! Run with:
//!   cargo run --example replay-log -- frames.log

use std::fs;

use bm257s::acquire::parse_log_line;
use bm257s::frame::{check_index_tags, decode_frame};
use bm257s::measure::{average, parse_frames, ModeChange};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .ok_or("usage: replay-log <FRAME LOG>")?;

    let mut frames = Vec::new();
    for line in fs::read_to_string(&path)?.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let (timestamp, raw) = parse_log_line(line)?;
        check_index_tags(&raw)?;
        frames.push(decode_frame(&raw, timestamp));
    }

    // Only readings after the last change of unit are kept.
    let readings = parse_frames(&frames, ModeChange::Truncate)?;
    for reading in &readings {
        println!("{} {reading}", reading.timestamp().to_rfc3339());
    }
    if let Some(avg) = average(&readings)? {
        println!("mean: {}", avg.measurement);
    }
    Ok(())
}
