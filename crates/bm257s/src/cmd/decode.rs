use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use bm257s::acquire::parse_log_line;
use bm257s::frame::{check_index_tags, decode_frame, parse_hex_window, Frame};
use bm257s::measure::{average, parse_frames};
use chrono::Local;
use tracing::debug;

use crate::cmd::DecodeArgs;
use crate::exit::{acquire_error, frame_error, io_error, measure_error, CliResult, SUCCESS};
use crate::output::{print_readings, OutputFormat, Reading};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let frames = match &args.file {
        Some(path) => frames_from_log(path)?,
        None => frames_from_hex(&args.frames)?,
    };
    debug!(count = frames.len(), mode = %args.mode_change, "decoding frames");

    let readings =
        parse_frames(&frames, args.mode_change).map_err(|err| measure_error("decode failed", err))?;

    if args.average {
        if let Some(avg) =
            average(&readings).map_err(|err| measure_error("average failed", err))?
        {
            print_readings(&[Reading::averaged(&avg)], format);
        }
    } else {
        let rows: Vec<Reading<'_>> = readings.iter().map(Reading::single).collect();
        print_readings(&rows, format);
    }
    Ok(SUCCESS)
}

fn frames_from_hex(dumps: &[String]) -> CliResult<Vec<Frame>> {
    let now = Local::now();
    dumps
        .iter()
        .map(|dump| -> CliResult<Frame> {
            let context = format!("bad frame '{dump}'");
            let raw = parse_hex_window(dump).map_err(|err| frame_error(&context, err))?;
            check_index_tags(&raw).map_err(|err| frame_error(&context, err))?;
            Ok(decode_frame(&raw, now))
        })
        .collect()
}

fn frames_from_log(path: &Path) -> CliResult<Vec<Frame>> {
    let context = format!("cannot read {}", path.display());
    let file = File::open(path).map_err(|err| io_error(&context, err))?;

    let mut frames = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|err| io_error(&context, err))?;
        if line.trim().is_empty() {
            continue;
        }
        let at = format!("{}:{}", path.display(), index + 1);
        let (timestamp, raw) = parse_log_line(&line).map_err(|err| acquire_error(&at, err))?;
        check_index_tags(&raw).map_err(|err| frame_error(&at, err))?;
        frames.push(decode_frame(&raw, timestamp));
    }
    Ok(frames)
}
