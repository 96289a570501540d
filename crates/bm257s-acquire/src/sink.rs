use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use bm257s_frame::{parse_hex_window, FrameError, FRAME_LEN};
use chrono::{DateTime, Local};
use tracing::info;

use crate::error::{AcquireError, Result};

/// Receives every raw frame the worker decodes.
///
/// A failing sink is logged and skipped; it never stops acquisition.
pub trait FrameSink: Send {
    fn record(&mut self, raw: &[u8; FRAME_LEN], timestamp: DateTime<Local>) -> io::Result<()>;
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn record(&mut self, raw: &[u8; FRAME_LEN], timestamp: DateTime<Local>) -> io::Result<()> {
        (**self).record(raw, timestamp)
    }
}

/// Writes one line per frame: an RFC 3339 timestamp, a space, then the
/// frame as space-separated lowercase hex. Every line is flushed.
#[derive(Debug)]
pub struct FrameLog<W> {
    writer: W,
}

impl<W: Write + Send> FrameLog<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> FrameSink for FrameLog<W> {
    fn record(&mut self, raw: &[u8; FRAME_LEN], timestamp: DateTime<Local>) -> io::Result<()> {
        write!(self.writer, "{}", timestamp.to_rfc3339())?;
        for byte in raw {
            write!(self.writer, " {byte:02x}")?;
        }
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

/// A [`FrameLog`] backed by a file.
pub type FileFrameLog = FrameLog<BufWriter<File>>;

impl FileFrameLog {
    /// Create (or truncate) the log file at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| AcquireError::Log {
            path: PathBuf::from(path),
            source,
        })?;
        info!(path = %path.display(), "logging raw frames");
        Ok(FrameLog::new(BufWriter::new(file)))
    }
}

/// Parse one line written by [`FrameLog`].
pub fn parse_log_line(line: &str) -> Result<(DateTime<Local>, [u8; FRAME_LEN])> {
    let (stamp, hex) = line.trim().split_once(' ').ok_or_else(|| {
        FrameError::InvalidRawFrame(format!("missing timestamp separator in '{line}'"))
    })?;
    let timestamp = DateTime::parse_from_rfc3339(stamp)
        .map_err(|err| FrameError::InvalidRawFrame(format!("bad timestamp '{stamp}': {err}")))?
        .with_timezone(&Local);
    Ok((timestamp, parse_hex_window(hex)?))
}
