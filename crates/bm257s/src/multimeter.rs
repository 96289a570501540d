use std::path::PathBuf;
use std::time::Duration;

use bm257s_acquire::{AcquireError, Acquisition, FileFrameLog, Retention};
use bm257s_frame::FrameReader;
use bm257s_measure::{
    average, parse_frame, parse_readable_frames, Average, Measurement, ModeChange,
};
use bm257s_transport::{ByteSource, SerialConfig, SerialPortSource};
use chrono::{DateTime, Local};

use crate::error::Result;

/// Options for a [`Multimeter`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultimeterConfig {
    /// Keep every frame from this span of time instead of only the newest
    /// one. Needed for [`Multimeter::read_all`] and [`Multimeter::average`]
    /// to see more than a single reading.
    pub window: Option<Duration>,
    /// Record every raw frame to this file. The file is truncated on open.
    pub log: Option<PathBuf>,
}

impl MultimeterConfig {
    fn retention(&self) -> Retention {
        match self.window {
            Some(span) => Retention::Window(span),
            None => Retention::Count(1),
        }
    }
}

/// A BM257s multimeter read in the background.
///
/// Nothing is read until [`start`](Self::start). Readings are parsed lazily
/// from the buffered frames on each `read*` call. A frame the parser rejects
/// fails [`read`](Self::read) and is skipped by [`read_all`](Self::read_all).
pub struct Multimeter<S: ByteSource + 'static = SerialPortSource> {
    acquisition: Acquisition<S>,
    window: Option<Duration>,
}

impl Multimeter<SerialPortSource> {
    /// Open the meter on a serial port.
    pub fn open(serial: &SerialConfig, config: MultimeterConfig) -> Result<Self> {
        let source = SerialPortSource::open(serial)?;
        Self::from_source(source, config)
    }
}

impl<S: ByteSource + 'static> Multimeter<S> {
    /// Read the meter from any byte source.
    pub fn from_source(source: S, config: MultimeterConfig) -> Result<Self> {
        let mut acquisition = Acquisition::new(FrameReader::new(source), config.retention());
        if let Some(path) = &config.log {
            acquisition = acquisition.with_sink(FileFrameLog::create(path)?);
        }
        Ok(Self {
            acquisition,
            window: config.window,
        })
    }

    /// Start the background reader. Previously buffered frames are dropped.
    pub fn start(&mut self) -> Result<()> {
        Ok(self.acquisition.start()?)
    }

    pub fn stop(&mut self) -> Result<()> {
        Ok(self.acquisition.stop()?)
    }

    pub fn is_running(&self) -> bool {
        self.acquisition.is_running()
    }

    /// Block until a frame is buffered or `timeout` elapses.
    pub fn wait(&mut self, timeout: Duration) -> Result<bool> {
        Ok(self.acquisition.wait(timeout)?)
    }

    /// The newest reading, or `None` if nothing has arrived yet.
    pub fn read(&mut self, clear: bool) -> Result<Option<Measurement>> {
        match self.acquisition.latest(clear)? {
            Some(frame) => Ok(Some(parse_frame(&frame)?)),
            None => Ok(None),
        }
    }

    /// Every buffered reading, oldest first. Readings taken before the
    /// meter last changed unit are dropped, as are frames that cannot be read.
    pub fn read_all(&mut self, clear: bool) -> Result<Vec<Measurement>> {
        let frames = self.acquisition.all(clear)?;
        Ok(parse_readable_frames(&frames, ModeChange::Truncate)?)
    }

    /// Mean of every buffered reading of the current unit.
    pub fn average(&mut self, clear: bool) -> Result<Option<Average>> {
        let readings = self.read_all(clear)?;
        Ok(average(&readings)?)
    }

    /// Timestamp of the newest buffered frame.
    pub fn last_frame_at(&self) -> Option<DateTime<Local>> {
        self.acquisition
            .buffer()
            .read_latest(false)
            .ok()
            .map(|frame| frame.timestamp)
    }

    /// Averaging window this meter was opened with.
    pub fn window(&self) -> Option<Duration> {
        self.window
    }

    /// Stop the reader if it runs and release the source.
    pub fn close(mut self) -> Result<()> {
        match self.acquisition.stop() {
            Ok(()) | Err(AcquireError::NotRunning) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl<S: ByteSource + 'static> std::fmt::Debug for Multimeter<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Multimeter")
            .field("acquisition", &self.acquisition)
            .field("window", &self.window)
            .finish()
    }
}
