use std::fmt;
use std::io;

use bm257s::acquire::AcquireError;
use bm257s::frame::FrameError;
use bm257s::measure::MeasureError;
use bm257s::transport::TransportError;
use bm257s::Error;

// Exit codes follow sysexits.h where one fits.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

fn io_code(kind: io::ErrorKind) -> i32 {
    match kind {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound => USAGE,
        _ => INTERNAL,
    }
}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    CliError::new(io_code(err.kind()), format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::Transport(err) => transport_error(context, err),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn measure_error(context: &str, err: MeasureError) -> CliError {
    match err {
        MeasureError::Frame(err) => frame_error(context, err),
        MeasureError::InvalidModeChange(_) => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn acquire_error(context: &str, err: AcquireError) -> CliError {
    match err {
        AcquireError::Frame(err) => frame_error(context, err),
        AcquireError::Log { ref source, .. } => {
            CliError::new(io_code(source.kind()), format!("{context}: {err}"))
        }
        AcquireError::AcquisitionFailed(cause) => match cause.downcast::<FrameError>() {
            Ok(err) => frame_error(context, *err),
            Err(other) => CliError::new(FAILURE, format!("{context}: {other}")),
        },
        AcquireError::Spawn(source) => CliError::new(INTERNAL, format!("{context}: {source}")),
        other => CliError::new(FAILURE, format!("{context}: {other}")),
    }
}

pub fn meter_error(context: &str, err: Error) -> CliError {
    match err {
        Error::Transport(err) => transport_error(context, err),
        Error::Frame(err) => frame_error(context, err),
        Error::Measure(err) => measure_error(context, err),
        Error::Acquire(err) => acquire_error(context, err),
    }
}
