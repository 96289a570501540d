use std::path::PathBuf;

/// Failure cause carried across the worker thread boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur during acquisition.
#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    /// Nothing has been buffered yet.
    #[error("buffer is empty")]
    EmptyBuffer,

    /// The worker stopped on an error. Reported once.
    #[error("acquisition failed: {0}")]
    AcquisitionFailed(#[source] BoxError),

    /// `start()` was called on a running acquisition.
    #[error("acquisition already running")]
    AlreadyRunning,

    /// `stop()` was called on a stopped acquisition.
    #[error("acquisition not running")]
    NotRunning,

    /// The worker died earlier and its failure has been reported.
    #[error("reader stopped after a failure; stop and start the acquisition again")]
    ReaderStopped,

    /// The byte source could not be recovered from the worker thread.
    #[error("byte source lost with the reader thread")]
    SourceLost,

    /// The worker thread could not be spawned.
    #[error("failed to spawn reader thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The raw frame log could not be opened.
    #[error("failed to open frame log {}: {source}", path.display())]
    Log {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] bm257s_frame::FrameError),
}

pub type Result<T> = std::result::Result<T, AcquireError>;
