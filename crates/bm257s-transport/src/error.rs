/// Errors that can occur while pulling bytes from the meter.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The serial port could not be opened.
    #[error("could not open port {port}: {source}")]
    Open {
        port: String,
        source: serialport::Error,
    },

    /// Enumerating serial ports failed.
    #[error("could not list serial ports: {0}")]
    Enumerate(serialport::Error),

    /// An I/O error occurred on the byte stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
