use bm257s_acquire::AcquireError;
use bm257s_frame::FrameError;
use bm257s_measure::MeasureError;
use bm257s_transport::TransportError;

/// Any failure surfaced by a [`Multimeter`](crate::Multimeter).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Measure(#[from] MeasureError),

    #[error(transparent)]
    Acquire(#[from] AcquireError),
}

pub type Result<T> = std::result::Result<T, Error>;
