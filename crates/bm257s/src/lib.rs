//! Serial decoder and acquisition buffer for the Brymen BM257s multimeter.
//!
//! The meter streams its LCD contents as 15-byte segment frames over an
//! optical serial link. bm257s resynchronises on that stream, decodes the
//! lit segments and indicators, and turns them into typed measurements.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte sources (serial port, any `Read`)
//! - [`frame`]: frame synchronisation and segment decoding
//! - [`measure`]: frame-to-measurement parsing and averaging
//! - [`acquire`]: background reader thread and rolling frame buffer
//! - [`Multimeter`]: one handle tying the layers together
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use bm257s::transport::SerialConfig;
//! use bm257s::{Multimeter, MultimeterConfig};
//!
//! # fn main() -> bm257s::Result<()> {
//! let mut meter = Multimeter::open(&SerialConfig::for_port("/dev/ttyUSB0"), MultimeterConfig::default())?;
//! meter.start()?;
//! if meter.wait(Duration::from_secs(2))? {
//!     if let Some(reading) = meter.read(true)? {
//!         println!("{reading}");
//!     }
//! }
//! meter.close()
//! # }
//! ```

pub mod error;
pub mod multimeter;

pub use error::{Error, Result};
pub use multimeter::{Multimeter, MultimeterConfig};

/// Re-export transport types.
pub mod transport {
    pub use bm257s_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use bm257s_frame::*;
}

/// Re-export measurement types.
pub mod measure {
    pub use bm257s_measure::*;
}

/// Re-export acquisition types.
pub mod acquire {
    pub use bm257s_acquire::*;
}
