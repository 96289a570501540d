//! Byte-source abstraction over the multimeter's serial output.
//!
//! This is the lowest layer of bm257s. The decoder never talks to an OS
//! serial API directly; it pulls chunks from a [`ByteSource`]:
//! - [`SerialPortSource`] for a real meter (9600 baud, 8N1)
//! - [`ReadSource`] for anything implementing [`std::io::Read`]

pub mod error;
pub mod serial;
pub mod traits;

pub use error::{Result, TransportError};
pub use serial::{available_ports, PortInfo, SerialConfig, SerialPortSource, DEFAULT_BAUD_RATE};
pub use traits::{ByteSource, ReadSource};
