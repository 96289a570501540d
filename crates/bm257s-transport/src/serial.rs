use std::io::{ErrorKind, Read};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, SerialPortType, StopBits};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::ByteSource;

/// Baud rate of the meter's optical serial link.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Serial link settings.
///
/// Data bits, parity and stop bits are fixed by the meter (8N1) and not
/// configurable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Device name, e.g. `/dev/ttyUSB0` or `COM3`.
    pub port: String,
    /// Baud rate. Default: 9600.
    pub baud_rate: u32,
    /// Maximum time a single read blocks. This bounds how quickly a running
    /// acquisition can be stopped.
    pub read_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: Duration::from_millis(100),
        }
    }
}

impl SerialConfig {
    /// Default settings for the given port.
    pub fn for_port(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..Self::default()
        }
    }
}

/// A meter connected through an OS serial port.
pub struct SerialPortSource {
    port: Box<dyn SerialPort>,
    name: String,
}

impl SerialPortSource {
    /// Open and configure the port.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let port = serialport::new(&config.port, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.read_timeout)
            .open()
            .map_err(|source| TransportError::Open {
                port: config.port.clone(),
                source,
            })?;

        info!(port = %config.port, baud = config.baud_rate, "opened serial port");

        Ok(Self {
            port,
            name: config.port.clone(),
        })
    }

    /// Device name this source was opened with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Change the per-read timeout.
    pub fn set_read_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.port
            .set_timeout(timeout)
            .map_err(|err| TransportError::Io(err.into()))
    }
}

impl ByteSource for SerialPortSource {
    fn read_chunk(&mut self, max_len: usize) -> Result<Vec<u8>> {
        let mut chunk = vec![0u8; max_len];
        match self.port.read(&mut chunk) {
            Ok(n) => {
                chunk.truncate(n);
                Ok(chunk)
            }
            Err(err) if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => {
                Ok(Vec::new())
            }
            Err(err) => Err(err.into()),
        }
    }
}

impl std::fmt::Debug for SerialPortSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPortSource")
            .field("port", &self.name)
            .finish()
    }
}

/// A serial port visible to the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub name: String,
    /// `usb`, `pci`, `bluetooth` or `unknown`.
    pub kind: &'static str,
    /// USB product string, when the port is a USB adapter that reports one.
    pub product: Option<String>,
}

/// List serial ports, e.g. to find the meter's USB adapter.
pub fn available_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports().map_err(TransportError::Enumerate)?;
    debug!(count = ports.len(), "enumerated serial ports");
    Ok(ports
        .into_iter()
        .map(|port| {
            let (kind, product) = match port.port_type {
                SerialPortType::UsbPort(usb) => ("usb", usb.product),
                SerialPortType::PciPort => ("pci", None),
                SerialPortType::BluetoothPort => ("bluetooth", None),
                SerialPortType::Unknown => ("unknown", None),
            };
            PortInfo {
                name: port.port_name,
                kind,
                product,
            }
        })
        .collect())
}
