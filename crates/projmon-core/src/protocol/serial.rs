//! Serial port handling
//!
//! Opens the projector ports with their fixed line parameters.

use std::time::Duration;
use tokio_serial::{
    DataBits, FlowControl, Parity, SerialPortBuilder, SerialPortBuilderExt, SerialStream, StopBits,
};

use super::{ProtocolError, DEFAULT_BAUD_RATE};

/// Line parameters for a projector port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSettings {
    /// Bits per second
    pub baud_rate: u32,
    /// Data bits per character
    pub data_bits: DataBits,
    /// Stop bits per character
    pub stop_bits: StopBits,
    /// Parity checking
    pub parity: Parity,
}

impl Default for LineSettings {
    /// 19200 baud, 8 data bits, no parity, 2 stop bits
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::Two,
            parity: Parity::None,
        }
    }
}

impl LineSettings {
    /// Port builder for `name`, with no flow control and a short read timeout
    fn builder(&self, name: &str) -> SerialPortBuilder {
        tokio_serial::new(name, self.baud_rate)
            .data_bits(self.data_bits)
            .parity(self.parity)
            .stop_bits(self.stop_bits)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(100))
    }
}

/// Open a projector port as an async serial stream
pub fn open_port(name: &str, settings: &LineSettings) -> Result<SerialStream, ProtocolError> {
    tracing::debug!(port = name, ?settings, "opening serial port");
    let stream = settings.builder(name).open_native_async()?;
    Ok(stream)
}
