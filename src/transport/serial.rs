//! # Serial Transport
//!
//! Opens the serial link to the robot (USB-UART adapter, Bluetooth SPP
//! bridge or radio modem). The robot firmware runs the wired link at
//! 115,200 baud and the WiFi bridge UART at 250,000 baud, 8N1, no flow
//! control.

use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use super::StreamTransport;
use crate::error::{Result, SbrLinkError};

/// Default baud rate of the direct serial link
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default device paths to try (in order of preference)
pub const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyUSB0", // USB-to-serial adapters
    "/dev/ttyACM0", // USB CDC devices
    "/dev/rfcomm0", // Bluetooth SPP
];

/// Serial transport handle
pub type SerialTransport = StreamTransport<tokio_serial::SerialStream>;

impl SerialTransport {
    /// Open the first device from `paths` that accepts the settings
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/ttyUSB0"])
    /// * `baud_rate` - Line speed
    ///
    /// # Errors
    ///
    /// Returns [`SbrLinkError::SerialPortNotFound`] if none of the paths
    /// could be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sbr_link::transport::serial::{SerialTransport, DEFAULT_BAUD_RATE, DEFAULT_DEVICE_PATHS};
    ///
    /// let transport = SerialTransport::open_with_paths(DEFAULT_DEVICE_PATHS, DEFAULT_BAUD_RATE)?;
    /// # Ok::<(), sbr_link::error::SbrLinkError>(())
    /// ```
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Opened serial device at {} ({} baud)", path, baud_rate);
                    return Ok(StreamTransport::new(port, *path));
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(SbrLinkError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open one specific device
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        Self::open_with_paths(&[path], baud_rate)
    }
}

/// Open a specific serial port with 8N1 settings
fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
    let port = tokio_serial::new(path, baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .flow_control(tokio_serial::FlowControl::None)
        .open_native_async()
        .map_err(|e| SbrLinkError::Serial(format!("Failed to open {}: {}", path, e)))?;

    Ok(port)
}
