//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use crate::error::{Result, SbrLinkError};
use crate::protocol::framer::{Convention, FramerConfig, DEFAULT_BUFFER_CAPACITY, ENVELOPE_PREFIX};
use crate::protocol::packet::MAX_FRAME_SIZE;
use crate::robot::scheduler::{DEFAULT_SAMPLE_INTERVAL_US, MIN_SAMPLE_INTERVAL_US};
use crate::transport::serial::DEFAULT_BAUD_RATE;
use crate::transport::udp::{DEFAULT_LOCAL_ADDR, DEFAULT_ROBOT_ADDR};

/// Baud rates the robot firmware can be built for
pub const SUPPORTED_BAUD_RATES: [u32; 5] = [9_600, 57_600, 115_200, 250_000, 500_000];

/// Room for one maximal frame behind a `\r\n+IPD,34:` header
pub const MIN_BUFFER_CAPACITY: usize = ENVELOPE_PREFIX.len() + 2 + 1 + MAX_FRAME_SIZE;

/// Upper bound on the receive buffer
pub const MAX_BUFFER_CAPACITY: usize = 1024;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub link: LinkConfig,

    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub udp: UdpConfig,

    #[serde(default)]
    pub framer: FramerSection,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub robot: RobotConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which transport carries the frames
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Serial,
    Udp,
}

/// Link selection
#[derive(Debug, Deserialize, Clone)]
pub struct LinkConfig {
    #[serde(default = "default_transport")]
    pub transport: TransportKind,

    #[serde(default = "default_convention")]
    pub convention: Convention,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// UDP bridge configuration
#[derive(Debug, Deserialize, Clone)]
pub struct UdpConfig {
    #[serde(default = "default_local_addr")]
    pub local_addr: String,

    #[serde(default = "default_robot_addr")]
    pub robot_addr: String,
}

/// Receive buffer configuration
#[derive(Debug, Deserialize, Clone)]
pub struct FramerSection {
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
}

/// Telemetry log configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,

    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Robot behavior configuration
///
/// Read by the robot-side command consumer
/// ([`crate::robot::CommandHandler::from_config`]); the host binary ignores it.
#[derive(Debug, Deserialize, Clone)]
pub struct RobotConfig {
    #[serde(default = "default_sample_interval_us")]
    pub sample_interval_us: u32,

    #[serde(default = "default_invert_right_motor")]
    pub invert_right_motor: bool,
}

/// Diagnostic log output
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Directory for daily rolling log files; console only when unset
    #[serde(default)]
    pub dir: Option<String>,
}

// Default value functions
fn default_transport() -> TransportKind { TransportKind::Serial }
fn default_convention() -> Convention { Convention::Direct }

fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { DEFAULT_BAUD_RATE }
fn default_timeout_ms() -> u64 { 100 }

fn default_local_addr() -> String { DEFAULT_LOCAL_ADDR.to_string() }
fn default_robot_addr() -> String { DEFAULT_ROBOT_ADDR.to_string() }

fn default_buffer_capacity() -> usize { DEFAULT_BUFFER_CAPACITY }

fn default_telemetry_enabled() -> bool { true }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }
fn default_log_format() -> String { "jsonl".to_string() }

fn default_sample_interval_us() -> u32 { DEFAULT_SAMPLE_INTERVAL_US }
fn default_invert_right_motor() -> bool { true }

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            transport: default_transport(),
            convention: default_convention(),
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            local_addr: default_local_addr(),
            robot_addr: default_robot_addr(),
        }
    }
}

impl Default for FramerSection {
    fn default() -> Self {
        Self {
            buffer_capacity: default_buffer_capacity(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
            format: default_log_format(),
        }
    }
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            sample_interval_us: default_sample_interval_us(),
            invert_right_motor: default_invert_right_motor(),
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> SbrLinkError {
    SbrLinkError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sbr_link::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns [`SbrLinkError::Config`] if any value is out of range
    pub fn validate(&self) -> Result<()> {
        if self.link.transport == TransportKind::Serial && self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if !SUPPORTED_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(invalid(
                "baud_rate must be one of: 9600, 57600, 115200, 250000, 500000",
            ));
        }

        if self.serial.timeout_ms == 0 || self.serial.timeout_ms > 10000 {
            return Err(invalid("timeout_ms must be between 1 and 10000"));
        }

        if self.link.transport == TransportKind::Udp {
            self.udp_addrs()?;

            // Datagrams from the bridge carry raw frames, never +IPD envelopes
            if self.link.convention == Convention::Tunneled {
                return Err(invalid(
                    "convention 'tunneled' cannot be used with transport 'udp'",
                ));
            }
        }

        if self.framer.buffer_capacity < MIN_BUFFER_CAPACITY
            || self.framer.buffer_capacity > MAX_BUFFER_CAPACITY
        {
            return Err(invalid(format!(
                "buffer_capacity must be between {} and {}",
                MIN_BUFFER_CAPACITY, MAX_BUFFER_CAPACITY
            )));
        }

        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        if self.telemetry.format != "jsonl" {
            return Err(invalid("log format must be 'jsonl' (only supported format)"));
        }

        if self.robot.sample_interval_us < MIN_SAMPLE_INTERVAL_US {
            return Err(invalid(format!(
                "sample_interval_us must be at least {}",
                MIN_SAMPLE_INTERVAL_US
            )));
        }

        if matches!(&self.logging.dir, Some(dir) if dir.is_empty()) {
            return Err(invalid("logging dir cannot be empty when set"));
        }

        Ok(())
    }

    /// Parsed UDP endpoints as (local, robot)
    pub fn udp_addrs(&self) -> Result<(SocketAddr, SocketAddr)> {
        let local = self
            .udp
            .local_addr
            .parse()
            .map_err(|e| invalid(format!("invalid udp local_addr '{}': {}", self.udp.local_addr, e)))?;
        let robot = self
            .udp
            .robot_addr
            .parse()
            .map_err(|e| invalid(format!("invalid udp robot_addr '{}': {}", self.udp.robot_addr, e)))?;
        Ok((local, robot))
    }

    /// Host-side framer settings for the configured link
    pub fn framer_config(&self) -> FramerConfig {
        FramerConfig::host(self.link.convention).with_capacity(self.framer.buffer_capacity)
    }
}
