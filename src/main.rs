//! # SBR Link
//!
//! Host side of the self-balancing robot link.
//!
//! Connects to the robot over a serial port or the WiFi bridge, logs the
//! telemetry and error reports it sends, and can issue rate and motor
//! commands on start.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use sbr_link::config::{Config, LoggingConfig, TransportKind};
use sbr_link::link::{ChannelHandler, Link, PacketLink};
use sbr_link::protocol::messages::Message;
use sbr_link::protocol::packet::Packet;
use sbr_link::telemetry::{TelemetryLogger, TelemetryRecord};
use sbr_link::transport::serial::DEFAULT_DEVICE_PATHS;
use sbr_link::transport::{SerialTransport, Transport, UdpTransport};

/// Decoded packets buffered between the receive path and the main loop
const PACKET_CHANNEL_CAPACITY: usize = 64;

/// Seconds between link statistics log messages
const STATS_INTERVAL_SECS: u64 = 10;

/// File name prefix of the daily diagnostic log
const LOG_FILE_PREFIX: &str = "sbr-link.log";

#[derive(Parser, Debug)]
#[command(name = "sbr-link")]
#[command(about = "Host link for a self-balancing robot")]
#[command(version)]
struct Args {
    /// Configuration file (built-in defaults when omitted)
    #[arg(short, long, env = "SBR_LINK_CONFIG")]
    config: Option<PathBuf>,

    /// Serial device, overriding the configured port
    #[arg(short, long)]
    port: Option<String>,

    /// Send a telemetry interval command (microseconds) on start
    #[arg(long, value_name = "US")]
    rate: Option<u32>,

    /// Send a motor command on start
    #[arg(long, num_args = 2, value_names = ["LEFT", "RIGHT"], allow_negative_numbers = true)]
    motors: Option<Vec<i16>>,
}

impl Args {
    /// Commands to send right after connecting
    fn startup_messages(&self) -> Vec<Message> {
        let mut messages = Vec::new();

        if let Some(interval_us) = self.rate {
            messages.push(Message::SetRate { interval_us });
        }

        if let Some([left, right]) = self.motors.as_deref() {
            messages.push(Message::SetMotors {
                left: *left,
                right: *right,
            });
        }

        messages
    }
}

/// Install the console subscriber and, if configured, a daily log file
///
/// The returned guard must live until shutdown so buffered lines are written.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match &config.dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();

            Some(guard)
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            None
        }
    }
}

/// Log a packet from the robot and append it to the telemetry log
fn handle_packet(packet: &Packet, logger: Option<&mut TelemetryLogger>) {
    let message = match Message::from_packet(packet) {
        Ok(message) => message,
        Err(e) => {
            debug!("Ignoring {:?} packet: {}", packet.packet_type(), e);
            return;
        }
    };

    match message {
        Message::Telemetry(sample) => {
            info!("Telemetry: accel {:?} gyro {:?}", sample.accel, sample.gyro);
        }
        Message::Error(code) => {
            warn!("Robot reported error {:?} (0x{:02X})", code, code.code());
        }
        Message::SetRate { .. } | Message::SetMotors { .. } => {
            debug!("Ignoring command echoed by the robot");
            return;
        }
    }

    if let (Some(logger), Some(record)) = (logger, TelemetryRecord::from_message(&message)) {
        if let Err(e) = logger.log(&record) {
            warn!("Failed to write telemetry record: {}", e);
        }
    }
}

/// Send startup commands, then receive until Ctrl+C or the transport closes
async fn run<T: Transport>(transport: T, config: &Config, args: &Args) -> Result<()> {
    let (tx, mut rx) = mpsc::channel(PACKET_CHANNEL_CAPACITY);
    let receiver = PacketLink::new(config.framer_config(), ChannelHandler::new(tx));
    let read_timeout = Duration::from_millis(config.serial.timeout_ms);
    let mut link = Link::new(transport, receiver, read_timeout);

    for message in args.startup_messages() {
        link.send_message(&message)
            .await
            .with_context(|| format!("failed to send {:?}", message))?;
        info!("Sent {:?}", message);
    }

    let mut telemetry_logger = if config.telemetry.enabled {
        Some(TelemetryLogger::new(&config.telemetry)?)
    } else {
        None
    };

    let mut stats_interval = interval(Duration::from_secs(STATS_INTERVAL_SECS));
    stats_interval.tick().await;

    info!("Receiving with {:?} framing", config.link.convention);
    info!("Press Ctrl+C to exit");

    loop {
        tokio::select! {
            result = link.poll_once() => {
                if !result? {
                    break;
                }
            }

            Some(packet) = rx.recv() => {
                handle_packet(&packet, telemetry_logger.as_mut());
            }

            _ = stats_interval.tick() => {
                let decode = link.receiver().stats();
                let framing = link.receiver().framer_stats();
                info!(
                    "Link stats: {} packets, {} CRC errors, {} malformed, {} overflows, {} envelope errors",
                    decode.packets, decode.crc_errors, decode.malformed,
                    framing.overflows, framing.envelope_errors
                );
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    while let Ok(packet) = rx.try_recv() {
        handle_packet(&packet, telemetry_logger.as_mut());
    }

    if let Some(logger) = telemetry_logger.as_mut() {
        logger.flush()?;
    }

    info!("Total packets received: {}", link.receiver().stats().packets);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    let _log_guard = init_logging(&config.logging);

    info!("SBR Link v{} starting...", env!("CARGO_PKG_VERSION"));

    match config.link.transport {
        TransportKind::Serial => {
            let transport = match &args.port {
                Some(port) => SerialTransport::open(port, config.serial.baud_rate)?,
                None => {
                    let mut paths = vec![config.serial.port.as_str()];
                    paths.extend(
                        DEFAULT_DEVICE_PATHS
                            .iter()
                            .copied()
                            .filter(|path| *path != config.serial.port),
                    );
                    SerialTransport::open_with_paths(&paths, config.serial.baud_rate)?
                }
            };
            info!("Serial link open at {}", transport.describe());
            run(transport, &config, &args).await
        }
        TransportKind::Udp => {
            let (local, robot) = config.udp_addrs()?;
            let transport = UdpTransport::bind(local, robot).await?;
            run(transport, &config, &args).await
        }
    }
}
