//! # Command Consumer
//!
//! Applies host commands to the robot state.
//!
//! - Rate commands set the telemetry interval, floor-clamped to 5 ms.
//! - Motor commands go to the [`MotorPair`], which clamps to ±255.
//! - A command whose payload does not fit its layout is answered with an
//!   "illegal command" error report.

use std::time::Instant;

use tracing::{debug, info};

use super::motor::MotorPair;
use super::scheduler::TelemetryScheduler;
use crate::config::RobotConfig;
use crate::link::PacketHandler;
use crate::protocol::messages::{ErrorCode, ImuSample, Message};
use crate::protocol::packet::Packet;

/// Robot state driven by host commands
#[derive(Debug, Clone)]
pub struct CommandHandler {
    scheduler: TelemetryScheduler,
    motors: MotorPair,
    pending_reply: Option<Message>,
}

impl CommandHandler {
    /// Create a handler with motors braked
    ///
    /// # Arguments
    ///
    /// * `interval_us` - Initial telemetry interval (clamped to the floor)
    /// * `invert_right` - Flip the right motor's direction
    pub fn new(interval_us: u32, invert_right: bool) -> Self {
        Self {
            scheduler: TelemetryScheduler::new(interval_us),
            motors: MotorPair::new(invert_right),
            pending_reply: None,
        }
    }

    /// Create a handler from the `[robot]` configuration section
    pub fn from_config(config: &RobotConfig) -> Self {
        Self::new(config.sample_interval_us, config.invert_right_motor)
    }

    /// Apply one decoded packet
    ///
    /// # Returns
    ///
    /// * `Option<Message>` - Error report to send back, if the command was illegal
    pub fn apply(&mut self, packet: &Packet) -> Option<Message> {
        let message = match Message::from_packet(packet) {
            Ok(message) => message,
            Err(e) => {
                debug!("Rejecting command: {}", e);
                return Some(Message::Error(ErrorCode::IllegalCommand));
            }
        };

        match message {
            Message::SetRate { interval_us } => {
                let applied = self.scheduler.set_interval_us(interval_us);
                if applied != interval_us {
                    debug!("Requested interval {} us raised to {} us", interval_us, applied);
                }
                info!("Telemetry interval set to {} us", applied);
            }
            Message::SetMotors { left, right } => {
                self.motors.set(left, right);
                debug!("Motors set to {:?} / {:?}", self.motors.left(), self.motors.right());
            }
            Message::Telemetry(_) | Message::Error(_) => {
                debug!("Ignoring {:?} packet sent to the robot", packet.packet_type());
            }
        }

        None
    }

    /// Take the reply produced by the last packet delivered through
    /// [`PacketHandler::handle`]
    pub fn take_reply(&mut self) -> Option<Message> {
        self.pending_reply.take()
    }

    /// Message to send if a telemetry sample is due at `now`
    ///
    /// `read_sensor` is only called when a sample is due; `None` from it is
    /// reported as a sensor read failure.
    pub fn poll_telemetry<F>(&mut self, now: Instant, read_sensor: F) -> Option<Message>
    where
        F: FnOnce() -> Option<ImuSample>,
    {
        if !self.scheduler.poll(now) {
            return None;
        }

        Some(match read_sensor() {
            Some(sample) => Message::Telemetry(sample),
            None => Message::Error(ErrorCode::SensorRead),
        })
    }

    pub fn interval_us(&self) -> u32 {
        self.scheduler.interval_us()
    }

    pub fn motors(&self) -> &MotorPair {
        &self.motors
    }
}

impl PacketHandler for CommandHandler {
    fn handle(&mut self, packet: Packet) {
        if let Some(reply) = self.apply(&packet) {
            self.pending_reply = Some(reply);
        }
    }
}
