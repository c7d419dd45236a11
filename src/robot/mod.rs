//! # Robot Module
//!
//! Robot-side application logic around the protocol: the command consumer,
//! motor actuation and the telemetry cadence. Hardware access (PWM pins,
//! the inertial sensor) stays outside; these types only decide what to do.

pub mod commands;
pub mod motor;
pub mod scheduler;

pub use commands::CommandHandler;
pub use motor::{MotorDrive, MotorPair};
pub use scheduler::TelemetryScheduler;
