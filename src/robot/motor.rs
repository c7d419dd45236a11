//! # Motor Actuation
//!
//! Converts signed speed commands into H-bridge drive states.
//!
//! Speeds are clamped to ±255 here, at the actuation boundary; the packet
//! layer carries whatever `i16` the host sent. A speed of 0 performs an
//! active (short) brake rather than letting the wheel coast.

/// Largest PWM duty accepted by the motor driver
pub const MAX_MOTOR_SPEED: i16 = 255;

/// H-bridge drive state for one motor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotorDrive {
    /// Both bridge inputs high, zero duty
    #[default]
    Brake,
    /// Clockwise rotation with the given duty
    Forward(u8),
    /// Counter-clockwise rotation with the given duty
    Reverse(u8),
}

impl MotorDrive {
    /// Signed duty, positive for forward
    pub fn signed_duty(self) -> i16 {
        match self {
            MotorDrive::Brake => 0,
            MotorDrive::Forward(duty) => i16::from(duty),
            MotorDrive::Reverse(duty) => -i16::from(duty),
        }
    }

    fn reversed(self) -> Self {
        match self {
            MotorDrive::Brake => MotorDrive::Brake,
            MotorDrive::Forward(duty) => MotorDrive::Reverse(duty),
            MotorDrive::Reverse(duty) => MotorDrive::Forward(duty),
        }
    }
}

/// Map a commanded speed to a drive state
///
/// # Examples
///
/// ```
/// use sbr_link::robot::motor::{drive_for_speed, MotorDrive};
///
/// assert_eq!(drive_for_speed(0), MotorDrive::Brake);
/// assert_eq!(drive_for_speed(100), MotorDrive::Forward(100));
/// assert_eq!(drive_for_speed(-1000), MotorDrive::Reverse(255));
/// ```
pub fn drive_for_speed(speed: i16) -> MotorDrive {
    let clamped = speed.clamp(-MAX_MOTOR_SPEED, MAX_MOTOR_SPEED);

    match clamped {
        0 => MotorDrive::Brake,
        s if s > 0 => MotorDrive::Forward(s as u8),
        s => MotorDrive::Reverse(s.unsigned_abs() as u8),
    }
}

/// Left and right wheel motors
///
/// The motors sit on opposite sides of the chassis. With `invert_right`
/// set, the right motor's direction is flipped so that equal-signed speeds
/// drive the robot straight; without it, equal-signed speeds spin it in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorPair {
    left: MotorDrive,
    right: MotorDrive,
    invert_right: bool,
}

impl MotorPair {
    /// Both motors start braked
    pub fn new(invert_right: bool) -> Self {
        Self {
            left: MotorDrive::Brake,
            right: MotorDrive::Brake,
            invert_right,
        }
    }

    /// Apply a motor command
    pub fn set(&mut self, left: i16, right: i16) {
        self.left = drive_for_speed(left);

        let right = drive_for_speed(right);
        self.right = if self.invert_right { right.reversed() } else { right };
    }

    /// Brake both motors
    pub fn stop(&mut self) {
        self.left = MotorDrive::Brake;
        self.right = MotorDrive::Brake;
    }

    pub fn left(&self) -> MotorDrive {
        self.left
    }

    pub fn right(&self) -> MotorDrive {
        self.right
    }
}
