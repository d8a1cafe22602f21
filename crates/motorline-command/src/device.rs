//! Collaborator interfaces the dispatcher drives.
//!
//! Control loops, the property tree, and configuration storage live outside this
//! crate. The dispatcher only hands them validated setpoints and strings.

use serde::{Deserialize, Serialize};

use crate::error::{DeviceError, PropertyError};

/// One controllable axis.
pub trait AxisControl {
    /// Position setpoint with velocity and current feedforward.
    fn set_pos_setpoint(&mut self, pos: f32, vel_ff: f32, current_ff: f32);

    /// Overwrite the position setpoint without touching feedforward terms.
    fn assign_pos_setpoint(&mut self, pos: f32);

    /// Overwrite the controller's velocity limit.
    fn set_vel_limit(&mut self, vel_limit: f32);

    /// Overwrite the motor's current limit.
    fn set_current_limit(&mut self, current_limit: f32);

    fn set_vel_setpoint(&mut self, vel: f32, current_ff: f32);

    fn set_current_setpoint(&mut self, current: f32);

    /// Start a trapezoidal move to `goal`.
    fn move_to_pos(&mut self, goal: f32);

    /// Coupled theta/gamma setpoints of a mechanically linked pair.
    fn set_coupled_setpoints(&mut self, theta: f32, gamma: f32);

    fn set_coupled_gains(&mut self, kp_theta: f32, kd_theta: f32, kp_gamma: f32, kd_gamma: f32);

    /// Position estimate in encoder counts.
    fn pos_estimate(&self) -> f32;

    /// Velocity estimate in counts per second.
    fn vel_estimate(&self) -> f32;

    /// Convert encoder counts to radians.
    fn encoder_to_rad(&self, counts: f32) -> f32;

    fn watchdog_feed(&mut self);
}

/// A named property with string access.
pub trait Endpoint {
    /// Serialize the current value.
    fn read_string(&self) -> Result<String, PropertyError>;

    /// Parse `value` and store it.
    fn write_string(&mut self, value: &str) -> Result<(), PropertyError>;
}

/// Everything a [`Dispatcher`](crate::Dispatcher) needs from the device.
pub trait Device {
    type Axis: AxisControl;

    /// All axes, indexed by axis number.
    fn axes(&self) -> &[Self::Axis];

    fn axes_mut(&mut self) -> &mut [Self::Axis];

    /// Look up a property by its dotted path, such as `axis0.requested_state`.
    fn endpoint(&mut self, name: &str) -> Option<&mut dyn Endpoint>;

    /// Persist the current configuration.
    fn save_configuration(&mut self) -> Result<(), DeviceError>;

    fn identity(&self) -> &DeviceIdentity;
}

/// Read-only identity values reported by the `i` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceIdentity {
    pub hw_version_major: u8,
    pub hw_version_minor: u8,
    /// Rated bus voltage.
    pub hw_version_voltage: u8,
    pub fw_version_major: u8,
    pub fw_version_minor: u8,
    pub fw_version_revision: u8,
    pub serial_number: String,
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self {
            hw_version_major: 3,
            hw_version_minor: 6,
            hw_version_voltage: 24,
            fw_version_major: 0,
            fw_version_minor: 1,
            fw_version_revision: 0,
            serial_number: "000000000000".to_string(),
        }
    }
}
