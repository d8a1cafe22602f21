use std::f32::consts::FRAC_PI_2;
use std::fmt::{self, Write as _};

use bytes::Bytes;
use motorline_frame::{escape_bytes, BoundedText, Response, RESPONSE_CAPACITY};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::binary::FeedbackFrame;
use crate::command::Command;
use crate::device::{AxisControl, Device};
use crate::error::{CommandError, Result};

/// Lines sent in reply to `h`, in order.
pub const HELP_TEXT: &[&str] = &[
    "Please see documentation for more details",
    "",
    "Available commands syntax reference:",
    "Device Info: i",
    "Position: q axis pos vel-lim I-lim",
    "Position: p axis pos vel-ff I-ff",
    "Velocity: v axis vel I-ff",
    "Current: c axis I",
    "Current to both motors with response: C I0 I1",
    "",
    "Properties start at device root, such as axis0.requested_state",
    "Read: r property",
    "Write: w property value",
    "",
    "Save config: ss",
    "Erase config: se",
    "Reboot: sr",
];

/// Response rendering options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Append `*N` decimal XOR checksums to text responses. Default: false.
    pub checksum_responses: bool,
    /// Longest response text in bytes; longer text is truncated. Default: 64.
    pub response_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            checksum_responses: false,
            response_capacity: RESPONSE_CAPACITY,
        }
    }
}

/// Interprets reassembled lines against a [`Device`].
///
/// One call to [`dispatch`](Self::dispatch) handles one line and returns the
/// responses it produced, in order. Errors never escape: each becomes a response.
#[derive(Debug)]
pub struct Dispatcher<D> {
    device: D,
    config: DispatchConfig,
}

impl<D: Device> Dispatcher<D> {
    pub fn new(device: D) -> Self {
        Self::with_config(device, DispatchConfig::default())
    }

    pub fn with_config(device: D, config: DispatchConfig) -> Self {
        Self { device, config }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }

    /// Parse and execute one line.
    pub fn dispatch(&mut self, line: &[u8]) -> Vec<Response> {
        let mut replies = Replies::new(&self.config);
        let outcome = match Command::parse(line) {
            Ok(Some(command)) => {
                debug!(line = %escape_bytes(line), ?command, "dispatching");
                self.execute(command, &mut replies)
            }
            Ok(None) => {
                trace!("empty line");
                Ok(())
            }
            Err(err) => Err(err),
        };

        if let Err(err) = outcome {
            debug!(line = %escape_bytes(line), error = %err, "command rejected");
            replies.error(&err, line);
        }
        replies.finish()
    }

    fn execute(&mut self, command: Command, replies: &mut Replies) -> Result<()> {
        match command {
            Command::PositionSetpoint {
                axis,
                pos,
                vel_ff,
                current_ff,
            } => {
                let axis = self.axis_mut(axis)?;
                axis.set_pos_setpoint(pos, vel_ff, current_ff);
                axis.watchdog_feed();
            }
            Command::PositionSetpointWithLimits {
                axis,
                pos,
                vel_limit,
                current_limit,
            } => {
                let axis = self.axis_mut(axis)?;
                axis.assign_pos_setpoint(pos);
                if let Some(vel_limit) = vel_limit {
                    axis.set_vel_limit(vel_limit);
                }
                if let Some(current_limit) = current_limit {
                    axis.set_current_limit(current_limit);
                }
                axis.watchdog_feed();
            }
            Command::VelocitySetpoint {
                axis,
                vel,
                current_ff,
            } => {
                let axis = self.axis_mut(axis)?;
                axis.set_vel_setpoint(vel, current_ff);
                axis.watchdog_feed();
            }
            Command::CurrentSetpoint { axis, current } => {
                let axis = self.axis_mut(axis)?;
                axis.set_current_setpoint(current);
                axis.watchdog_feed();
            }
            Command::TrapezoidalMove { axis, goal } => {
                let axis = self.axis_mut(axis)?;
                axis.move_to_pos(goal);
                axis.watchdog_feed();
            }
            Command::FeedbackQuery { axis } => {
                let axis = self.axis_mut(axis)?;
                let (pos, vel) = (axis.pos_estimate(), axis.vel_estimate());
                replies.line(format_args!("{} {}", Fixed6(pos), Fixed6(vel)));
            }
            Command::WatchdogFeed { axis } => self.axis_mut(axis)?.watchdog_feed(),
            Command::DualAxisCurrentBinary(currents) => {
                let (a0, a1) = self.axis_pair()?;
                a0.set_current_setpoint(currents.i0);
                a1.set_current_setpoint(currents.i1);
                replies.binary(&self.feedback()?.encode());
            }
            Command::CoupledPositionBinary { theta, gamma } => {
                let (a0, a1) = self.axis_pair()?;
                a0.set_coupled_setpoints(theta, gamma);
                a1.set_coupled_setpoints(theta, gamma);
                replies.binary(&self.feedback()?.encode());
            }
            Command::CoupledGainsBinary(coupled) => {
                let (a0, a1) = self.axis_pair()?;
                for axis in [a0, a1] {
                    axis.set_coupled_setpoints(coupled.sp_theta, coupled.sp_gamma);
                    axis.set_coupled_gains(
                        coupled.kp_theta,
                        coupled.kd_theta,
                        coupled.kp_gamma,
                        coupled.kd_gamma,
                    );
                }
                replies.binary(&self.feedback()?.encode());
            }
            Command::Help => {
                for line in HELP_TEXT {
                    replies.text(line.as_bytes());
                }
            }
            Command::DeviceInfo => {
                let id = self.device.identity();
                replies.line(format_args!(
                    "Hardware version: {}.{}-{}V",
                    id.hw_version_major, id.hw_version_minor, id.hw_version_voltage
                ));
                replies.line(format_args!(
                    "Firmware version: {}.{}.{}",
                    id.fw_version_major, id.fw_version_minor, id.fw_version_revision
                ));
                replies.line(format_args!("Serial number: {}", id.serial_number));
            }
            Command::SaveConfig => self.device.save_configuration().map_err(|err| {
                warn!(error = %err, "saving configuration failed");
                CommandError::Unsupported
            })?,
            Command::PropertyRead { name } => {
                let endpoint = self
                    .device
                    .endpoint(&name)
                    .ok_or(CommandError::InvalidProperty)?;
                let value = endpoint.read_string().map_err(|err| {
                    debug!(property = %name, error = %err, "property read failed");
                    CommandError::Unsupported
                })?;
                replies.text(value.as_bytes());
            }
            Command::PropertyWrite { name, value } => {
                let endpoint = self
                    .device
                    .endpoint(&name)
                    .ok_or(CommandError::InvalidProperty)?;
                endpoint.write_string(&value).map_err(|err| {
                    debug!(property = %name, error = %err, "property write failed");
                    CommandError::Unsupported
                })?;
            }
            Command::Unknown(_) => return Err(CommandError::UnknownCommand),
        }
        Ok(())
    }

    fn axis_mut(&mut self, axis: u32) -> Result<&mut D::Axis> {
        usize::try_from(axis)
            .ok()
            .and_then(|index| self.device.axes_mut().get_mut(index))
            .ok_or(CommandError::InvalidAxis(axis))
    }

    /// Axes 0 and 1, the mechanically coupled pair.
    fn axis_pair(&mut self) -> Result<(&mut D::Axis, &mut D::Axis)> {
        match self.device.axes_mut() {
            [a0, a1, ..] => Ok((a0, a1)),
            axes => Err(CommandError::InvalidAxis(first_missing(axes.len()))),
        }
    }

    fn feedback(&self) -> Result<FeedbackFrame> {
        let [a0, a1, ..] = self.device.axes() else {
            return Err(CommandError::InvalidAxis(first_missing(
                self.device.axes().len(),
            )));
        };
        let alpha = a0.encoder_to_rad(a0.pos_estimate()) + FRAC_PI_2;
        let beta = a1.encoder_to_rad(a1.pos_estimate()) - FRAC_PI_2;
        Ok(FeedbackFrame::from_angles(alpha, beta))
    }
}

/// `%f` rendering: six decimals, lowercase `nan`/`inf` for non-finite values.
struct Fixed6(f32);

impl fmt::Display for Fixed6 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.0;
        if value.is_nan() {
            f.write_str(if value.is_sign_negative() { "-nan" } else { "nan" })
        } else if value.is_infinite() {
            f.write_str(if value > 0.0 { "inf" } else { "-inf" })
        } else {
            write!(f, "{value:.6}")
        }
    }
}

fn first_missing(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// Collects the responses for one line.
struct Replies {
    responses: Vec<Response>,
    checksum: bool,
    capacity: usize,
}

impl Replies {
    fn new(config: &DispatchConfig) -> Self {
        Self {
            responses: Vec::new(),
            checksum: config.checksum_responses,
            capacity: config.response_capacity,
        }
    }

    fn text(&mut self, bytes: &[u8]) {
        self.push_text(BoundedText::from_bytes(bytes, self.capacity));
    }

    fn line(&mut self, args: fmt::Arguments<'_>) {
        let mut text = BoundedText::with_capacity(self.capacity);
        let _ = text.write_fmt(args);
        self.push_text(text);
    }

    fn binary(&mut self, payload: &[u8]) {
        self.responses
            .push(Response::binary(Bytes::copy_from_slice(payload)));
    }

    fn error(&mut self, err: &CommandError, line: &[u8]) {
        match err {
            CommandError::Binary { kind, source } => {
                warn!(%kind, error = %source, "binary command rejected");
                self.text(kind.failure_label().as_bytes());
                self.text(line);
            }
            other => self.line(format_args!("{other}")),
        }
    }

    fn push_text(&mut self, text: BoundedText) {
        if text.is_truncated() {
            trace!(capacity = self.capacity, "response truncated");
        }
        self.responses
            .push(Response::text(text.into_bytes()).with_checksum(self.checksum));
    }

    fn finish(self) -> Vec<Response> {
        self.responses
    }
}
