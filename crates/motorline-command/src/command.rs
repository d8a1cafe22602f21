use crate::binary::{
    CoupledCommand, DualAxisCurrent, COUPLED_GAINS_TAG, COUPLED_POSITION_DIVISOR,
    COUPLED_POSITION_TAG, DUAL_CURRENT_TAG,
};
use crate::error::{BinaryKind, CommandError, Result};
use crate::scan::Scanner;

/// Longest property name or value accepted by `r`/`w`.
pub const MAX_TOKEN_LENGTH: usize = 128;

/// One parsed command line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `p axis pos [vel_ff [current_ff]]`
    PositionSetpoint {
        axis: u32,
        pos: f32,
        vel_ff: f32,
        current_ff: f32,
    },
    /// `q axis pos [vel_limit [current_limit]]`
    PositionSetpointWithLimits {
        axis: u32,
        pos: f32,
        vel_limit: Option<f32>,
        current_limit: Option<f32>,
    },
    /// `v axis vel [current_ff]`
    VelocitySetpoint { axis: u32, vel: f32, current_ff: f32 },
    /// `c axis current`
    CurrentSetpoint { axis: u32, current: f32 },
    /// Binary `C`: per-axis currents.
    DualAxisCurrentBinary(DualAxisCurrent),
    /// Binary `P`: coupled theta/gamma setpoints for both axes.
    CoupledPositionBinary { theta: f32, gamma: f32 },
    /// Binary `S`: coupled setpoints and gains for both axes.
    CoupledGainsBinary(CoupledCommand),
    /// `t axis goal`
    TrapezoidalMove { axis: u32, goal: f32 },
    /// `f axis`
    FeedbackQuery { axis: u32 },
    /// `h`
    Help,
    /// `i`
    DeviceInfo,
    /// `s`
    SaveConfig,
    /// `r name`
    PropertyRead { name: String },
    /// `w name value`
    PropertyWrite { name: String, value: String },
    /// `u axis`
    WatchdogFeed { axis: u32 },
    /// Any other leading byte.
    Unknown(u8),
}

impl Command {
    /// Parse one reassembled line.
    ///
    /// Returns `Ok(None)` for lines that carry no command: empty or starting with NUL.
    /// Any other first byte is a command, so a bare `\n` is an unknown one.
    /// Argument errors are reported before any axis range check, which needs the
    /// device and happens at dispatch.
    pub fn parse(line: &[u8]) -> Result<Option<Command>> {
        let Some(&tag) = line.first() else {
            return Ok(None);
        };
        if tag == 0 {
            return Ok(None);
        }

        let mut scan = Scanner::after_tag(line);
        let command = match tag {
            b'p' => {
                let (axis, pos) = axis_and_value(&mut scan)?;
                let vel_ff = scan.float();
                let current_ff = vel_ff.and_then(|_| scan.float());
                Command::PositionSetpoint {
                    axis,
                    pos,
                    vel_ff: vel_ff.unwrap_or(0.0),
                    current_ff: current_ff.unwrap_or(0.0),
                }
            }
            b'q' => {
                let (axis, pos) = axis_and_value(&mut scan)?;
                let vel_limit = scan.float();
                let current_limit = vel_limit.and_then(|_| scan.float());
                Command::PositionSetpointWithLimits {
                    axis,
                    pos,
                    vel_limit,
                    current_limit,
                }
            }
            b'v' => {
                let (axis, vel) = axis_and_value(&mut scan)?;
                Command::VelocitySetpoint {
                    axis,
                    vel,
                    current_ff: scan.float().unwrap_or(0.0),
                }
            }
            b'c' => {
                let (axis, current) = axis_and_value(&mut scan)?;
                Command::CurrentSetpoint { axis, current }
            }
            b't' => {
                let (axis, goal) = axis_and_value(&mut scan)?;
                Command::TrapezoidalMove { axis, goal }
            }
            b'f' => Command::FeedbackQuery {
                axis: scan.unsigned().ok_or(CommandError::Format)?,
            },
            b'u' => Command::WatchdogFeed {
                axis: scan.unsigned().ok_or(CommandError::Format)?,
            },
            DUAL_CURRENT_TAG => {
                let currents = DualAxisCurrent::decode(line).map_err(|source| {
                    CommandError::Binary {
                        kind: BinaryKind::DualCurrent,
                        source,
                    }
                })?;
                Command::DualAxisCurrentBinary(currents)
            }
            COUPLED_POSITION_TAG => {
                let setpoints = DualAxisCurrent::decode(line).map_err(|source| {
                    CommandError::Binary {
                        kind: BinaryKind::CoupledPosition,
                        source,
                    }
                })?;
                Command::CoupledPositionBinary {
                    theta: setpoints.i0 / COUPLED_POSITION_DIVISOR,
                    gamma: setpoints.i1 / COUPLED_POSITION_DIVISOR,
                }
            }
            COUPLED_GAINS_TAG => {
                let coupled =
                    CoupledCommand::decode(line).map_err(|source| CommandError::Binary {
                        kind: BinaryKind::CoupledGains,
                        source,
                    })?;
                Command::CoupledGainsBinary(coupled)
            }
            b'h' => Command::Help,
            b'i' => Command::DeviceInfo,
            // TODO: parse the `se` (erase) and `sr` (reboot) variants listed in the help
            // text once the persistence collaborator exposes them.
            b's' => Command::SaveConfig,
            b'r' => Command::PropertyRead {
                name: token(&mut scan)?,
            },
            b'w' => {
                let name = token(&mut scan)?;
                let value = token(&mut scan)?;
                Command::PropertyWrite { name, value }
            }
            other => Command::Unknown(other),
        };
        Ok(Some(command))
    }

    /// Axis index named by single-axis commands.
    pub fn axis(&self) -> Option<u32> {
        match self {
            Command::PositionSetpoint { axis, .. }
            | Command::PositionSetpointWithLimits { axis, .. }
            | Command::VelocitySetpoint { axis, .. }
            | Command::CurrentSetpoint { axis, .. }
            | Command::TrapezoidalMove { axis, .. }
            | Command::FeedbackQuery { axis }
            | Command::WatchdogFeed { axis } => Some(*axis),
            _ => None,
        }
    }
}

fn axis_and_value(scan: &mut Scanner<'_>) -> Result<(u32, f32)> {
    let axis = scan.unsigned().ok_or(CommandError::Format)?;
    let value = scan.float().ok_or(CommandError::Format)?;
    Ok((axis, value))
}

fn token(scan: &mut Scanner<'_>) -> Result<String> {
    scan.word(MAX_TOKEN_LENGTH)
        .map(|word| String::from_utf8_lossy(word).into_owned())
        .ok_or(CommandError::Format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::FeedbackFrame;
    use crate::error::BinaryError;

    fn parse(line: &[u8]) -> Command {
        Command::parse(line).unwrap().unwrap()
    }

    #[test]
    fn position_defaults_feedforward_to_zero() {
        assert_eq!(
            parse(b"p 0 1.5\n"),
            Command::PositionSetpoint {
                axis: 0,
                pos: 1.5,
                vel_ff: 0.0,
                current_ff: 0.0
            }
        );
        assert_eq!(
            parse(b"p 1 -2 0.5 0.25"),
            Command::PositionSetpoint {
                axis: 1,
                pos: -2.0,
                vel_ff: 0.5,
                current_ff: 0.25
            }
        );
    }

    #[test]
    fn optional_fields_stop_at_first_miss() {
        assert_eq!(
            parse(b"p 0 1 x 4"),
            Command::PositionSetpoint {
                axis: 0,
                pos: 1.0,
                vel_ff: 0.0,
                current_ff: 0.0
            }
        );
    }

    #[test]
    fn missing_required_field_is_format_error() {
        for line in [
            &b"p 0\n"[..],
            b"p",
            b"q 1",
            b"v x 1",
            b"c 0 abc",
            b"t 0",
            b"f\n",
            b"u",
        ] {
            assert_eq!(Command::parse(line), Err(CommandError::Format), "{line:?}");
        }
    }

    #[test]
    fn out_of_range_axis_still_parses() {
        assert_eq!(parse(b"p 9 1.5").axis(), Some(9));
        assert_eq!(parse(b"u -1").axis(), Some(u32::MAX));
    }

    #[test]
    fn limits_are_optional() {
        assert_eq!(
            parse(b"q 0 3 10"),
            Command::PositionSetpointWithLimits {
                axis: 0,
                pos: 3.0,
                vel_limit: Some(10.0),
                current_limit: None
            }
        );
    }

    #[test]
    fn velocity_current_move_feedback_watchdog() {
        assert_eq!(
            parse(b"v 1 4"),
            Command::VelocitySetpoint {
                axis: 1,
                vel: 4.0,
                current_ff: 0.0
            }
        );
        assert_eq!(
            parse(b"c 0 2.5"),
            Command::CurrentSetpoint {
                axis: 0,
                current: 2.5
            }
        );
        assert_eq!(
            parse(b"t 1 100"),
            Command::TrapezoidalMove {
                axis: 1,
                goal: 100.0
            }
        );
        assert_eq!(parse(b"f 1\n"), Command::FeedbackQuery { axis: 1 });
        assert_eq!(parse(b"u 0\n"), Command::WatchdogFeed { axis: 0 });
    }

    #[test]
    fn admin_commands_ignore_trailing_bytes() {
        assert_eq!(parse(b"h\n"), Command::Help);
        assert_eq!(parse(b"i please"), Command::DeviceInfo);
        assert_eq!(parse(b"sr\n"), Command::SaveConfig);
    }

    #[test]
    fn property_commands() {
        assert_eq!(
            parse(b"r axis0.requested_state\n"),
            Command::PropertyRead {
                name: "axis0.requested_state".to_string()
            }
        );
        assert_eq!(
            parse(b"w vbus 24\n"),
            Command::PropertyWrite {
                name: "vbus".to_string(),
                value: "24".to_string()
            }
        );
        assert_eq!(Command::parse(b"r \n"), Err(CommandError::Format));
        assert_eq!(Command::parse(b"w name\n"), Err(CommandError::Format));
    }

    #[test]
    fn empty_lines_carry_no_command() {
        assert_eq!(Command::parse(b""), Ok(None));
        assert_eq!(Command::parse(b"\0p 0 1"), Ok(None));
    }

    #[test]
    fn bare_terminators_are_unknown_commands() {
        assert_eq!(parse(b"\n"), Command::Unknown(b'\n'));
        assert_eq!(parse(b"\r\n"), Command::Unknown(b'\r'));
    }

    #[test]
    fn unknown_tag() {
        assert_eq!(parse(b"x 1 2\n"), Command::Unknown(b'x'));
        assert_eq!(parse(b" p 0 1\n"), Command::Unknown(b' '));
    }

    #[test]
    fn binary_dual_current() {
        let msg = DualAxisCurrent { i0: 2.5, i1: -1.0 }.encode(b'C');
        assert_eq!(
            parse(&msg),
            Command::DualAxisCurrentBinary(DualAxisCurrent { i0: 2.5, i1: -1.0 })
        );
    }

    #[test]
    fn binary_coupled_position_scales_down() {
        let msg = DualAxisCurrent { i0: 10.0, i1: -5.0 }.encode(b'P');
        match parse(&msg) {
            Command::CoupledPositionBinary { theta, gamma } => {
                assert!((theta - 0.01).abs() < 1e-6);
                assert!((gamma + 0.005).abs() < 1e-6);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn binary_errors_name_their_kind() {
        let mut msg = FeedbackFrame { theta: 1, gamma: 2 }.encode();
        msg[2] ^= 0xff;
        assert!(matches!(
            Command::parse(&msg),
            Err(CommandError::Binary {
                kind: BinaryKind::CoupledPosition,
                source: BinaryError::ChecksumMismatch { .. }
            })
        ));
        assert!(matches!(
            Command::parse(b"S short\n"),
            Err(CommandError::Binary {
                kind: BinaryKind::CoupledGains,
                source: BinaryError::LengthMismatch {
                    expected: 14,
                    actual: 8
                }
            })
        ));
        assert!(matches!(
            Command::parse(b"C\n"),
            Err(CommandError::Binary {
                kind: BinaryKind::DualCurrent,
                ..
            })
        ));
    }
}
