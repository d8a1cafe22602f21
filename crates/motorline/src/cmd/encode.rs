use motorline_command::{CoupledCommand, DualAxisCurrent};
use motorline_frame::{DEFAULT_MAX_LINE_LENGTH, START_BYTE};

use crate::cmd::{EncodeArgs, EncodeCommand, FrameTag};
use crate::exit::{CliError, CliResult, SUCCESS};
use crate::output::{print_encoded, EncodedFrame, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let (kind, frame) = build(&args.command)?;
    print_encoded(&EncodedFrame::new(kind, &frame), format);
    Ok(SUCCESS)
}

fn build(command: &EncodeCommand) -> CliResult<(&'static str, Vec<u8>)> {
    match command {
        EncodeCommand::Text { line, fixed: false } => Ok(("text", newline_frame(line.as_bytes()))),
        EncodeCommand::Text { line, fixed: true } => {
            Ok(("text", fixed_frame(line.as_bytes())?))
        }
        EncodeCommand::Current { i0, i1, tag } => {
            let (kind, tag) = match tag {
                FrameTag::C => ("dual_current", b'C'),
                FrameTag::P => ("coupled_position", b'P'),
            };
            let msg = DualAxisCurrent { i0: *i0, i1: *i1 }.encode(tag);
            Ok((kind, fixed_frame(&msg)?))
        }
        EncodeCommand::Coupled {
            sp_theta,
            kp_theta,
            kd_theta,
            sp_gamma,
            kp_gamma,
            kd_gamma,
        } => {
            let msg = CoupledCommand {
                sp_theta: *sp_theta,
                kp_theta: *kp_theta,
                kd_theta: *kd_theta,
                sp_gamma: *sp_gamma,
                kp_gamma: *kp_gamma,
                kd_gamma: *kd_gamma,
            }
            .encode();
            Ok(("coupled_gains", fixed_frame(&msg)?))
        }
    }
}

/// `[0x01][0x00][line]`, adding the `\n` terminator when missing.
fn newline_frame(line: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(line.len() + 3);
    frame.extend_from_slice(&[START_BYTE, 0]);
    frame.extend_from_slice(line);
    if !line.ends_with(b"\n") {
        frame.push(b'\n');
    }
    frame
}

/// `[0x01][len][payload]`. The device drops lengths of 128 and above.
fn fixed_frame(payload: &[u8]) -> CliResult<Vec<u8>> {
    let length = u8::try_from(payload.len())
        .ok()
        .filter(|&len| len > 0 && usize::from(len) < DEFAULT_MAX_LINE_LENGTH)
        .ok_or_else(|| {
            CliError::usage(format!(
                "fixed frame payload must be 1..{DEFAULT_MAX_LINE_LENGTH} bytes, got {}",
                payload.len()
            ))
        })?;
    let mut frame = Vec::with_capacity(payload.len() + 2);
    frame.extend_from_slice(&[START_BYTE, length]);
    frame.extend_from_slice(payload);
    Ok(frame)
}
