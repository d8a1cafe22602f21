use std::fs::File;
use std::io::Read;

use bytes::Bytes;
use motorline_command::binary::{COUPLED_POSITION_TAG, FEEDBACK_LEN};
use motorline_command::FeedbackFrame;
use motorline_frame::{
    decode_response, escape_bytes, ChecksumStatus, FrameError, Framing, LineReader, ResponseFrame,
};
use tracing::{debug, info};

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, io_error, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{hex, print_responses, DecodedResponse, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let input: Box<dyn Read> = match &args.input {
        Some(path) => Box::new(
            File::open(path).map_err(|err| io_error(&format!("open {}", path.display()), err))?,
        ),
        None => Box::new(std::io::stdin().lock()),
    };

    let mut reader = LineReader::new(input);
    let mut responses = Vec::new();
    loop {
        match reader.read_framed() {
            Ok((framing, line)) => responses.push(classify(framing, line, args.checksum)),
            Err(FrameError::ConnectionClosed) => break,
            Err(err) => return Err(frame_error("read failed", err)),
        }
    }

    let stats = reader.stats();
    info!(
        responses = responses.len(),
        resyncs = stats.resyncs,
        overflows = stats.overflows,
        "response stream decoded"
    );
    print_responses(&responses, format);

    if responses.iter().any(is_invalid) {
        return Ok(DATA_INVALID);
    }
    Ok(SUCCESS)
}

pub fn classify(framing: Framing, line: Bytes, expect_checksum: bool) -> DecodedResponse {
    debug!(line = %escape_bytes(&line), ?framing, "response line");
    match decode_response(framing, line, expect_checksum) {
        ResponseFrame::Text { text, checksum } => DecodedResponse::Text {
            text: String::from_utf8_lossy(&text).into_owned(),
            checksum: checksum_label(checksum),
        },
        ResponseFrame::Binary(payload) => {
            if payload.len() == FEEDBACK_LEN && payload[0] == COUPLED_POSITION_TAG {
                match FeedbackFrame::decode(&payload) {
                    Ok(feedback) => DecodedResponse::Feedback {
                        theta: feedback.theta_rad(),
                        gamma: feedback.gamma_rad(),
                    },
                    Err(err) => DecodedResponse::Binary {
                        hex: hex(&payload),
                        error: Some(err.to_string()),
                    },
                }
            } else {
                DecodedResponse::Binary {
                    hex: hex(&payload),
                    error: None,
                }
            }
        }
    }
}

fn checksum_label(status: ChecksumStatus) -> &'static str {
    match status {
        ChecksumStatus::NotExpected => "none",
        ChecksumStatus::Valid(_) => "ok",
        ChecksumStatus::Mismatch { .. } => "mismatch",
        ChecksumStatus::Missing => "missing",
    }
}

fn is_invalid(response: &DecodedResponse) -> bool {
    match response {
        DecodedResponse::Text { checksum, .. } => matches!(*checksum, "mismatch" | "missing"),
        DecodedResponse::Binary { error, .. } => error.is_some(),
        DecodedResponse::Feedback { .. } => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_with_checksum_status() {
        let decoded = classify(Framing::Newline, Bytes::from_static(b"ab*3\r\n"), true);
        assert_eq!(
            decoded,
            DecodedResponse::Text {
                text: "ab".to_string(),
                checksum: "ok"
            }
        );
        assert!(!is_invalid(&decoded));

        let decoded = classify(Framing::Newline, Bytes::from_static(b"ab*4\r\n"), true);
        assert!(is_invalid(&decoded));
    }

    #[test]
    fn feedback_payload_is_decoded() {
        let payload = FeedbackFrame {
            theta: 500,
            gamma: -250,
        }
        .encode();
        let decoded = classify(Framing::Fixed, Bytes::copy_from_slice(&payload), false);
        assert_eq!(
            decoded,
            DecodedResponse::Feedback {
                theta: 0.5,
                gamma: -0.25
            }
        );
    }

    #[test]
    fn corrupt_feedback_is_flagged() {
        let mut payload = FeedbackFrame { theta: 1, gamma: 1 }.encode();
        payload[5] ^= 0xff;
        let decoded = classify(Framing::Fixed, Bytes::copy_from_slice(&payload), false);
        assert!(is_invalid(&decoded));
    }

    #[test]
    fn other_binary_is_passed_through() {
        let decoded = classify(Framing::Fixed, Bytes::from_static(b"xyz"), false);
        assert_eq!(
            decoded,
            DecodedResponse::Binary {
                hex: "78 79 7a".to_string(),
                error: None
            }
        );
    }
}
