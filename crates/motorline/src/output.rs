use std::fmt::Write as _;
use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// A wire frame produced by `encode`.
#[derive(Debug, Serialize)]
pub struct EncodedFrame<'a> {
    pub kind: &'static str,
    pub length: usize,
    pub hex: String,
    #[serde(skip)]
    pub bytes: &'a [u8],
}

impl<'a> EncodedFrame<'a> {
    pub fn new(kind: &'static str, bytes: &'a [u8]) -> Self {
        Self {
            kind,
            length: bytes.len(),
            hex: hex(bytes),
            bytes,
        }
    }
}

pub fn print_encoded(frame: &EncodedFrame<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", to_json(frame)),
        OutputFormat::Table => {
            let mut table = new_table(vec!["KIND", "BYTES", "HEX"]);
            table.add_row(vec![
                frame.kind.to_string(),
                frame.length.to_string(),
                frame.hex.clone(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{} ({} bytes): {}", frame.kind, frame.length, frame.hex);
        }
        OutputFormat::Raw => print_raw(frame.bytes),
    }
}

/// One response decoded from a device stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodedResponse {
    Text {
        text: String,
        checksum: &'static str,
    },
    Feedback {
        theta: f32,
        gamma: f32,
    },
    Binary {
        hex: String,
        error: Option<String>,
    },
}

impl DecodedResponse {
    fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Feedback { .. } => "feedback",
            Self::Binary { .. } => "binary",
        }
    }

    fn summary(&self) -> String {
        match self {
            Self::Text { text, .. } => text.clone(),
            Self::Feedback { theta, gamma } => format!("theta={theta:.3} gamma={gamma:.3}"),
            Self::Binary { hex, error: None } => hex.clone(),
            Self::Binary {
                hex,
                error: Some(error),
            } => format!("{hex} ({error})"),
        }
    }

    fn checksum(&self) -> &'static str {
        match self {
            Self::Text { checksum, .. } => checksum,
            _ => "-",
        }
    }
}

pub fn print_responses(responses: &[DecodedResponse], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for response in responses {
                println!("{}", to_json(response));
            }
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["#", "KIND", "CHECKSUM", "CONTENT"]);
            for (index, response) in responses.iter().enumerate() {
                table.add_row(vec![
                    index.to_string(),
                    response.kind().to_string(),
                    response.checksum().to_string(),
                    response.summary(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for response in responses {
                match response {
                    DecodedResponse::Text { checksum, .. } if *checksum != "none" => {
                        println!("{:<8} {} [{checksum}]", response.kind(), response.summary())
                    }
                    _ => println!("{:<8} {}", response.kind(), response.summary()),
                }
            }
        }
        OutputFormat::Raw => {
            for response in responses {
                println!("{}", response.summary());
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Space-separated lowercase hex.
pub fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{byte:02x}");
    }
    out
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_is_space_separated() {
        assert_eq!(hex(&[0x01, 0x00, b'h', b'\n']), "01 00 68 0a");
        assert_eq!(hex(&[]), "");
    }

    #[test]
    fn decoded_responses_serialize_with_kind_tag() {
        let text = DecodedResponse::Text {
            text: "invalid motor 9".to_string(),
            checksum: "none",
        };
        let value = serde_json::to_value(&text).unwrap();
        assert_eq!(value["kind"], "text");
        assert_eq!(value["text"], "invalid motor 9");

        let feedback = DecodedResponse::Feedback {
            theta: 0.5,
            gamma: -0.25,
        };
        let value = serde_json::to_value(&feedback).unwrap();
        assert_eq!(value["kind"], "feedback");
        assert_eq!(value["gamma"], -0.25);
    }

    #[test]
    fn encoded_frame_json_omits_raw_bytes() {
        let frame = EncodedFrame::new("text", b"\x01\x00h\n");
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["length"], 4);
        assert_eq!(value["hex"], "01 00 68 0a");
        assert!(value.get("bytes").is_none());
    }
}
