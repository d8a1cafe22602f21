//! Single-line rendering of raw protocol bytes for log records.

use std::fmt::Write;

const MAX_PREVIEW: usize = 160;

/// Render `bytes` as printable ASCII, escaping everything else.
///
/// `\n`, `\r` and `\t` keep their usual escapes; other bytes outside the printable
/// range become `\xNN`. Output is capped at 160 input bytes followed by `…`.
pub fn escape_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().min(MAX_PREVIEW) + 8);
    for (count, &byte) in bytes.iter().enumerate() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7e => out.push(char::from(byte)),
            other => {
                let _ = write!(&mut out, "\\x{other:02X}");
            }
        }
    }
    out
}
