//! XOR checksums shared by the binary sub-commands and checksummed responses.

/// Fold `bytes` with XOR, left to right.
pub fn compute(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &byte| acc ^ byte)
}

/// True when `received` is the checksum of `bytes`.
pub fn verify(bytes: &[u8], received: u8) -> bool {
    compute(bytes) == received
}

/// Split a trailing `*N` decimal checksum suffix off `text`.
///
/// Returns the text before the last `*` and the parsed checksum, or `None` when the
/// suffix is missing or is not a decimal number in `0..=255`.
pub fn split_suffix(text: &[u8]) -> Option<(&[u8], u8)> {
    let star = text.iter().rposition(|&b| b == b'*')?;
    let digits = &text[star + 1..];
    if digits.is_empty() || digits.len() > 3 || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let value = digits
        .iter()
        .fold(0u16, |acc, &d| acc * 10 + u16::from(d - b'0'));
    let checksum = u8::try_from(value).ok()?;
    Some((&text[..star], checksum))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_zero() {
        assert_eq!(compute(&[]), 0);
    }

    #[test]
    fn folds_in_order() {
        assert_eq!(compute(&[0x0f, 0xf0]), 0xff);
        assert_eq!(compute(b"C"), b'C');
        assert_eq!(compute(&[0xaa, 0xaa]), 0);
    }

    #[test]
    fn verify_detects_single_byte_corruption() {
        let payload = [b'C', 0x7b, 0x00, 0x38, 0xfe];
        let sum = compute(&payload);
        assert!(verify(&payload, sum));
        for i in 0..payload.len() {
            let mut corrupted = payload;
            corrupted[i] ^= 0x01;
            assert!(!verify(&corrupted, sum), "corruption at {i} went unnoticed");
        }
    }

    #[test]
    fn splits_decimal_suffix() {
        assert_eq!(split_suffix(b"1.000000 2.000000*45"), Some((&b"1.000000 2.000000"[..], 45)));
        assert_eq!(split_suffix(b"a*b*255"), Some((&b"a*b"[..], 255)));
    }

    #[test]
    fn rejects_bad_suffix() {
        assert_eq!(split_suffix(b"no suffix"), None);
        assert_eq!(split_suffix(b"trailing*"), None);
        assert_eq!(split_suffix(b"big*256"), None);
        assert_eq!(split_suffix(b"hex*0x1"), None);
    }
}
