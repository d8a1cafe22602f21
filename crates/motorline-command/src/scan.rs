//! `scanf`-style token matching for text command lines.
//!
//! Every field first skips whitespace, then consumes the longest prefix that forms a
//! value. A field that cannot match leaves the scanner where it was, and callers
//! stop at the first miss and count how many fields matched.

/// Cursor over the bytes of one command line.
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Scanner positioned just past the one-byte command tag.
    pub fn after_tag(line: &'a [u8]) -> Self {
        Self {
            input: line,
            pos: line.len().min(1),
        }
    }

    /// Unsigned decimal integer with optional sign.
    ///
    /// Negative values wrap modulo 2^32 and oversized values saturate, matching
    /// what C's `%u` reports.
    pub fn unsigned(&mut self) -> Option<u32> {
        let start = self.skip_whitespace();
        let mut pos = start;
        let negative = match self.input.get(pos) {
            Some(b'-') => {
                pos += 1;
                true
            }
            Some(b'+') => {
                pos += 1;
                false
            }
            _ => false,
        };

        let digits_start = pos;
        let mut value: u32 = 0;
        let mut saturated = false;
        while let Some(&byte) = self.input.get(pos).filter(|b| b.is_ascii_digit()) {
            match value
                .checked_mul(10)
                .and_then(|v| v.checked_add(u32::from(byte - b'0')))
            {
                Some(next) => value = next,
                None => saturated = true,
            }
            pos += 1;
        }
        if pos == digits_start {
            return None;
        }

        self.pos = pos;
        if saturated {
            value = u32::MAX;
        }
        Some(if negative { value.wrapping_neg() } else { value })
    }

    /// Decimal floating-point number, `inf`/`infinity`, or `nan`.
    pub fn float(&mut self) -> Option<f32> {
        let start = self.skip_whitespace();
        let end = self.float_end(start)?;
        let text = std::str::from_utf8(&self.input[start..end]).ok()?;
        let value = text.parse::<f32>().ok()?;
        self.pos = end;
        Some(value)
    }

    /// Maximal run of non-whitespace bytes, at most `max` long.
    pub fn word(&mut self, max: usize) -> Option<&'a [u8]> {
        let start = self.skip_whitespace();
        let len = self.input[start..]
            .iter()
            .take(max)
            .take_while(|&&b| !is_space(b))
            .count();
        if len == 0 {
            return None;
        }
        self.pos = start + len;
        Some(&self.input[start..start + len])
    }

    /// Bytes not yet consumed.
    pub fn rest(&self) -> &'a [u8] {
        &self.input[self.pos..]
    }

    fn skip_whitespace(&self) -> usize {
        let skipped = self.input[self.pos..]
            .iter()
            .take_while(|&&b| is_space(b))
            .count();
        self.pos + skipped
    }

    fn float_end(&self, start: usize) -> Option<usize> {
        let input = self.input;
        let mut pos = start;
        if matches!(input.get(pos), Some(b'+' | b'-')) {
            pos += 1;
        }

        for word in [&b"infinity"[..], &b"inf"[..], &b"nan"[..]] {
            let end = pos + word.len();
            if input.len() >= end && input[pos..end].eq_ignore_ascii_case(word) {
                return Some(end);
            }
        }

        let int_digits = count_digits(&input[pos..]);
        pos += int_digits;
        let mut frac_digits = 0;
        if input.get(pos) == Some(&b'.') {
            frac_digits = count_digits(&input[pos + 1..]);
            if int_digits > 0 || frac_digits > 0 {
                pos += 1 + frac_digits;
            }
        }
        if int_digits == 0 && frac_digits == 0 {
            return None;
        }

        if matches!(input.get(pos), Some(b'e' | b'E')) {
            let mut exp = pos + 1;
            if matches!(input.get(exp), Some(b'+' | b'-')) {
                exp += 1;
            }
            let exp_digits = count_digits(&input[exp..]);
            if exp_digits > 0 {
                pos = exp + exp_digits;
            }
        }
        Some(pos)
    }
}

/// C `isspace`: space, `\t`, `\n`, `\v`, `\f`, `\r`.
pub fn is_space(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | 0x0b | 0x0c | b'\r')
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_template_fields() {
        let mut s = Scanner::after_tag(b"p 1 2.5 -0.25 3e2\n");
        assert_eq!(s.unsigned(), Some(1));
        assert_eq!(s.float(), Some(2.5));
        assert_eq!(s.float(), Some(-0.25));
        assert_eq!(s.float(), Some(300.0));
        assert_eq!(s.float(), None);
    }

    #[test]
    fn whitespace_between_tag_and_field_is_optional() {
        let mut s = Scanner::after_tag(b"p0 1.5");
        assert_eq!(s.unsigned(), Some(0));
        assert_eq!(s.float(), Some(1.5));
    }

    #[test]
    fn float_stops_at_garbage() {
        let mut s = Scanner::new(b"1.5abc");
        assert_eq!(s.float(), Some(1.5));
        assert_eq!(s.rest(), b"abc");
        assert_eq!(s.float(), None);
        assert_eq!(s.rest(), b"abc");
    }

    #[test]
    fn float_accepts_partial_forms() {
        assert_eq!(Scanner::new(b".5").float(), Some(0.5));
        assert_eq!(Scanner::new(b"7.").float(), Some(7.0));
        assert_eq!(Scanner::new(b"+3").float(), Some(3.0));
        assert_eq!(Scanner::new(b"2e").float(), Some(2.0));
        assert_eq!(Scanner::new(b"-INF").float(), Some(f32::NEG_INFINITY));
        assert!(Scanner::new(b"nan").float().unwrap().is_nan());
        assert_eq!(Scanner::new(b".").float(), None);
        assert_eq!(Scanner::new(b"-").float(), None);
        assert_eq!(Scanner::new(b"x1").float(), None);
    }

    #[test]
    fn exponent_without_digits_is_not_consumed() {
        let mut s = Scanner::new(b"4e+ 1");
        assert_eq!(s.float(), Some(4.0));
        assert_eq!(s.rest(), b"e+ 1");
    }

    #[test]
    fn unsigned_wraps_and_saturates() {
        assert_eq!(Scanner::new(b"-1").unsigned(), Some(u32::MAX));
        assert_eq!(Scanner::new(b"+7").unsigned(), Some(7));
        assert_eq!(Scanner::new(b"99999999999").unsigned(), Some(u32::MAX));
        assert_eq!(Scanner::new(b"x").unsigned(), None);
        assert_eq!(Scanner::new(b"-").unsigned(), None);
        assert_eq!(Scanner::new(b"").unsigned(), None);
    }

    #[test]
    fn unsigned_stops_at_decimal_point() {
        let mut s = Scanner::new(b"1.5");
        assert_eq!(s.unsigned(), Some(1));
        assert_eq!(s.float(), Some(0.5));
    }

    #[test]
    fn words_split_on_whitespace() {
        let mut s = Scanner::after_tag(b"w axis0.config.vel_limit 12.5\r\n");
        assert_eq!(s.word(128), Some(&b"axis0.config.vel_limit"[..]));
        assert_eq!(s.word(128), Some(&b"12.5"[..]));
        assert_eq!(s.word(128), None);
    }

    #[test]
    fn word_respects_max() {
        let mut s = Scanner::new(b"abcdef");
        assert_eq!(s.word(4), Some(&b"abcd"[..]));
        assert_eq!(s.word(4), Some(&b"ef"[..]));
    }

    #[test]
    fn after_tag_on_empty_line() {
        let mut s = Scanner::after_tag(b"");
        assert_eq!(s.unsigned(), None);
    }

    #[test]
    fn vertical_tab_is_whitespace() {
        let mut s = Scanner::new(b"\x0b\x0c 5");
        assert_eq!(s.unsigned(), Some(5));
    }
}
