//! Number scanning with C `strtod`/`strtol` semantics
//!
//! Both helpers skip leading whitespace, accept the longest valid prefix and
//! report how many bytes were consumed so that callers can keep scanning
//! after the number.

/// Parse a decimal floating point prefix of `s`
pub fn strtod(s: &str) -> Option<(f64, usize)> {
    let bytes = s.as_bytes();
    let mut i = skip_ws(bytes, 0);
    let start = i;
    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }
    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;
    if i < bytes.len() && bytes[i] == b'.' {
        let frac_start = i + 1;
        let mut j = frac_start;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        digits += j - frac_start;
        if digits > 0 {
            i = j;
        }
    }
    if digits == 0 {
        return None;
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }
    s[start..i].parse::<f64>().ok().map(|v| (v, i))
}

/// Parse an integer prefix of `s` in the given radix
pub fn strtol(s: &str, radix: u32) -> Option<(i64, usize)> {
    let bytes = s.as_bytes();
    let mut i = skip_ws(bytes, 0);
    let mut negative = false;
    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        negative = bytes[i] == b'-';
        i += 1;
    }
    let digits_start = i;
    let mut value: i64 = 0;
    while i < bytes.len() {
        match char::from(bytes[i]).to_digit(radix) {
            Some(d) => {
                value = value.saturating_mul(i64::from(radix)).saturating_add(i64::from(d));
                i += 1;
            }
            None => break,
        }
    }
    if i == digits_start {
        return None;
    }
    Some((if negative { -value } else { value }, i))
}

fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && matches!(bytes[i], b' ' | b'\t' | b'\n' | b'\r' | 0x0B | 0x0C) {
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strtod_prefixes() {
        assert_eq!(strtod("12.5abc"), Some((12.5, 4)));
        assert_eq!(strtod("  -3"), Some((-3.0, 4)));
        assert_eq!(strtod(".5"), Some((0.5, 2)));
        assert_eq!(strtod("5."), Some((5.0, 2)));
        assert_eq!(strtod("1e2)"), Some((100.0, 3)));
        assert_eq!(strtod("1e)"), Some((1.0, 1)));
        assert_eq!(strtod("abc"), None);
        assert_eq!(strtod("-"), None);
    }

    #[test]
    fn test_strtol() {
        assert_eq!(strtol("42,", 10), Some((42, 2)));
        assert_eq!(strtol("FF&", 16), Some((255, 2)));
        assert_eq!(strtol(" -7", 10), Some((-7, 3)));
        assert_eq!(strtol("x", 10), None);
    }
}
