//! Independent expected-output computation. Never consults the argument
//! list a scenario accumulates; the declared sort key and reverse flag are
//! the only inputs besides the line buffer.

use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Lexicographic,
    Month,
    Numeric,
    GeneralNumeric,
    HumanNumeric,
    Version,
}

/// Stable sort of a copy of `lines` under `key`, with the whole line as the
/// last-resort tie-break (the utility's default behaviour without
/// `--stable`). `reverse` inverts the entire comparison.
pub fn sorted(lines: &[String], key: SortKey, reverse: bool) -> Vec<String> {
    let mut out = lines.to_vec();
    out.sort_by(|a, b| {
        let ord = compare(a, b, key);
        if reverse {
            ord.reverse()
        } else {
            ord
        }
    });
    out
}

pub fn compare(a: &str, b: &str, key: SortKey) -> Ordering {
    key_compare(a, b, key).then_with(|| a.as_bytes().cmp(b.as_bytes()))
}

fn key_compare(a: &str, b: &str, key: SortKey) -> Ordering {
    match key {
        SortKey::Lexicographic => a.as_bytes().cmp(b.as_bytes()),
        SortKey::Month => month_index(a).cmp(&month_index(b)),
        SortKey::Numeric => float_cmp(numeric_prefix(a, false), numeric_prefix(b, false)),
        SortKey::GeneralNumeric => float_cmp(numeric_prefix(a, true), numeric_prefix(b, true)),
        SortKey::HumanNumeric => human_cmp(a, b),
        SortKey::Version => version_cmp(a, b),
    }
}

fn float_cmp(a: f64, b: f64) -> Ordering {
    // Parsers never yield NaN; partial_cmp also keeps -0 == 0.
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// 1..=12 for a recognized month abbreviation after leading blanks, 0 for
/// anything else (non-months order before all months).
fn month_index(line: &str) -> u32 {
    let abbrev: String = line
        .trim_start()
        .chars()
        .take(3)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    MONTHS
        .iter()
        .position(|m| *m == abbrev)
        .map(|i| i as u32 + 1)
        .unwrap_or(0)
}

/// Longest leading decimal prefix after optional blanks: sign, digits,
/// decimal point, digits, and (for the general-numeric key) an exponent.
/// Unparseable lines convert to 0. The numeric and human-numeric keys only
/// recognize a `-` sign; a leading `+` stops the parse and the line keys to
/// zero. Only the strtod-style general-numeric parse accepts `+`.
fn numeric_prefix(line: &str, exponent: bool) -> f64 {
    let s = line.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if end < bytes.len() && (bytes[end] == b'-' || (exponent && bytes[end] == b'+')) {
        end += 1;
    }
    let mut saw_digit = false;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
        saw_digit = true;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
            saw_digit = true;
        }
    }
    if !saw_digit {
        return 0.0;
    }
    if exponent && end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > digits_start {
            end = exp_end;
        }
    }
    s[..end].parse().unwrap_or(0.0)
}

const SI_SUFFIXES: [char; 8] = ['K', 'M', 'G', 'T', 'P', 'E', 'Z', 'Y'];

/// Human-numeric ordering: sign class first, then suffix magnitude, then
/// the numeric value. `512M` sorts after `900K` regardless of digits.
fn human_cmp(a: &str, b: &str) -> Ordering {
    let (va, ra) = human_parts(a);
    let (vb, rb) = human_parts(b);
    let sign = |v: f64| {
        if v < 0.0 {
            -1
        } else if v > 0.0 {
            1
        } else {
            0
        }
    };
    let (sa, sb) = (sign(va), sign(vb));
    if sa != sb {
        return sa.cmp(&sb);
    }
    // Within a sign class a bigger suffix means farther from zero.
    let magnitude = (ra as i32 * sa).cmp(&(rb as i32 * sb));
    magnitude.then_with(|| float_cmp(va, vb))
}

fn human_parts(line: &str) -> (f64, u32) {
    let value = numeric_prefix(line, false);
    let s = line.trim_start();
    let numeric_len = s.len()
        - s.trim_start_matches(|c: char| {
            c == '+' || c == '-' || c == '.' || c.is_ascii_digit()
        })
        .len();
    let rank = s[numeric_len..]
        .chars()
        .next()
        .and_then(|c| SI_SUFFIXES.iter().position(|s| *s == c))
        .map(|i| i as u32 + 1)
        .unwrap_or(0);
    (value, rank)
}

/// Version comparison over alternating non-digit / digit chunks; digit
/// chunks compare numerically with leading zeros ignored.
fn version_cmp(a: &str, b: &str) -> Ordering {
    let mut ia = a.as_bytes();
    let mut ib = b.as_bytes();
    loop {
        match (ia.is_empty(), ib.is_empty()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
        let (text_a, rest_a) = split_chunk(ia, false);
        let (text_b, rest_b) = split_chunk(ib, false);
        match text_a.cmp(text_b) {
            Ordering::Equal => {}
            ord => return ord,
        }
        let (num_a, rest_a) = split_chunk(rest_a, true);
        let (num_b, rest_b) = split_chunk(rest_b, true);
        match digits_cmp(num_a, num_b) {
            Ordering::Equal => {}
            ord => return ord,
        }
        ia = rest_a;
        ib = rest_b;
    }
}

fn split_chunk(s: &[u8], digits: bool) -> (&[u8], &[u8]) {
    let end = s
        .iter()
        .position(|c| c.is_ascii_digit() != digits)
        .unwrap_or(s.len());
    s.split_at(end)
}

fn digits_cmp(a: &[u8], b: &[u8]) -> Ordering {
    fn strip_zeros(s: &[u8]) -> &[u8] {
        let start = s.iter().position(|c| *c != b'0').unwrap_or(s.len());
        &s[start..]
    }
    let (a, b) = (strip_zeros(a), strip_zeros(b));
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn lexicographic_is_byte_order() {
        let out = sorted(&lines(&["b", "B", "a", "10", "2"]), SortKey::Lexicographic, false);
        assert_eq!(out, lines(&["10", "2", "B", "a", "b"]));
    }

    #[test]
    fn reverse_inverts_whole_comparison() {
        let out = sorted(&lines(&["a", "c", "b"]), SortKey::Lexicographic, true);
        assert_eq!(out, lines(&["c", "b", "a"]));
    }

    #[test]
    fn sorting_is_idempotent() {
        let input = lines(&["March", "January", "March", "December"]);
        let first = sorted(&input, SortKey::Month, false);
        let second = sorted(&input, SortKey::Month, false);
        assert_eq!(first, second);
    }

    #[test]
    fn month_order_and_unknowns() {
        let out = sorted(
            &lines(&["September", "February", "nonsense", "  April"]),
            SortKey::Month,
            false,
        );
        assert_eq!(out, lines(&["nonsense", "February", "  April", "September"]));
    }

    #[test]
    fn numeric_ignores_exponent_suffix() {
        // -n parses only up to the exponent marker.
        assert_eq!(
            compare("2.00000e+09", "3.50000", SortKey::Numeric),
            Ordering::Less
        );
        assert_eq!(
            compare("10", "9", SortKey::Numeric),
            Ordering::Greater
        );
    }

    #[test]
    fn numeric_rejects_plus_sign() {
        // -n only recognizes a `-` sign; plus-signed lines key to zero and
        // fall through to the byte-order tie-break.
        let out = sorted(&lines(&["+5", "3", "-2", "+10"]), SortKey::Numeric, false);
        assert_eq!(out, lines(&["-2", "+10", "+5", "3"]));
        // The strtod-style general-numeric parse does accept it.
        assert_eq!(
            compare("+5", "3", SortKey::GeneralNumeric),
            Ordering::Greater
        );
    }

    #[test]
    fn numeric_negative_zero_ties_on_bytes() {
        assert_eq!(
            compare("-0.00000", "0.00000", SortKey::Numeric),
            Ordering::Less
        );
    }

    #[test]
    fn general_numeric_honours_exponent() {
        assert_eq!(
            compare("1.00000e+02", "99", SortKey::GeneralNumeric),
            Ordering::Greater
        );
        // Unparseable lines act as zero and fall back to byte order.
        assert_eq!(
            compare("abc", "-5", SortKey::GeneralNumeric),
            Ordering::Greater
        );
    }

    #[test]
    fn human_numeric_suffix_outranks_digits() {
        assert_eq!(compare("900K", "1M", SortKey::HumanNumeric), Ordering::Less);
        assert_eq!(compare("2G", "512M", SortKey::HumanNumeric), Ordering::Greater);
        assert_eq!(compare("-1K", "-900", SortKey::HumanNumeric), Ordering::Less);
        assert_eq!(compare("-3", "5", SortKey::HumanNumeric), Ordering::Less);
    }

    #[test]
    fn version_chunks_compare_numerically() {
        assert_eq!(
            compare("1.2.10", "1.2.9", SortKey::Version),
            Ordering::Greater
        );
        assert_eq!(compare("0.99.1", "1.0.0", SortKey::Version), Ordering::Less);
        // Equal numeric chunks fall through to the byte-order tie-break.
        assert_eq!(compare("1.02", "1.2", SortKey::Version), Ordering::Less);
    }
}
