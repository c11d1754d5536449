//! Timestamp handling for language-model replies.
//!
//! Replies are free-form text. The only recognised range form is
//! `HH:MM:SS.mmm - HH:MM:SS.mmm`; anything else is ignored.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::warn;

static RANGE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{2}:\d{2}:\d{2}\.\d{3})\s*-\s*(\d{2}:\d{2}:\d{2}\.\d{3})")
        .expect("timestamp range pattern is valid")
});

static DIGIT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d$").expect("digit pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimecodeError {
    #[error("expected HH:MM:SS[.mmm], got {0:?}")]
    WrongFieldCount(String),

    #[error("non-numeric component {component:?} in {input:?}")]
    NotNumeric { input: String, component: String },
}

/// A timestamp pair lifted verbatim from reply text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMatch {
    pub start_text: String,
    pub end_text: String,
}

/// All `HH:MM:SS.mmm - HH:MM:SS.mmm` substrings of `text`, in order of appearance.
pub fn find_range_matches(text: &str) -> Vec<RawMatch> {
    RANGE_REGEX
        .captures_iter(text)
        .map(|caps| RawMatch {
            start_text: caps[1].to_string(),
            end_text: caps[2].to_string(),
        })
        .collect()
}

fn is_decimal_digit(c: char) -> bool {
    let mut buf = [0u8; 4];
    DIGIT_REGEX.is_match(c.encode_utf8(&mut buf))
}

/// Value of any Unicode decimal digit (the characters `\d` matches).
///
/// Decimal digits are encoded in contiguous runs of ten starting at zero, so a
/// digit's value is its distance from the start of its run, modulo ten.
fn digit_value(c: char) -> Option<u64> {
    if let Some(d) = c.to_digit(10) {
        return Some(u64::from(d));
    }
    if !is_decimal_digit(c) {
        return None;
    }

    let mut code = u32::from(c);
    let mut offset = 0u64;
    while let Some(prev) = code.checked_sub(1).and_then(char::from_u32) {
        if !is_decimal_digit(prev) {
            break;
        }
        offset += 1;
        code -= 1;
    }
    Some(offset % 10)
}

/// A non-empty run of decimal digits as an integer.
fn decimal_value(component: &str) -> Option<u64> {
    if component.is_empty() {
        return None;
    }
    component.chars().try_fold(0u64, |acc, c| {
        acc.checked_mul(10)?.checked_add(digit_value(c)?)
    })
}

/// Parse `HH:MM:SS.mmm` (or `HH:MM:SS`) into seconds.
pub fn parse_timestamp(text: &str) -> Result<f64, TimecodeError> {
    let fields: Vec<&str> = text.split(':').collect();
    let [hours, minutes, rest] = fields.as_slice() else {
        return Err(TimecodeError::WrongFieldCount(text.to_string()));
    };

    let (seconds, millis) = match rest.split_once('.') {
        Some((seconds, millis)) => (seconds, millis),
        None => (*rest, "0"),
    };

    let number = |component: &str| -> Result<u64, TimecodeError> {
        decimal_value(component).ok_or_else(|| TimecodeError::NotNumeric {
            input: text.to_string(),
            component: component.to_string(),
        })
    };

    let total = number(hours)? as f64 * 3600.0
        + number(minutes)? as f64 * 60.0
        + number(seconds)? as f64
        + number(millis)? as f64 / 1000.0;
    Ok(total)
}

/// Lenient form of [`parse_timestamp`]: malformed input is logged and read as `0.0`.
pub fn timestamp_to_seconds(text: &str) -> f64 {
    match parse_timestamp(text) {
        Ok(seconds) => seconds,
        Err(e) => {
            warn!(timestamp = text, error = %e, "malformed timestamp, using 0.0");
            0.0
        }
    }
}

/// Format seconds as `HH:MM:SS.mmm`, the form replies are expected to use.
pub fn format_timestamp(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "00:00:00.000".to_string();
    }

    let total_millis = (seconds * 1000.0).round() as u64;
    let millis = total_millis % 1000;
    let total_seconds = total_millis / 1000;
    let secs = total_seconds % 60;
    let minutes = (total_seconds / 60) % 60;
    let hours = total_seconds / 3600;

    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn finds_ranges_in_text_order() {
        let reply = "Keep these:\n00:01:15.500 - 00:01:22.000\nand 00:00:03.000-00:00:08.000 too";
        let matches = find_range_matches(reply);
        assert_eq!(
            matches,
            vec![
                RawMatch {
                    start_text: "00:01:15.500".into(),
                    end_text: "00:01:22.000".into(),
                },
                RawMatch {
                    start_text: "00:00:03.000".into(),
                    end_text: "00:00:08.000".into(),
                },
            ]
        );
    }

    #[test]
    fn tolerates_whitespace_around_separator() {
        let matches = find_range_matches("00:00:01.000 \t-\n 00:00:02.000");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].end_text, "00:00:02.000");
    }

    #[test]
    fn skips_other_formats() {
        let reply = "00:00:01 - 00:00:02\n0:00:01.000 - 0:00:02.000\n00:00:01,000 --> 00:00:02,000\n00:00:01.00 - 00:00:02.00";
        assert!(find_range_matches(reply).is_empty());
        assert!(find_range_matches("").is_empty());
    }

    #[test]
    fn parses_full_timestamp() {
        assert!(approx(parse_timestamp("01:02:03.456").unwrap(), 3723.456));
        assert!(approx(parse_timestamp("00:00:00.000").unwrap(), 0.0));
    }

    #[test]
    fn missing_fraction_means_zero_millis() {
        assert!(approx(parse_timestamp("00:01:05").unwrap(), 65.0));
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert_eq!(
            parse_timestamp("01:02"),
            Err(TimecodeError::WrongFieldCount("01:02".into()))
        );
        assert!(parse_timestamp("00:00:00:01.000").is_err());
    }

    #[test]
    fn rejects_non_numeric_component() {
        let err = parse_timestamp("00:xx:01.000").unwrap_err();
        assert_eq!(
            err,
            TimecodeError::NotNumeric {
                input: "00:xx:01.000".into(),
                component: "xx".into(),
            }
        );
    }

    #[test]
    fn non_ascii_digits_keep_their_value() {
        // Full-width "01" hours.
        assert!(approx(
            parse_timestamp("\u{ff10}\u{ff11}:00:01.000").unwrap(),
            3601.0
        ));
        // Arabic-Indic "05" seconds.
        assert!(approx(parse_timestamp("00:00:\u{0660}\u{0665}.500").unwrap(), 5.5));
        // Mathematical double-struck "7"; these runs sit back to back.
        assert_eq!(digit_value('\u{1d7df}'), Some(7));
    }

    #[test]
    fn rejects_empty_and_oversized_components() {
        assert!(parse_timestamp("00::01.000").is_err());
        assert!(parse_timestamp("99999999999999999999:00:00.000").is_err());
        assert_eq!(digit_value('x'), None);
    }

    #[test]
    fn lenient_conversion_reads_garbage_as_zero() {
        assert_eq!(timestamp_to_seconds("garbage"), 0.0);
        assert!(approx(timestamp_to_seconds("00:00:08.200"), 8.2));
    }

    #[test]
    fn formats_reply_timestamps() {
        assert_eq!(format_timestamp(0.0), "00:00:00.000");
        assert_eq!(format_timestamp(-3.0), "00:00:00.000");
        assert_eq!(format_timestamp(75.5), "00:01:15.500");
        assert_eq!(format_timestamp(3723.456), "01:02:03.456");
        assert_eq!(format_timestamp(59.9996), "00:01:00.000");
    }
}
