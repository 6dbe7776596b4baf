//! Formatting helpers for document information rows.

use chrono::{Duration, NaiveDate, NaiveDateTime};

const DATE_OUTPUT_FORMAT: &str = "%d.%m.%Y %H:%M:%S";
const ELLIPSIS: &str = "...";

/// Cuts `text` to at most `max_chars` characters, ending in `...` when shortened.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    let len = text.chars().count();
    if len <= max_chars {
        return text.to_string();
    }
    if max_chars <= ELLIPSIS.len() {
        return text.chars().take(max_chars).collect();
    }
    let mut out: String = text.chars().take(max_chars - ELLIPSIS.len()).collect();
    out.push_str(ELLIPSIS);
    out
}

pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0B".to_string();
    }

    let mut unit = 0usize;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{value:.2}");
    let rounded = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{rounded} {}", UNITS[unit])
}

/// Renders a PDF or ISO date string as `dd.mm.yyyy HH:MM:SS` (UTC when an offset
/// is present). Unrecognised input is returned unchanged.
pub fn parse_date(raw: &str) -> String {
    let parsers: [fn(&str) -> Option<NaiveDateTime>; 8] = [
        |s| compact_with_offset(s.strip_prefix("D:")?),
        |s| compact_utc(s.strip_prefix("D:")?),
        compact_with_offset,
        compact_utc,
        iso_with_offset,
        iso_utc,
        |s| short_date(s.strip_prefix("D:")?),
        ordinal_date,
    ];

    parsers
        .iter()
        .find_map(|parse| parse(raw))
        .map(|date| date.format(DATE_OUTPUT_FORMAT).to_string())
        .unwrap_or_else(|| raw.to_string())
}

fn split_digits(raw: &str, count: usize) -> Option<(&str, &str)> {
    let head = raw.get(..count)?;
    head.bytes()
        .all(|b| b.is_ascii_digit())
        .then(|| (head, &raw[count..]))
}

fn two_digits(raw: &str, at: usize) -> Option<i64> {
    let (digits, _) = split_digits(raw.get(at..)?, 2)?;
    digits.parse().ok()
}

/// `+HH'mm` (PDF) or `+HH:mm` (ISO) offset following a timestamp.
fn offset(rest: &str, separator: u8) -> Option<Duration> {
    let bytes = rest.as_bytes();
    let sign = match bytes.first()? {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    if *bytes.get(3)? != separator {
        return None;
    }
    let hours = two_digits(rest, 1)?;
    let minutes = two_digits(rest, 4)?;
    Some(Duration::minutes(sign * (hours * 60 + minutes)))
}

fn compact(stamp: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(stamp, "%Y%m%d%H%M%S").ok()
}

fn compact_with_offset(raw: &str) -> Option<NaiveDateTime> {
    let (stamp, rest) = split_digits(raw, 14)?;
    let offset = offset(rest, b'\'')?;
    Some(compact(stamp)? - offset)
}

fn compact_utc(raw: &str) -> Option<NaiveDateTime> {
    let (stamp, rest) = split_digits(raw, 14)?;
    if !rest.starts_with('Z') {
        return None;
    }
    compact(stamp)
}

fn iso(raw: &str) -> Option<(NaiveDateTime, &str)> {
    let stamp = raw.get(..19)?;
    let date = NaiveDateTime::parse_from_str(stamp, "%Y-%m-%dT%H:%M:%S").ok()?;
    Some((date, &raw[19..]))
}

fn iso_with_offset(raw: &str) -> Option<NaiveDateTime> {
    let (date, rest) = iso(raw)?;
    Some(date - offset(rest, b':')?)
}

fn iso_utc(raw: &str) -> Option<NaiveDateTime> {
    let (date, rest) = iso(raw)?;
    rest.starts_with('Z').then_some(date)
}

fn short_date(raw: &str) -> Option<NaiveDateTime> {
    let (stamp, _) = split_digits(raw, 8)?;
    NaiveDate::parse_from_str(stamp, "%Y%m%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
}

fn ordinal_date(raw: &str) -> Option<NaiveDateTime> {
    let (stamp, _) = split_digits(raw, 7)?;
    NaiveDate::parse_from_str(stamp, "%Y%j")
        .ok()?
        .and_hms_opt(0, 0, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate_text("report.pdf", 50), "report.pdf");
    }

    #[test]
    fn truncate_appends_ellipsis() {
        assert_eq!(truncate_text("abcdefghij", 8), "abcde...");
        assert_eq!(truncate_text("abcdefghij", 8).chars().count(), 8);
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        assert_eq!(truncate_text("çğışöüçğış", 6), "çğı...");
    }

    #[test]
    fn file_sizes_are_humanised() {
        assert_eq!(format_file_size(0), "0B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(10_726_932), "10.23 MB");
    }

    #[test]
    fn pdf_dates_with_offset_are_normalised_to_utc() {
        assert_eq!(parse_date("D:20240131120000+02'00"), "31.01.2024 10:00:00");
        assert_eq!(parse_date("D:20240131120000-01'30"), "31.01.2024 13:30:00");
    }

    #[test]
    fn pdf_dates_in_utc() {
        assert_eq!(parse_date("D:20240131120000Z"), "31.01.2024 12:00:00");
        assert_eq!(parse_date("20240131120000Z"), "31.01.2024 12:00:00");
    }

    #[test]
    fn iso_dates() {
        assert_eq!(parse_date("2023-05-06T07:08:09+01:00"), "06.05.2023 06:08:09");
        assert_eq!(parse_date("2023-05-06T07:08:09Z"), "06.05.2023 07:08:09");
    }

    #[test]
    fn short_and_ordinal_dates() {
        assert_eq!(parse_date("D:20200229"), "29.02.2020 00:00:00");
        assert_eq!(parse_date("2024032"), "01.02.2024 00:00:00");
    }

    #[test]
    fn unknown_dates_pass_through() {
        assert_eq!(parse_date(""), "");
        assert_eq!(parse_date("yesterday"), "yesterday");
    }
}
