use std::time::{SystemTime, UNIX_EPOCH};

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::util::format_age;

/// Full credit amount with thousands separators: `1,234,567 Cr`.
pub fn format_credits(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut result = String::new();
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    let grouped: String = result.chars().rev().collect();
    if rounded < 0 {
        format!("-{grouped} Cr")
    } else {
        format!("{grouped} Cr")
    }
}

/// Short amount for tight columns: `1.2M`, `15k`, `950`.
pub fn format_compact(value: f64) -> String {
    let rounded = value.round() as i64;
    if rounded.abs() >= 1_000_000 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if rounded.abs() >= 1_000 {
        format!("{:.0}k", value / 1_000.0)
    } else {
        format!("{}", rounded)
    }
}

pub fn format_ly(distance: f64) -> String {
    format!("{distance:.1} ly")
}

pub fn format_ls(distance: Option<f64>) -> String {
    distance
        .map(|d| format!("{d:.0} ls"))
        .unwrap_or_else(|| "—".to_string())
}

pub fn format_units(value: u32) -> String {
    if value == 0 {
        "—".to_string()
    } else if value >= 10_000 {
        format!("{:.1}k", value as f64 / 1000.0)
    } else {
        value.to_string()
    }
}

pub fn humanize_age(unix_secs: u64) -> String {
    if unix_secs == 0 {
        return "unknown".to_string();
    }
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("{} ago", format_age(now.saturating_sub(unix_secs)))
}

pub fn format_timestamp(unix_secs: u64) -> String {
    i64::try_from(unix_secs)
        .ok()
        .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
        .and_then(|dt| dt.format(&Rfc3339).ok())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credits_get_thousands_separators() {
        assert_eq!(format_credits(0.0), "0 Cr");
        assert_eq!(format_credits(999.4), "999 Cr");
        assert_eq!(format_credits(1_234_567.0), "1,234,567 Cr");
        assert_eq!(format_credits(-12_500.0), "-12,500 Cr");
    }

    #[test]
    fn compact_amounts() {
        assert_eq!(format_compact(950.0), "950");
        assert_eq!(format_compact(15_200.0), "15k");
        assert_eq!(format_compact(1_240_000.0), "1.2M");
    }

    #[test]
    fn units_and_distances() {
        assert_eq!(format_units(0), "—");
        assert_eq!(format_units(850), "850");
        assert_eq!(format_units(12_500), "12.5k");
        assert_eq!(format_ly(6.04), "6.0 ly");
        assert_eq!(format_ls(None), "—");
        assert_eq!(format_ls(Some(1234.4)), "1234 ls");
    }

    #[test]
    fn timestamps() {
        assert_eq!(format_timestamp(1_500_000_000), "2017-07-14T02:40:00Z");
        assert_eq!(humanize_age(0), "unknown");
    }
}
