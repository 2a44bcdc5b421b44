pub mod version;

/// Compact age label: `42s`, `5m`, `3h`, `2d`.
pub fn format_age(secs: u64) -> String {
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86400 {
        format!("{}h", secs / 3600)
    } else {
        format!("{}d", secs / 86400)
    }
}

#[cfg(test)]
mod tests {
    use super::format_age;

    #[test]
    fn picks_the_largest_unit() {
        assert_eq!(format_age(42), "42s");
        assert_eq!(format_age(5 * 60 + 59), "5m");
        assert_eq!(format_age(3 * 3600), "3h");
        assert_eq!(format_age(2 * 86400 + 10), "2d");
    }
}
