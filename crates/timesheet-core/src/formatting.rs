/// Render a month key (`"MMYYYY"`) as `"MM.YYYY"`.
///
/// Keys that are too short to split are returned unchanged.
///
/// # Examples
///
/// ```
/// use timesheet_core::formatting::format_month_key;
///
/// assert_eq!(format_month_key("032024"), "03.2024");
/// assert_eq!(format_month_key("1"), "1");
/// ```
pub fn format_month_key(key: &str) -> String {
    match (key.get(..2), key.get(2..)) {
        (Some(month), Some(year)) if !year.is_empty() => format!("{month}.{year}"),
        _ => key.to_string(),
    }
}

/// Format fractional hours with two decimals and an `h` suffix.
///
/// # Examples
///
/// ```
/// use timesheet_core::formatting::format_hours;
///
/// assert_eq!(format_hours(8.5), "8.50h");
/// assert_eq!(format_hours(0.25), "0.25h");
/// assert_eq!(format_hours(10.0 / 60.0), "0.17h");
/// ```
pub fn format_hours(hours: f64) -> String {
    format!("{hours:.2}h")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_month_key() {
        assert_eq!(format_month_key("122023"), "12.2023");
        assert_eq!(format_month_key(""), "");
        assert_eq!(format_month_key("03"), "03");
    }

    #[test]
    fn test_format_hours_zero() {
        assert_eq!(format_hours(0.0), "0.00h");
    }
}
