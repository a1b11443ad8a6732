use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATE_FORMATS: &[&str] = &[
    "%m/%d/%y",
    "%m/%d/%Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m-%d-%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%Y%m%d",
];

const DATETIME_FORMATS: &[&str] = &[
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Permissive date parse. Unknown layouts and blank input give `None`.
pub fn coerce_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(d) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
    {
        return Some(d);
    }

    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(dt.date());
    }

    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_rfc2822(s))
        .ok()
        .map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn parses_common_layouts() {
        assert_eq!(coerce_date("3/14/2024"), ymd(2024, 3, 14));
        assert_eq!(coerce_date("03/04/2024"), ymd(2024, 3, 4));
        assert_eq!(coerce_date("3/14/24"), ymd(2024, 3, 14));
        assert_eq!(coerce_date("2024-03-14"), ymd(2024, 3, 14));
        assert_eq!(coerce_date("March 14, 2024"), ymd(2024, 3, 14));
        assert_eq!(coerce_date("Mar 14, 2024"), ymd(2024, 3, 14));
        assert_eq!(coerce_date(" 14 March 2024 "), ymd(2024, 3, 14));
    }

    #[test]
    fn parses_datetimes_to_their_date() {
        assert_eq!(coerce_date("3/14/2024 12:00:00 AM"), ymd(2024, 3, 14));
        assert_eq!(coerce_date("2024-03-14T08:30:00"), ymd(2024, 3, 14));
        assert_eq!(coerce_date("2024-03-14T08:30:00+00:00"), ymd(2024, 3, 14));
    }

    #[test]
    fn garbage_is_none() {
        assert_eq!(coerce_date(""), None);
        assert_eq!(coerce_date("TBD"), None);
        assert_eq!(coerce_date("13/45/2024"), None);
        assert_eq!(coerce_date("badvalue"), None);
    }
}
