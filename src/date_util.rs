use chrono::NaiveDate;

use crate::error::{Error, Result};

/// Today's local calendar date. Time of day is discarded.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Parse a `YYYY-MM-DD` calendar date.
///
/// The proximity helpers below never parse; callers validate input here first.
pub fn parse_calendar_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| Error::DateParse(format!("{s}: {e}")))
}

/// Whole days from `date` to `today`. `None` stands for "never", i.e. an
/// unbounded distance, and is returned as `None`.
pub fn days_since_on(date: Option<NaiveDate>, today: NaiveDate) -> Option<i64> {
    date.map(|d| (today - d).num_days())
}

/// [`days_since_on`] relative to the local calendar date.
pub fn days_since(date: Option<NaiveDate>) -> Option<i64> {
    days_since_on(date, self::today())
}

/// True if `date` is at most `n` days before `today`. An absent date is
/// outside every finite window.
pub fn is_within_last_n_days_on(date: Option<NaiveDate>, n: i64, today: NaiveDate) -> bool {
    days_since_on(date, today).is_some_and(|days| days <= n)
}

pub fn is_within_last_n_days(date: Option<NaiveDate>, n: i64) -> bool {
    is_within_last_n_days_on(date, n, self::today())
}

/// Both dates present and at most one day apart, in either order.
/// The same day counts as consecutive.
pub fn are_consecutive_days(a: Option<NaiveDate>, b: Option<NaiveDate>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => (a - b).num_days().abs() <= 1,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_parse_calendar_date() {
        assert_eq!(parse_calendar_date("2024-01-15").unwrap(), d(2024, 1, 15));
        assert_eq!(parse_calendar_date(" 2024-02-29 ").unwrap(), d(2024, 2, 29));
    }

    #[test]
    fn test_parse_calendar_date_rejects_garbage() {
        assert!(matches!(
            parse_calendar_date("2023-02-29"),
            Err(Error::DateParse(_))
        ));
        assert!(parse_calendar_date("yesterday").is_err());
        assert!(parse_calendar_date("").is_err());
    }

    #[test]
    fn test_days_since() {
        let today = d(2024, 1, 15);
        assert_eq!(days_since_on(Some(today), today), Some(0));
        assert_eq!(days_since_on(Some(d(2024, 1, 14)), today), Some(1));
        assert_eq!(days_since_on(Some(d(2023, 12, 31)), today), Some(15));
        // A future date yields a negative distance.
        assert_eq!(days_since_on(Some(d(2024, 1, 16)), today), Some(-1));
    }

    #[test]
    fn test_days_since_never() {
        assert_eq!(days_since_on(None, d(2024, 1, 15)), None);
        assert_eq!(days_since(None), None);
    }

    #[test]
    fn test_days_since_local_today() {
        assert_eq!(days_since(Some(today())), Some(0));
    }

    #[test]
    fn test_is_within_last_n_days() {
        let today = d(2024, 1, 15);
        assert!(is_within_last_n_days_on(Some(today), 1, today));
        assert!(is_within_last_n_days_on(Some(d(2024, 1, 14)), 1, today));
        assert!(!is_within_last_n_days_on(Some(d(2024, 1, 13)), 1, today));
        assert!(is_within_last_n_days_on(Some(d(2024, 1, 8)), 7, today));
        assert!(!is_within_last_n_days_on(None, 1, today));
        assert!(!is_within_last_n_days_on(None, i64::MAX, today));
    }

    #[test]
    fn test_are_consecutive_days() {
        assert!(are_consecutive_days(Some(d(2024, 1, 14)), Some(d(2024, 1, 15))));
        assert!(are_consecutive_days(Some(d(2024, 1, 15)), Some(d(2024, 1, 14))));
        assert!(are_consecutive_days(Some(d(2023, 12, 31)), Some(d(2024, 1, 1))));
        assert!(!are_consecutive_days(Some(d(2024, 1, 13)), Some(d(2024, 1, 15))));
        assert!(!are_consecutive_days(None, Some(d(2024, 1, 15))));
        assert!(!are_consecutive_days(Some(d(2024, 1, 15)), None));
        assert!(!are_consecutive_days(None, None));
    }

    #[test]
    fn test_same_day_is_consecutive() {
        for date in [d(2024, 1, 15), d(2024, 2, 29), d(1999, 12, 31)] {
            assert!(are_consecutive_days(Some(date), Some(date)));
        }
    }
}
