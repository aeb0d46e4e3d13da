//! Timestamp formatting for the `__DATE__` and `__TIME__` built-ins,
//! without pulling in a calendar crate.

use std::time::{SystemTime, UNIX_EPOCH};

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn is_leap(year: u64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn civil_date(days_since_epoch: u64) -> (u64, usize, u64) {
    let mut year = 1970;
    let mut days = days_since_epoch;
    loop {
        let in_year: u64 = if is_leap(year) { 366 } else { 365 };
        if days < in_year {
            break;
        }
        days -= in_year;
        year += 1;
    }
    let lengths: [u64; 12] = [
        31,
        if is_leap(year) { 29 } else { 28 },
        31,
        30,
        31,
        30,
        31,
        31,
        30,
        31,
        30,
        31,
    ];
    let mut month = 0;
    while days >= lengths[month] {
        days -= lengths[month];
        month += 1;
    }
    (year, month, days + 1)
}

/// Today as `"Mmm dd yyyy"` (UTC), day space-padded like `__DATE__`.
pub(crate) fn current_date() -> String {
    let (year, month, day) = civil_date(epoch_seconds() / 86_400);
    format!("{} {:>2} {}", MONTHS[month], day, year)
}

/// The wall clock as `"hh:mm:ss"` (UTC).
pub(crate) fn current_time() -> String {
    let of_day = epoch_seconds() % 86_400;
    format!(
        "{:02}:{:02}:{:02}",
        of_day / 3600,
        of_day % 3600 / 60,
        of_day % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn civil_date_epoch() {
        assert_eq!(civil_date(0), (1970, 0, 1));
        assert_eq!(civil_date(31), (1970, 1, 1));
        assert_eq!(civil_date(365), (1971, 0, 1));
    }

    #[test]
    fn leap_years() {
        assert!(is_leap(2000));
        assert!(is_leap(2024));
        assert!(!is_leap(1900));
        assert!(!is_leap(2023));
        // Feb 29 2024 is day 19782
        assert_eq!(civil_date(19_782), (2024, 1, 29));
    }

    #[test]
    fn formats() {
        let date = current_date();
        assert_eq!(date.len(), 11);
        assert!(MONTHS.iter().any(|m| date.starts_with(m)));
        let time = current_time();
        assert_eq!(time.len(), 8);
        assert_eq!(time.as_bytes()[2], b':');
        assert_eq!(time.as_bytes()[5], b':');
    }
}
