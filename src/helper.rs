use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Local, Months, NaiveDate, NaiveTime, Offset, Utc,
};
use log::warn;

use crate::{JournalError, Result};

// Helper method for parsing species lists
pub fn parse_species(species: Option<String>) -> Vec<String> {
    species
        .map(|s| {
            s.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Parses a `YYYY-MM-DD` day
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| JournalError::InvalidDate {
        input: input.to_string(),
        expected: "YYYY-MM-DD",
    })
}

/// Parses a `YYYY-MM` month into the first day of that month
pub fn parse_month(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", input.trim()), "%Y-%m-%d").map_err(|_| {
        JournalError::InvalidDate {
            input: input.to_string(),
            expected: "YYYY-MM",
        }
    })
}

/// Parses an `HH:MM` time of day
pub fn parse_time(input: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(input.trim(), "%H:%M").map_err(|_| JournalError::InvalidDate {
        input: input.to_string(),
        expected: "HH:MM",
    })
}

/// The instant `time` on `date`, with both read as wall-clock values at `offset`
pub fn local_instant(date: NaiveDate, time: NaiveTime, offset: &FixedOffset) -> DateTime<Utc> {
    let local = date.and_time(time);
    (local - Duration::seconds(offset.local_minus_utc() as i64)).and_utc()
}

/// Midnight at the start of `date`, as seen from `offset`
pub fn day_start(date: NaiveDate, offset: &FixedOffset) -> DateTime<Utc> {
    local_instant(date, NaiveTime::MIN, offset)
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.day0() as i64)
}

pub fn days_in_month(date: NaiveDate) -> u32 {
    let first = first_of_month(date);
    first
        .checked_add_months(Months::new(1))
        .map_or(31, |next| (next - first).num_days() as u32)
}

/// Parses a real-valued measurement, rejecting NaN and infinities, which
/// cannot be written to the journal as JSON numbers
pub fn parse_finite(input: &str) -> std::result::Result<f64, String> {
    let value: f64 = input
        .trim()
        .parse()
        .map_err(|e| format!("'{}' is not a number: {}", input, e))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("'{}' is not a finite number", input))
    }
}

/// Resolves the calendar offset: configured minutes east of UTC, or the
/// machine's local offset when nothing is configured or the value is out of range
pub fn resolve_offset(minutes: Option<i32>) -> FixedOffset {
    if let Some(minutes) = minutes {
        match minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
        {
            Some(offset) => return offset,
            None => warn!("Ignoring out-of-range UTC offset: {} minutes", minutes),
        }
    }
    Local::now().offset().fix()
}

/// Current calendar day as seen from `offset`
pub fn today(offset: &FixedOffset) -> NaiveDate {
    Utc::now().with_timezone(offset).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_species() {
        assert_eq!(
            parse_species(Some(" Perch, Pike ,,Roach ".to_string())),
            vec!["Perch", "Pike", "Roach"]
        );
        assert!(parse_species(None).is_empty());
        assert!(parse_species(Some(" , ".to_string())).is_empty());
    }

    #[test]
    fn test_parse_date_and_month() {
        assert_eq!(parse_date("2024-01-05").unwrap(), ymd(2024, 1, 5));
        assert!(parse_date("05/01/2024").is_err());
        assert_eq!(parse_month("2024-02").unwrap(), ymd(2024, 2, 1));
        assert!(parse_month("2024-13").is_err());
        assert!(matches!(
            parse_month("soon"),
            Err(JournalError::InvalidDate { expected: "YYYY-MM", .. })
        ));
    }

    #[test]
    fn test_parse_time() {
        let time = parse_time("07:45").unwrap();
        assert_eq!((time.hour(), time.minute()), (7, 45));
        assert!(parse_time("25:00").is_err());
    }

    #[test]
    fn test_parse_finite() {
        assert_eq!(parse_finite("-14.5"), Ok(-14.5));
        assert_eq!(parse_finite(" 2.25 "), Ok(2.25));
        for bad in ["NaN", "nan", "inf", "-inf", "infinity", "1e400", "heavy"] {
            assert!(parse_finite(bad).is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_day_start_with_offset() {
        let utc = FixedOffset::east_opt(0).unwrap();
        assert_eq!(
            day_start(ymd(2024, 1, 5), &utc),
            Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap()
        );

        let plus_three = FixedOffset::east_opt(3 * 3600).unwrap();
        assert_eq!(
            day_start(ymd(2024, 1, 5), &plus_three),
            Utc.with_ymd_and_hms(2024, 1, 4, 21, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_month_helpers() {
        assert_eq!(first_of_month(ymd(2024, 3, 17)), ymd(2024, 3, 1));
        assert_eq!(days_in_month(ymd(2024, 2, 10)), 29);
        assert_eq!(days_in_month(ymd(2023, 2, 10)), 28);
        assert_eq!(days_in_month(ymd(2024, 12, 31)), 31);
        assert_eq!(days_in_month(ymd(2024, 4, 1)), 30);
    }

    #[test]
    fn test_resolve_offset() {
        assert_eq!(resolve_offset(Some(120)).local_minus_utc(), 7200);
        assert_eq!(resolve_offset(Some(-300)).local_minus_utc(), -18000);
        // Out of range falls back to the local offset rather than failing
        let fallback = resolve_offset(Some(100_000));
        assert_eq!(fallback, resolve_offset(None));
    }
}
