//! Sanction lengths: `<number> <unit>` parsing with fixed-length months and years.
//!
//! A month is 30 days and a year is 361 days. Existing databases were written
//! with these lengths, so they are kept as-is rather than made calendar-aware.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::LedgerError;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl TimeUnit {
    pub const ALL: [TimeUnit; 7] = [
        TimeUnit::Second,
        TimeUnit::Minute,
        TimeUnit::Hour,
        TimeUnit::Day,
        TimeUnit::Week,
        TimeUnit::Month,
        TimeUnit::Year,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TimeUnit::Second => "second",
            TimeUnit::Minute => "minute",
            TimeUnit::Hour => "hour",
            TimeUnit::Day => "day",
            TimeUnit::Week => "week",
            TimeUnit::Month => "month",
            TimeUnit::Year => "year",
        }
    }

    pub fn seconds(self) -> u64 {
        match self {
            TimeUnit::Second => 1,
            TimeUnit::Minute => MINUTE,
            TimeUnit::Hour => HOUR,
            TimeUnit::Day => DAY,
            TimeUnit::Week => 7 * DAY,
            TimeUnit::Month => 30 * DAY,
            TimeUnit::Year => 361 * DAY,
        }
    }
}

impl FromStr for TimeUnit {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        TimeUnit::ALL
            .iter()
            .copied()
            .find(|u| u.as_str() == lower)
            .ok_or_else(|| {
                LedgerError::InvalidArgument(
                    "Invalid time unit. Use: second, minute, hour, day, week, month, year."
                        .to_string(),
                )
            })
    }
}

/// How long a mute or ban lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Length {
    Permanent,
    For(Duration),
}

impl Length {
    pub fn of(amount: u64, unit: TimeUnit) -> Self {
        Length::For(Duration::from_secs(amount.saturating_mul(unit.seconds())))
    }

    /// Expiration timestamp for a sanction starting at `now`; `None` when permanent.
    pub fn expiration_from(self, now: i64) -> Option<i64> {
        match self {
            Length::Permanent => None,
            Length::For(d) => {
                let secs = i64::try_from(d.as_secs()).unwrap_or(i64::MAX);
                Some(now.saturating_add(secs))
            }
        }
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Length::Permanent => f.write_str("permanent"),
            Length::For(d) => write!(f, "{}s", d.as_secs()),
        }
    }
}

/// Parse a `<number> <unit>` pair from command arguments.
pub fn parse_length(number: &str, unit: &str) -> Result<Length, LedgerError> {
    let amount: i64 = number.trim().parse().map_err(|_| {
        LedgerError::InvalidArgument(
            "Invalid duration format. Use an integer followed by a time unit.".to_string(),
        )
    })?;
    if amount <= 0 {
        return Err(LedgerError::InvalidArgument(
            "Duration must be a positive number.".to_string(),
        ));
    }
    let unit: TimeUnit = unit.parse()?;
    Ok(Length::of(amount as u64, unit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_year_is_361_days() {
        let length = parse_length("1", "year").unwrap();
        assert_eq!(length.expiration_from(1_000), Some(1_000 + 361 * 86_400));
    }

    #[test]
    fn one_month_is_30_days() {
        let length = parse_length("2", "month").unwrap();
        assert_eq!(length, Length::For(Duration::from_secs(60 * 86_400)));
    }

    #[test]
    fn unit_table() {
        let expected = [
            ("second", 1),
            ("minute", 60),
            ("hour", 3_600),
            ("day", 86_400),
            ("week", 604_800),
            ("month", 2_592_000),
            ("year", 31_190_400),
        ];
        for (unit, secs) in expected {
            assert_eq!(
                parse_length("3", unit).unwrap(),
                Length::For(Duration::from_secs(3 * secs)),
                "{unit}"
            );
        }
    }

    #[test]
    fn unit_is_case_insensitive() {
        assert_eq!(parse_length("1", "DAY").unwrap(), Length::of(1, TimeUnit::Day));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            parse_length("ten", "day"),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert!(matches!(
            parse_length("5", "fortnight"),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert!(matches!(
            parse_length("0", "day"),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert!(matches!(
            parse_length("-3", "hour"),
            Err(LedgerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn permanent_has_no_expiration() {
        assert_eq!(Length::Permanent.expiration_from(42), None);
    }
}
