//! Restricted ISO-8601 durations and the calendar arithmetic built on them.
//!
//! Only the designators `Y M W D` and, after `T`, `H M S` are accepted, each
//! with a non-negative integer. Fractions, signs and the alternative
//! `PYYYY-MM-DD` form are not part of the grammar.
//!
//! Month and year steps use chrono's calendar month addition, which clamps to
//! the last valid day of the target month: `2025-01-31 + P1M` is
//! `2025-02-28`, and `2024-02-29 + P1Y` is `2025-02-28`. Schedules and
//! sunsets always go through [`Duration::add_to`]; [`Duration::total_days`]
//! is an approximation reserved for ceiling checks.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, Days, Months, Utc};
use regex::Regex;
use thiserror::Error;

/// Errors produced while parsing or applying a duration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DurationError {
    #[error("duration {input:?} must start with the `P` designator")]
    MissingDesignator { input: String },
    #[error("duration {input:?} contains a negative component")]
    Negative { input: String },
    #[error("duration {input:?} does not match P[nY][nM][nW][nD][T[nH][nM][nS]]")]
    Malformed { input: String },
    #[error("duration {input:?} has a component that is too large")]
    Overflow { input: String },
    #[error("duration {input:?} is zero-length")]
    ZeroLength { input: String },
    #[error("duration {duration} spans ~{total_days} days, above the {max_days}-day ceiling")]
    ExceedsCeiling {
        duration: String,
        total_days: u64,
        max_days: u64,
    },
    #[error("adding {duration} leaves the representable calendar range")]
    OutOfRange { duration: String },
}

/// A calendar duration split into its designated components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Duration {
    pub years: u32,
    pub months: u32,
    pub weeks: u32,
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

fn grammar() -> &'static Regex {
    static GRAMMAR: OnceLock<Regex> = OnceLock::new();
    GRAMMAR.get_or_init(|| {
        Regex::new(
            r"^P(?:(\d+)Y)?(?:(\d+)M)?(?:(\d+)W)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$",
        )
        .expect("duration grammar is a valid regex")
    })
}

impl Duration {
    /// Parses a duration. The bare `P` (and `PT`) parse to the zero duration.
    pub fn parse(input: &str) -> Result<Self, DurationError> {
        if !input.starts_with('P') {
            return Err(DurationError::MissingDesignator {
                input: input.to_string(),
            });
        }
        if input.contains('-') {
            return Err(DurationError::Negative {
                input: input.to_string(),
            });
        }

        let captures = grammar()
            .captures(input)
            .ok_or_else(|| DurationError::Malformed {
                input: input.to_string(),
            })?;

        let component = |index: usize| -> Result<u32, DurationError> {
            match captures.get(index) {
                Some(found) => found
                    .as_str()
                    .parse::<u32>()
                    .map_err(|_| DurationError::Overflow {
                        input: input.to_string(),
                    }),
                None => Ok(0),
            }
        };

        Ok(Self {
            years: component(1)?,
            months: component(2)?,
            weeks: component(3)?,
            days: component(4)?,
            hours: component(5)?,
            minutes: component(6)?,
            seconds: component(7)?,
        })
    }

    /// Parses a duration that must describe a non-empty span.
    pub fn parse_span(input: &str) -> Result<Self, DurationError> {
        let duration = Self::parse(input)?;
        if duration.is_zero() {
            return Err(DurationError::ZeroLength {
                input: input.to_string(),
            });
        }
        Ok(duration)
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    /// `years*365 + months*30 + weeks*7 + days`. Time components are ignored.
    pub fn total_days(&self) -> u64 {
        u64::from(self.years) * 365
            + u64::from(self.months) * 30
            + u64::from(self.weeks) * 7
            + u64::from(self.days)
    }

    /// Adds the duration to `instant`: years, months, weeks+days, then the
    /// time components.
    pub fn add_to(&self, instant: DateTime<Utc>) -> Result<DateTime<Utc>, DurationError> {
        let out_of_range = || DurationError::OutOfRange {
            duration: self.to_string(),
        };

        let year_months = self.years.checked_mul(12).ok_or_else(out_of_range)?;
        let mut current = instant
            .checked_add_months(Months::new(year_months))
            .ok_or_else(out_of_range)?;
        current = current
            .checked_add_months(Months::new(self.months))
            .ok_or_else(out_of_range)?;

        let days = u64::from(self.weeks) * 7 + u64::from(self.days);
        current = current
            .checked_add_days(Days::new(days))
            .ok_or_else(out_of_range)?;

        for seconds in [
            i64::from(self.hours) * 3_600,
            i64::from(self.minutes) * 60,
            i64::from(self.seconds),
        ] {
            current = current
                .checked_add_signed(chrono::Duration::seconds(seconds))
                .ok_or_else(out_of_range)?;
        }

        Ok(current)
    }
}

impl FromStr for Duration {
    type Err = DurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("P")?;
        for (value, unit) in [
            (self.years, 'Y'),
            (self.months, 'M'),
            (self.weeks, 'W'),
            (self.days, 'D'),
        ] {
            if value > 0 {
                write!(f, "{value}{unit}")?;
            }
        }
        if self.hours > 0 || self.minutes > 0 || self.seconds > 0 {
            f.write_str("T")?;
            for (value, unit) in [(self.hours, 'H'), (self.minutes, 'M'), (self.seconds, 'S')] {
                if value > 0 {
                    write!(f, "{value}{unit}")?;
                }
            }
        }
        Ok(())
    }
}

/// Upper bound on sunset spans, measured with [`Duration::total_days`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanCeiling {
    max_days: u64,
}

impl SpanCeiling {
    pub const DEFAULT_MAX_DAYS: u64 = 730;

    pub fn new(max_days: u64) -> Self {
        Self { max_days }
    }

    pub fn max_days(&self) -> u64 {
        self.max_days
    }

    pub fn check(&self, duration: &Duration) -> Result<(), DurationError> {
        let total_days = duration.total_days();
        if total_days > self.max_days {
            return Err(DurationError::ExceedsCeiling {
                duration: duration.to_string(),
                total_days,
                max_days: self.max_days,
            });
        }
        Ok(())
    }

    /// Parses a non-empty span and checks it against the ceiling.
    pub fn parse_bounded(&self, input: &str) -> Result<Duration, DurationError> {
        let duration = Duration::parse_span(input)?;
        self.check(&duration)?;
        Ok(duration)
    }
}

impl Default for SpanCeiling {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_DAYS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use test_case::test_case;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn parses_every_component() {
        let parsed = Duration::parse("P1Y2M3W4DT5H6M7S").unwrap();
        assert_eq!(
            parsed,
            Duration {
                years: 1,
                months: 2,
                weeks: 3,
                days: 4,
                hours: 5,
                minutes: 6,
                seconds: 7,
            }
        );
        assert_eq!(parsed.total_days(), 365 + 60 + 21 + 4);
    }

    #[test]
    fn minutes_are_told_apart_from_months() {
        let parsed = Duration::parse("PT30M").unwrap();
        assert_eq!(parsed.minutes, 30);
        assert_eq!(parsed.months, 0);
    }

    #[test]
    fn bare_designator_is_zero_but_not_a_span() {
        assert!(Duration::parse("P").unwrap().is_zero());
        assert!(Duration::parse("PT").unwrap().is_zero());
        assert!(matches!(
            Duration::parse_span("P"),
            Err(DurationError::ZeroLength { .. })
        ));
        assert!(matches!(
            Duration::parse_span("P0D"),
            Err(DurationError::ZeroLength { .. })
        ));
    }

    #[test_case("6M" ; "missing designator")]
    #[test_case("" ; "empty input")]
    fn rejects_missing_designator(input: &str) {
        assert!(matches!(
            Duration::parse(input),
            Err(DurationError::MissingDesignator { .. })
        ));
    }

    #[test_case("P-1D" ; "negative days")]
    #[test_case("PT-5M" ; "negative minutes")]
    fn rejects_negative_components(input: &str) {
        assert!(matches!(
            Duration::parse(input),
            Err(DurationError::Negative { .. })
        ));
    }

    #[test_case("P1.5Y" ; "fraction")]
    #[test_case("P1D2M" ; "out of order")]
    #[test_case("P1X" ; "unknown designator")]
    #[test_case("P 1D" ; "whitespace")]
    #[test_case("P1H" ; "hours without time marker")]
    fn rejects_out_of_grammar(input: &str) {
        assert!(matches!(
            Duration::parse(input),
            Err(DurationError::Malformed { .. })
        ));
    }

    #[test]
    fn rejects_components_that_overflow() {
        assert!(matches!(
            Duration::parse("P99999999999D"),
            Err(DurationError::Overflow { .. })
        ));
    }

    #[test]
    fn canonical_form_round_trips() {
        for input in ["P", "P6M", "P2W", "PT2H", "P1Y2M3W4DT5H6M7S", "P1DT1S", "P10Y"] {
            let parsed = Duration::parse(input).unwrap();
            assert_eq!(parsed.to_string(), input);
            assert_eq!(Duration::parse(&parsed.to_string()).unwrap(), parsed);
        }
        assert_eq!(Duration::parse("P0Y3D").unwrap().to_string(), "P3D");
        assert_eq!(Duration::parse("PT").unwrap().to_string(), "P");
    }

    #[test]
    fn month_end_clamps_to_last_day() {
        let month = Duration::parse("P1M").unwrap();
        assert_eq!(month.add_to(at(2025, 1, 31)).unwrap(), at(2025, 2, 28));
        assert_eq!(month.add_to(at(2024, 1, 31)).unwrap(), at(2024, 2, 29));
    }

    #[test]
    fn leap_day_plus_a_year_clamps() {
        let year = Duration::parse("P1Y").unwrap();
        assert_eq!(year.add_to(at(2024, 2, 29)).unwrap(), at(2025, 2, 28));
    }

    #[test]
    fn applies_years_before_months_before_days() {
        let duration = Duration::parse("P1Y1M1D").unwrap();
        // 2024-01-31 -> 2025-01-31 -> 2025-02-28 -> 2025-03-01
        assert_eq!(duration.add_to(at(2024, 1, 31)).unwrap(), at(2025, 3, 1));
    }

    #[test]
    fn weeks_and_time_components_add_exactly() {
        let duration = Duration::parse("P2WT1H30M15S").unwrap();
        let start = at(2025, 3, 1);
        let expected = Utc.with_ymd_and_hms(2025, 3, 15, 13, 30, 15).unwrap();
        assert_eq!(duration.add_to(start).unwrap(), expected);
    }

    #[test]
    fn reports_calendar_overflow() {
        let duration = Duration::parse("P4000000000Y").unwrap();
        assert!(matches!(
            duration.add_to(at(2025, 1, 1)),
            Err(DurationError::OutOfRange { .. })
        ));
    }

    #[test_case("P2Y", true ; "two years is the ceiling")]
    #[test_case("P24M", true ; "twenty four months approximates to 720 days")]
    #[test_case("P104W", true ; "104 weeks is 728 days")]
    #[test_case("P2Y1D", false ; "one day over")]
    #[test_case("P20Y", false ; "twenty years")]
    fn ceiling_uses_approximate_days(input: &str, allowed: bool) {
        let ceiling = SpanCeiling::default();
        assert_eq!(ceiling.parse_bounded(input).is_ok(), allowed);
    }

    #[test]
    fn ceiling_ignores_time_components() {
        let ceiling = SpanCeiling::new(1);
        assert!(ceiling.parse_bounded("P1DT23H").is_ok());
    }
}
