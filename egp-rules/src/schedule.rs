use chrono::{DateTime, Utc};
use egp_protocol::duration::Duration;
use tracing::debug;

/// Most review dates a single schedule may hold.
pub const DEFAULT_REVIEW_LIMIT: usize = 1000;

/// Review dates between the bounds of a trial.
///
/// Starting from `start`, the frequency is added repeatedly through the
/// calendar engine. Every instant strictly before `end` is kept; the first at
/// or past `end` stops the walk. The clock is never consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewSchedule {
    frequency: Option<Duration>,
    limit: usize,
}

impl ReviewSchedule {
    /// An unparsable or zero-length frequency yields an empty schedule.
    pub fn new(frequency: &str) -> Self {
        let frequency = Duration::parse_span(frequency)
            .map_err(|err| debug!(error = %err, "review frequency ignored"))
            .ok();
        Self {
            frequency,
            limit: DEFAULT_REVIEW_LIMIT,
        }
    }

    pub fn from_duration(frequency: Duration) -> Self {
        Self {
            frequency: (!frequency.is_zero()).then_some(frequency),
            limit: DEFAULT_REVIEW_LIMIT,
        }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        let Some(frequency) = self.frequency else {
            return Vec::new();
        };

        let mut dates = Vec::new();
        let mut current = start;
        while dates.len() < self.limit {
            current = match frequency.add_to(current) {
                Ok(next) if next > current && next < end => next,
                _ => break,
            };
            dates.push(current);
        }
        dates
    }
}

/// Review dates for a trial running from `start` to `end`.
pub fn generate_review_schedule(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    frequency: &str,
) -> Vec<DateTime<Utc>> {
    ReviewSchedule::new(frequency).between(start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use test_case::test_case;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn fortnightly_over_six_months() {
        let dates = generate_review_schedule(at(2025, 1, 1), at(2025, 7, 1), "P2W");
        assert_eq!(dates.len(), 12);
        assert_eq!(dates[0], at(2025, 1, 15));
        assert_eq!(dates[11], at(2025, 6, 18));
    }

    #[test]
    fn drops_a_date_landing_on_the_end() {
        let dates = generate_review_schedule(at(2025, 1, 1), at(2025, 1, 29), "P2W");
        assert_eq!(dates, vec![at(2025, 1, 15)]);
    }

    #[test]
    fn months_follow_calendar_clamping() {
        let dates = generate_review_schedule(at(2025, 1, 31), at(2025, 5, 1), "P1M");
        assert_eq!(dates, vec![at(2025, 2, 28), at(2025, 3, 28), at(2025, 4, 28)]);
    }

    #[test_case("" ; "empty")]
    #[test_case("P" ; "zero length")]
    #[test_case("PT" ; "zero time")]
    #[test_case("every week" ; "prose")]
    #[test_case("P-1W" ; "negative")]
    fn bad_frequencies_give_no_dates(frequency: &str) {
        assert!(generate_review_schedule(at(2025, 1, 1), at(2026, 1, 1), frequency).is_empty());
    }

    #[test]
    fn end_before_start_gives_no_dates() {
        assert!(generate_review_schedule(at(2025, 6, 1), at(2025, 1, 1), "P1D").is_empty());
    }

    #[test]
    fn dates_stay_in_bounds_and_increase() {
        let start = at(2024, 2, 29);
        let end = at(2026, 2, 28);
        for frequency in ["P1D", "P3D", "P1W", "P1M", "P1Y", "P1M2DT3H", "PT36H"] {
            let dates = generate_review_schedule(start, end, frequency);
            assert!(!dates.is_empty(), "{frequency}");
            assert!(dates.iter().all(|d| *d >= start && *d < end), "{frequency}");
            assert!(dates.windows(2).all(|w| w[0] < w[1]), "{frequency}");
        }
    }

    #[test]
    fn limit_bounds_fine_grained_frequencies() {
        let dates = ReviewSchedule::new("PT1S").between(at(2025, 1, 1), at(2027, 1, 1));
        assert_eq!(dates.len(), DEFAULT_REVIEW_LIMIT);

        let dates = ReviewSchedule::new("P1D")
            .limit(3)
            .between(at(2025, 1, 1), at(2025, 2, 1));
        assert_eq!(dates, vec![at(2025, 1, 2), at(2025, 1, 3), at(2025, 1, 4)]);
    }
}
