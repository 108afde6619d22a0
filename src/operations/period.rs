use crate::models::bucket::Period;
use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// The active period for a bucket at a given instant.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodWindow {
    /// First day of the period at midnight.
    pub start: NaiveDateTime,
    /// Last day of the period at midnight.
    pub end: NaiveDateTime,
    pub total_days: i64,
    pub days_elapsed: i64,
    pub percentage_of_time_elapsed: f64,
}

impl PeriodWindow {
    /// Window of the period containing `now` (local wall-clock time).
    pub fn current(period: Period, now: NaiveDateTime) -> Self {
        let today = now.date();
        let (start_date, end_date) = match period {
            Period::Monthly => {
                let first = today.with_day(1).unwrap_or(today);
                let last = first
                    .checked_add_months(Months::new(1))
                    .and_then(|next| next.pred_opt())
                    .unwrap_or(today);
                (first, last)
            }
            Period::Yearly => (
                NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
                NaiveDate::from_ymd_opt(today.year(), 12, 31).unwrap_or(today),
            ),
        };

        let start = start_date.and_time(NaiveTime::MIN);
        let end = end_date.and_time(NaiveTime::MIN);
        let total_days = ceil_days(end - start);
        let days_elapsed = ceil_days(now - start);
        let percentage_of_time_elapsed = days_elapsed as f64 / total_days as f64 * 100.0;

        Self {
            start,
            end,
            total_days,
            days_elapsed,
            percentage_of_time_elapsed,
        }
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start.date()
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end.date()
    }

    /// Inclusive on both ends.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date() && date <= self.end_date()
    }
}

fn ceil_days(span: chrono::Duration) -> i64 {
    (span.num_milliseconds() as f64 / MILLIS_PER_DAY).ceil() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_monthly_window_bounds() {
        let window = PeriodWindow::current(Period::Monthly, at(2024, 1, 15, 12, 0));
        assert_eq!(window.start_date(), ymd(2024, 1, 1));
        assert_eq!(window.end_date(), ymd(2024, 1, 31));
        assert_eq!(window.total_days, 30);
        assert_eq!(window.days_elapsed, 15);
        assert_eq!(window.percentage_of_time_elapsed, 50.0);
    }

    #[test]
    fn test_monthly_window_leap_february() {
        let window = PeriodWindow::current(Period::Monthly, at(2024, 2, 10, 8, 0));
        assert_eq!(window.end_date(), ymd(2024, 2, 29));
        assert_eq!(window.total_days, 28);
    }

    #[test]
    fn test_monthly_window_december_rolls_year() {
        let window = PeriodWindow::current(Period::Monthly, at(2023, 12, 31, 23, 59));
        assert_eq!(window.start_date(), ymd(2023, 12, 1));
        assert_eq!(window.end_date(), ymd(2023, 12, 31));
    }

    #[test]
    fn test_yearly_window() {
        let window = PeriodWindow::current(Period::Yearly, at(2023, 7, 2, 0, 30));
        assert_eq!(window.start_date(), ymd(2023, 1, 1));
        assert_eq!(window.end_date(), ymd(2023, 12, 31));
        assert_eq!(window.total_days, 364);
        assert_eq!(window.days_elapsed, 183);
    }

    #[test]
    fn test_exact_midnight_on_first_day_has_zero_elapsed() {
        let window = PeriodWindow::current(Period::Monthly, at(2024, 3, 1, 0, 0));
        assert_eq!(window.days_elapsed, 0);
        assert_eq!(window.percentage_of_time_elapsed, 0.0);

        let later = PeriodWindow::current(Period::Monthly, at(2024, 3, 1, 0, 1));
        assert_eq!(later.days_elapsed, 1);
    }

    #[test]
    fn test_contains_is_inclusive() {
        let window = PeriodWindow::current(Period::Monthly, at(2024, 1, 15, 12, 0));
        assert!(window.contains(ymd(2024, 1, 1)));
        assert!(window.contains(ymd(2024, 1, 31)));
        assert!(!window.contains(ymd(2023, 12, 31)));
        assert!(!window.contains(ymd(2024, 2, 1)));
    }
}
