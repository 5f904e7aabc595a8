//! Active reporting period selection.
//!
//! Lateness is judged against a period's **start** date: the active period
//! is the one with the latest start that is not after today. A period that
//! started today counts as active. When every period starts in the future
//! the earliest one is used.

use chrono::NaiveDate;

use crate::errors::{ComplianceError, Result};
use crate::types::ReportingPeriod;

/// Date format used by the feed.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` feed date.
pub fn parse_period_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| {
        ComplianceError::InvalidDate {
            value: raw.to_string(),
        }
    })
}

/// Pick the active period's start date.
///
/// Every start date is parsed before choosing; a single unparsable date
/// fails the whole determination rather than being skipped, since skipping
/// could silently select the wrong period.
pub fn select_current_period(periods: &[ReportingPeriod], today: NaiveDate) -> Result<NaiveDate> {
    let starts = periods
        .iter()
        .map(|p| parse_period_date(&p.start_date))
        .collect::<Result<Vec<_>>>()?;

    let latest_started = starts.iter().copied().filter(|s| *s <= today).max();
    latest_started
        .or_else(|| starts.iter().copied().min())
        .ok_or(ComplianceError::NoReportingPeriod)
}

#[cfg(test)]
mod tests {
    use chrono::Days;

    use super::*;

    fn date(s: &str) -> NaiveDate {
        parse_period_date(s).unwrap()
    }

    fn today() -> NaiveDate {
        date("2024-03-20")
    }

    fn fmt(d: NaiveDate) -> String {
        d.format(DATE_FORMAT).to_string()
    }

    #[test]
    fn picks_most_recent_past_period() {
        let periods = [
            ReportingPeriod::new("2014-01-07", "2014-01-12"),
            ReportingPeriod::new("2014-01-01", "2014-01-05"),
        ];
        assert_eq!(select_current_period(&periods, today()).unwrap(), date("2014-01-07"));
    }

    #[test]
    fn skips_future_period() {
        let future = today().checked_add_days(Days::new(2)).unwrap();
        let periods = [
            ReportingPeriod::new(fmt(future), fmt(future.checked_add_days(Days::new(5)).unwrap())),
            ReportingPeriod::new("2014-01-07", "2014-01-12"),
            ReportingPeriod::new("2014-01-01", "2014-01-05"),
        ];
        assert_eq!(select_current_period(&periods, today()).unwrap(), date("2014-01-07"));
    }

    #[test]
    fn recent_past_period_wins() {
        let recent = today().checked_sub_days(Days::new(2)).unwrap();
        let periods = [
            ReportingPeriod::new("2014-01-07", "2014-01-12"),
            ReportingPeriod::new(fmt(recent), "2099-01-01"),
            ReportingPeriod::new("2014-01-01", "2014-01-05"),
        ];
        assert_eq!(select_current_period(&periods, today()).unwrap(), recent);
    }

    #[test]
    fn period_starting_today_is_current() {
        let periods = [
            ReportingPeriod::new(fmt(today()), ""),
            ReportingPeriod::new("2024-03-13", "2024-03-19"),
        ];
        assert_eq!(select_current_period(&periods, today()).unwrap(), today());
    }

    #[test]
    fn all_future_falls_back_to_earliest() {
        let periods = [
            ReportingPeriod::new("2030-02-01", ""),
            ReportingPeriod::new("2030-01-01", ""),
            ReportingPeriod::new("2030-03-01", ""),
        ];
        assert_eq!(select_current_period(&periods, today()).unwrap(), date("2030-01-01"));
    }

    #[test]
    fn unparsable_date_is_surfaced() {
        let periods = [
            ReportingPeriod::new("2014-01-07", ""),
            ReportingPeriod::new("01/14/2014", ""),
        ];
        let err = select_current_period(&periods, today()).unwrap_err();
        assert!(matches!(err, ComplianceError::InvalidDate { value } if value == "01/14/2014"));
    }

    #[test]
    fn empty_list_is_an_error() {
        assert!(matches!(
            select_current_period(&[], today()),
            Err(ComplianceError::NoReportingPeriod)
        ));
    }

    #[test]
    fn never_returns_future_when_past_exists() {
        // sweep "today" across a span of period boundaries
        let periods: Vec<_> = (0..10)
            .map(|w| {
                let start = date("2024-01-01").checked_add_days(Days::new(w * 7)).unwrap();
                ReportingPeriod::new(fmt(start), "")
            })
            .collect();
        for offset in 0..80 {
            let day = date("2024-01-01").checked_add_days(Days::new(offset)).unwrap();
            let chosen = select_current_period(&periods, day).unwrap();
            assert!(chosen <= day, "chose {chosen} on {day}");
        }
    }
}
