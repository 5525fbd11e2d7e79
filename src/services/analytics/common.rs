use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;

use crate::error::{AppError, Result};

/// Inclusive date range a report covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(AppError::Validation(
                "from_date must not be after to_date".to_string(),
            ));
        }
        Ok(Self { start, end })
    }

    /// Requested range, defaulting to the current year up to today
    pub fn from_query(
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Self> {
        let start = from.unwrap_or_else(|| {
            NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today)
        });
        let end = to.unwrap_or(today);
        Self::new(start, end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn contains_opt(&self, date: Option<NaiveDate>) -> bool {
        date.map(|d| self.contains(d)).unwrap_or(false)
    }

    /// Same range one year earlier
    pub fn previous_year(&self) -> Self {
        Self {
            start: shift_back_year(self.start),
            end: shift_back_year(self.end),
        }
    }

    /// Every calendar month touched by the range, as (year, month)
    pub fn months(&self) -> Vec<(i32, u32)> {
        let mut months = Vec::new();
        let (mut year, mut month) = (self.start.year(), self.start.month());
        let last = (self.end.year(), self.end.month());

        while (year, month) <= last {
            months.push((year, month));
            if month == 12 {
                year += 1;
                month = 1;
            } else {
                month += 1;
            }
        }

        months
    }
}

fn shift_back_year(date: NaiveDate) -> NaiveDate {
    date.checked_sub_months(Months::new(12)).unwrap_or(date)
}

/// A metric for the report period next to the same metric a year earlier
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Comparison<T> {
    pub current: T,
    pub previous: T,
    pub change_percentage: f64,
}

impl Comparison<i64> {
    pub fn counts(current: i64, previous: i64) -> Self {
        Self {
            current,
            previous,
            change_percentage: change_percentage(current as f64, previous as f64),
        }
    }
}

impl Comparison<f64> {
    pub fn values(current: f64, previous: f64) -> Self {
        let current = round2(current);
        let previous = round2(previous);
        Self {
            current,
            previous,
            change_percentage: change_percentage(current, previous),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdown {
    pub label: String,
    pub count: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPoint {
    pub month: String, // "YYYY-MM"
    pub current: i64,
    pub previous: i64,
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Share of `total`, 0 when there is nothing to divide by
pub fn percentage(count: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    round2(count as f64 * 100.0 / total as f64)
}

/// Relative change from `previous`; growth from zero counts as 100%
pub fn change_percentage(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return if current > 0.0 { 100.0 } else { 0.0 };
    }
    round2((current - previous) * 100.0 / previous)
}

pub fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    round2(values.iter().sum::<f64>() / values.len() as f64)
}

/// Counts labels and normalizes them to percentages of the whole.
/// Sorted by count, then label.
pub fn breakdown<I>(labels: I) -> Vec<Breakdown>
where
    I: IntoIterator<Item = String>,
{
    let mut counts: HashMap<String, i64> = HashMap::new();
    let mut total = 0;
    for label in labels {
        *counts.entry(label).or_insert(0) += 1;
        total += 1;
    }

    let mut rows: Vec<Breakdown> = counts
        .into_iter()
        .map(|(label, count)| Breakdown {
            percentage: percentage(count, total),
            label,
            count,
        })
        .collect();

    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    rows
}

/// Monthly counts for the period, with the matching month a year earlier
pub fn monthly_series<C, P>(period: &Period, current: C, previous: P) -> Vec<MonthlyPoint>
where
    C: IntoIterator<Item = NaiveDate>,
    P: IntoIterator<Item = NaiveDate>,
{
    let mut current_counts: HashMap<(i32, u32), i64> = HashMap::new();
    for date in current {
        *current_counts.entry((date.year(), date.month())).or_insert(0) += 1;
    }

    // Previous-year dates are keyed by the month they compare against
    let mut previous_counts: HashMap<(i32, u32), i64> = HashMap::new();
    for date in previous {
        *previous_counts
            .entry((date.year() + 1, date.month()))
            .or_insert(0) += 1;
    }

    period
        .months()
        .into_iter()
        .map(|key| MonthlyPoint {
            month: format!("{:04}-{:02}", key.0, key.1),
            current: current_counts.get(&key).copied().unwrap_or(0),
            previous: previous_counts.get(&key).copied().unwrap_or(0),
        })
        .collect()
}

/// Age in whole years on a given date
pub fn age_on(date_of_birth: NaiveDate, on: NaiveDate) -> i32 {
    let mut age = on.year() - date_of_birth.year();
    if (on.month(), on.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age.max(0)
}

pub fn age_band(date_of_birth: NaiveDate, on: NaiveDate) -> &'static str {
    match age_on(date_of_birth, on) {
        0..=4 => "Under 5",
        5..=7 => "5-7",
        8..=10 => "8-10",
        11..=13 => "11-13",
        _ => "14+",
    }
}

/// Whole calendar months from `start` to `end`, never negative
pub fn months_between(start: NaiveDate, end: NaiveDate) -> i32 {
    let mut months =
        (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
    if end.day() < start.day() {
        months -= 1;
    }
    months.max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_default_period_is_year_to_date() {
        let period = Period::from_query(None, None, d(2025, 6, 15)).unwrap();
        assert_eq!(period.start, d(2025, 1, 1));
        assert_eq!(period.end, d(2025, 6, 15));
    }

    #[test]
    fn test_inverted_period_rejected() {
        let inverted = Period::from_query(Some(d(2025, 5, 1)), Some(d(2025, 4, 1)), d(2025, 6, 1));
        assert!(inverted.is_err());
    }

    #[test]
    fn test_previous_year_handles_leap_day() {
        let period = Period::new(d(2024, 2, 1), d(2024, 2, 29)).unwrap();
        let previous = period.previous_year();
        assert_eq!(previous.start, d(2023, 2, 1));
        assert_eq!(previous.end, d(2023, 2, 28));
    }

    #[test]
    fn test_months_span_year_boundary() {
        let period = Period::new(d(2024, 11, 20), d(2025, 2, 3)).unwrap();
        assert_eq!(
            period.months(),
            vec![(2024, 11), (2024, 12), (2025, 1), (2025, 2)]
        );
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(2, 3), 66.67);
        assert_eq!(percentage(5, 0), 0.0);
    }

    #[test]
    fn test_change_percentage() {
        assert_eq!(change_percentage(15.0, 10.0), 50.0);
        assert_eq!(change_percentage(5.0, 10.0), -50.0);
        assert_eq!(change_percentage(3.0, 0.0), 100.0);
        assert_eq!(change_percentage(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_breakdown_sorted_and_normalized() {
        let rows = breakdown(
            ["Leeds", "York", "Leeds", "Hull"]
                .into_iter()
                .map(String::from),
        );
        assert_eq!(rows[0].label, "Leeds");
        assert_eq!(rows[0].count, 2);
        assert_eq!(rows[0].percentage, 50.0);
        // ties fall back to label order
        assert_eq!(rows[1].label, "Hull");
        assert_eq!(rows[2].label, "York");
        let total: f64 = rows.iter().map(|r| r.percentage).sum();
        assert_eq!(total, 100.0);
    }

    #[test]
    fn test_monthly_series_aligns_previous_year() {
        let period = Period::new(d(2025, 1, 1), d(2025, 3, 31)).unwrap();
        let series = monthly_series(
            &period,
            vec![d(2025, 1, 5), d(2025, 1, 20), d(2025, 3, 1)],
            vec![d(2024, 1, 9), d(2024, 2, 14)],
        );
        assert_eq!(
            series,
            vec![
                MonthlyPoint { month: "2025-01".into(), current: 2, previous: 1 },
                MonthlyPoint { month: "2025-02".into(), current: 0, previous: 1 },
                MonthlyPoint { month: "2025-03".into(), current: 1, previous: 0 },
            ]
        );
    }

    #[test]
    fn test_age_bands() {
        let on = d(2025, 6, 1);
        assert_eq!(age_on(d(2018, 6, 2), on), 6);
        assert_eq!(age_on(d(2018, 6, 1), on), 7);
        assert_eq!(age_band(d(2021, 1, 1), on), "Under 5");
        assert_eq!(age_band(d(2018, 6, 1), on), "5-7");
        assert_eq!(age_band(d(2015, 1, 1), on), "8-10");
        assert_eq!(age_band(d(2012, 1, 1), on), "11-13");
        assert_eq!(age_band(d(2009, 1, 1), on), "14+");
    }

    #[test]
    fn test_months_between() {
        assert_eq!(months_between(d(2025, 1, 15), d(2025, 4, 14)), 2);
        assert_eq!(months_between(d(2025, 1, 15), d(2025, 4, 15)), 3);
        assert_eq!(months_between(d(2024, 11, 1), d(2025, 2, 1)), 3);
        assert_eq!(months_between(d(2025, 5, 1), d(2025, 1, 1)), 0);
    }

    #[test]
    fn test_comparison_values_are_rounded() {
        let c = Comparison::values(33.3333, 25.0);
        assert_eq!(c.current, 33.33);
        assert_eq!(c.change_percentage, 33.32);
    }
}
