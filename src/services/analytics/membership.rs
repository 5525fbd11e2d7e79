use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;

use super::common::{
    age_band, average, breakdown, months_between, percentage, Breakdown, Comparison, Period,
};
use super::BookingRecord;
use crate::models::booking::TYPE_PAID;

#[derive(Debug, Clone, Serialize)]
pub struct MembershipReport {
    pub period: Period,
    pub comparison_period: Period,
    pub active_members: Comparison<i64>,
    pub new_members: Comparison<i64>,
    pub revenue: Comparison<f64>,
    pub average_monthly_fee: Comparison<f64>,
    pub average_life_cycle_months: Comparison<f64>,
    pub retention_rate: Comparison<f64>,
    pub monthly: Vec<MembershipMonth>,
    pub by_plan: Vec<Breakdown>,
    pub by_venue: Vec<Breakdown>,
    pub by_age: Vec<Breakdown>,
    pub by_gender: Vec<Breakdown>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MembershipMonth {
    pub month: String,
    pub new_members: i64,
    pub cancelled: i64,
}

pub fn is_membership(booking: &BookingRecord) -> bool {
    booking.booking_type == TYPE_PAID
}

pub fn membership_start(booking: &BookingRecord) -> NaiveDate {
    booking.start_date.unwrap_or(booking.created_at)
}

/// Membership had started and not yet been cancelled on `date`
pub fn active_on(booking: &BookingRecord, date: NaiveDate) -> bool {
    is_membership(booking)
        && membership_start(booking) <= date
        && booking.ended_on().map(|end| end > date).unwrap_or(true)
}

struct Snapshot {
    active_members: i64,
    new_members: i64,
    revenue: f64,
    average_monthly_fee: f64,
    average_life_cycle: f64,
    retention_rate: f64,
}

fn snapshot(memberships: &[&BookingRecord], period: &Period) -> Snapshot {
    let active_at_end: Vec<&BookingRecord> = memberships
        .iter()
        .copied()
        .filter(|b| active_on(b, period.end))
        .collect();
    let started: Vec<&BookingRecord> = memberships
        .iter()
        .copied()
        .filter(|b| period.contains(membership_start(b)))
        .collect();

    let fees: Vec<f64> = active_at_end
        .iter()
        .filter_map(|b| b.plan.as_ref().map(|p| p.monthly_fee()))
        .collect();

    let life_cycles: Vec<f64> = memberships
        .iter()
        .filter(|b| membership_start(b) <= period.end)
        .map(|b| {
            let end = b
                .ended_on()
                .map(|e| e.min(period.end))
                .unwrap_or(period.end);
            months_between(membership_start(b), end) as f64
        })
        .collect();

    let active_at_start: Vec<&BookingRecord> = memberships
        .iter()
        .copied()
        .filter(|b| active_on(b, period.start))
        .collect();
    let retained = active_at_start
        .iter()
        .filter(|b| active_on(b, period.end))
        .count() as i64;

    Snapshot {
        active_members: active_at_end.iter().map(|b| b.student_count()).sum(),
        new_members: started.iter().map(|b| b.student_count()).sum(),
        revenue: started
            .iter()
            .filter_map(|b| b.plan.as_ref().map(|p| p.price))
            .sum(),
        average_monthly_fee: average(&fees),
        average_life_cycle: average(&life_cycles),
        retention_rate: percentage(retained, active_at_start.len() as i64),
    }
}

fn monthly(memberships: &[&BookingRecord], period: &Period) -> Vec<MembershipMonth> {
    let mut started: HashMap<(i32, u32), i64> = HashMap::new();
    let mut ended: HashMap<(i32, u32), i64> = HashMap::new();

    for booking in memberships {
        let start = membership_start(booking);
        if period.contains(start) {
            *started.entry((start.year(), start.month())).or_insert(0) += booking.student_count();
        }
        if let Some(end) = booking.ended_on().filter(|e| period.contains(*e)) {
            *ended.entry((end.year(), end.month())).or_insert(0) += booking.student_count();
        }
    }

    period
        .months()
        .into_iter()
        .map(|key| MembershipMonth {
            month: format!("{:04}-{:02}", key.0, key.1),
            new_members: started.get(&key).copied().unwrap_or(0),
            cancelled: ended.get(&key).copied().unwrap_or(0),
        })
        .collect()
}

pub fn build(records: &[BookingRecord], period: Period) -> MembershipReport {
    let comparison_period = period.previous_year();
    let memberships: Vec<&BookingRecord> = records.iter().filter(|b| is_membership(b)).collect();

    let now = snapshot(&memberships, &period);
    let before = snapshot(&memberships, &comparison_period);

    let active: Vec<&BookingRecord> = memberships
        .iter()
        .copied()
        .filter(|b| active_on(b, period.end))
        .collect();

    MembershipReport {
        period,
        comparison_period,
        active_members: Comparison::counts(now.active_members, before.active_members),
        new_members: Comparison::counts(now.new_members, before.new_members),
        revenue: Comparison::values(now.revenue, before.revenue),
        average_monthly_fee: Comparison::values(
            now.average_monthly_fee,
            before.average_monthly_fee,
        ),
        average_life_cycle_months: Comparison::values(
            now.average_life_cycle,
            before.average_life_cycle,
        ),
        retention_rate: Comparison::values(now.retention_rate, before.retention_rate),
        monthly: monthly(&memberships, &period),
        by_plan: breakdown(active.iter().map(|b| {
            b.plan
                .as_ref()
                .map(|p| p.title.clone())
                .unwrap_or_else(|| "No plan".to_string())
        })),
        by_venue: breakdown(active.iter().map(|b| b.venue_name.clone())),
        by_age: breakdown(active.iter().flat_map(|b| {
            b.students
                .iter()
                .map(|s| age_band(s.date_of_birth, b.created_at).to_string())
        })),
        by_gender: breakdown(
            active
                .iter()
                .flat_map(|b| b.students.iter().map(|s| s.gender.clone())),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;

    fn monthly_plan() -> super::super::PlanRecord {
        plan("Monthly", 40.0, "Month", 1)
    }

    fn annual_plan() -> super::super::PlanRecord {
        plan("Annual", 360.0, "Year", 1)
    }

    fn period_2025() -> Period {
        Period::new(d(2025, 1, 1), d(2025, 6, 30)).unwrap()
    }

    #[test]
    fn test_active_on() {
        let m = cancelled(
            membership(d(2025, 2, 1), monthly_plan()),
            d(2025, 4, 10),
            "Price",
        );
        assert!(!active_on(&m, d(2025, 1, 31)));
        assert!(active_on(&m, d(2025, 2, 1)));
        assert!(active_on(&m, d(2025, 4, 9)));
        assert!(!active_on(&m, d(2025, 4, 10)));
    }

    #[test]
    fn test_counts_and_revenue() {
        let records = vec![
            // carried over from last year, still active
            membership(d(2024, 9, 1), monthly_plan()),
            // new this period
            membership(d(2025, 2, 1), annual_plan()),
            cancelled(
                membership(d(2025, 3, 1), monthly_plan()),
                d(2025, 5, 20),
                "Moved away",
            ),
            // a trial is not a membership
            pending_trial(d(2025, 3, 3)),
        ];

        let report = build(&records, period_2025());

        assert_eq!(report.active_members.current, 2);
        assert_eq!(report.active_members.previous, 0);
        assert_eq!(report.new_members.current, 2);
        assert_eq!(report.revenue.current, 400.0);
        // monthly fees of the two active plans: 40 and 30
        assert_eq!(report.average_monthly_fee.current, 35.0);
    }

    #[test]
    fn test_life_cycle_and_retention() {
        let records = vec![
            membership(d(2024, 12, 1), monthly_plan()),
            cancelled(
                membership(d(2024, 11, 1), monthly_plan()),
                d(2025, 3, 1),
                "Injury",
            ),
            membership(d(2025, 4, 1), monthly_plan()),
        ];

        let report = build(&records, period_2025());

        // 6 months (Dec -> Jun 30), 4 months (Nov -> Mar 1), 2 months (Apr -> Jun 30)
        assert_eq!(report.average_life_cycle_months.current, 4.0);
        // two active on Jan 1, one left by Jun 30
        assert_eq!(report.retention_rate.current, 50.0);
    }

    #[test]
    fn test_monthly_new_and_cancelled() {
        let records = vec![
            membership(d(2025, 1, 15), monthly_plan()),
            cancelled(
                membership(d(2025, 1, 20), monthly_plan()),
                d(2025, 3, 2),
                "Cost",
            ),
        ];

        let report = build(&records, period_2025());

        assert_eq!(
            report.monthly[0],
            MembershipMonth {
                month: "2025-01".to_string(),
                new_members: 2,
                cancelled: 0
            }
        );
        assert_eq!(report.monthly[2].cancelled, 1);
        assert_eq!(report.monthly.len(), 6);
    }

    #[test]
    fn test_breakdowns_use_active_members() {
        let mut other_venue = membership(d(2025, 2, 1), annual_plan());
        other_venue.venue_name = "Hillside".to_string();
        other_venue.students = vec![
            student(d(2018, 1, 1), "female"),
            student(d(2013, 1, 1), "female"),
        ];

        let records = vec![
            membership(d(2025, 1, 1), monthly_plan()),
            other_venue,
            cancelled(
                membership(d(2025, 1, 1), monthly_plan()),
                d(2025, 2, 1),
                "Cost",
            ),
        ];

        let report = build(&records, period_2025());

        let plans: Vec<(&str, i64)> = report
            .by_plan
            .iter()
            .map(|r| (r.label.as_str(), r.count))
            .collect();
        assert_eq!(plans, vec![("Annual", 1), ("Monthly", 1)]);
        assert_eq!(report.by_gender[0].label, "female");
        assert_eq!(report.by_gender[0].count, 2);
        assert_eq!(report.by_age.iter().map(|r| r.count).sum::<i64>(), 3);
    }

    #[test]
    fn test_age_band_taken_at_booking_creation() {
        let mut m = membership(d(2025, 1, 10), monthly_plan());
        m.students = vec![student(d(2020, 3, 1), "male")];

        let report = build(&[m], period_2025());

        // 4 when booked, 5 by the end of the period
        assert_eq!(report.by_age.len(), 1);
        assert_eq!(report.by_age[0].label, "Under 5");
    }
}
