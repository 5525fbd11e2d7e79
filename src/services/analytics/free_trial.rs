use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use super::common::{
    age_band, breakdown, monthly_series, percentage, Breakdown, Comparison, MonthlyPoint, Period,
};
use super::BookingRecord;
use crate::models::booking::{STATUS_ATTENDED, TYPE_FREE};

const TOP_AGENTS: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct FreeTrialReport {
    pub period: Period,
    pub comparison_period: Period,
    pub total_trials: Comparison<i64>,
    pub total_students: Comparison<i64>,
    pub attended: Comparison<i64>,
    pub attendance_rate: Comparison<f64>,
    pub converted: Comparison<i64>,
    pub conversion_rate: Comparison<f64>,
    pub monthly: Vec<MonthlyPoint>,
    pub by_venue: Vec<Breakdown>,
    pub by_source: Vec<Breakdown>,
    pub by_age: Vec<Breakdown>,
    pub by_gender: Vec<Breakdown>,
    pub top_agents: Vec<AgentPerformance>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentPerformance {
    pub agent_id: Uuid,
    pub name: String,
    pub trials: i64,
    pub converted: i64,
    pub conversion_rate: f64,
}

/// Bookings that started life as a free trial, including ones since converted
pub fn is_trial(booking: &BookingRecord) -> bool {
    booking.booking_type == TYPE_FREE || booking.converted_from.as_deref() == Some(TYPE_FREE)
}

fn trial_day(booking: &BookingRecord) -> NaiveDate {
    booking.trial_date.unwrap_or(booking.created_at)
}

fn converted(booking: &BookingRecord) -> bool {
    booking.converted_from.as_deref() == Some(TYPE_FREE)
}

// A converted trial lost its "attended" status on conversion
fn attended(booking: &BookingRecord) -> bool {
    booking.status == STATUS_ATTENDED || converted(booking)
}

struct Totals {
    trials: i64,
    students: i64,
    attended: i64,
    converted: i64,
}

impl Totals {
    fn of(trials: &[&BookingRecord]) -> Self {
        Self {
            trials: trials.len() as i64,
            students: trials.iter().map(|b| b.student_count()).sum(),
            attended: trials.iter().filter(|b| attended(b)).count() as i64,
            converted: trials.iter().filter(|b| converted(b)).count() as i64,
        }
    }
}

fn trials_in<'a>(records: &'a [BookingRecord], period: &Period) -> Vec<&'a BookingRecord> {
    records
        .iter()
        .filter(|b| is_trial(b) && period.contains(trial_day(b)))
        .collect()
}

fn top_agents(trials: &[&BookingRecord]) -> Vec<AgentPerformance> {
    let mut agents: HashMap<Uuid, AgentPerformance> = HashMap::new();
    for booking in trials {
        let entry = agents
            .entry(booking.agent_id)
            .or_insert_with(|| AgentPerformance {
                agent_id: booking.agent_id,
                name: booking.agent_name.clone(),
                trials: 0,
                converted: 0,
                conversion_rate: 0.0,
            });
        entry.trials += 1;
        if converted(booking) {
            entry.converted += 1;
        }
    }

    let mut ranked: Vec<AgentPerformance> = agents
        .into_values()
        .map(|mut agent| {
            agent.conversion_rate = percentage(agent.converted, agent.trials);
            agent
        })
        .collect();
    ranked.sort_by(|a, b| b.trials.cmp(&a.trials).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(TOP_AGENTS);
    ranked
}

pub fn build(records: &[BookingRecord], period: Period) -> FreeTrialReport {
    let comparison_period = period.previous_year();
    let current = trials_in(records, &period);
    let previous = trials_in(records, &comparison_period);

    let now = Totals::of(&current);
    let before = Totals::of(&previous);

    FreeTrialReport {
        period,
        comparison_period,
        total_trials: Comparison::counts(now.trials, before.trials),
        total_students: Comparison::counts(now.students, before.students),
        attended: Comparison::counts(now.attended, before.attended),
        attendance_rate: Comparison::values(
            percentage(now.attended, now.trials),
            percentage(before.attended, before.trials),
        ),
        converted: Comparison::counts(now.converted, before.converted),
        conversion_rate: Comparison::values(
            percentage(now.converted, now.trials),
            percentage(before.converted, before.trials),
        ),
        monthly: monthly_series(
            &period,
            current.iter().map(|b| trial_day(b)),
            previous.iter().map(|b| trial_day(b)),
        ),
        by_venue: breakdown(current.iter().map(|b| b.venue_name.clone())),
        by_source: breakdown(
            current
                .iter()
                .map(|b| b.source.clone().unwrap_or_else(|| "Unknown".to_string())),
        ),
        by_age: breakdown(current.iter().flat_map(|b| {
            b.students
                .iter()
                .map(move |s| age_band(s.date_of_birth, b.created_at).to_string())
        })),
        by_gender: breakdown(
            current
                .iter()
                .flat_map(|b| b.students.iter().map(|s| s.gender.clone())),
        ),
        top_agents: top_agents(&current),
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use crate::models::booking::{STATUS_ACTIVE, STATUS_NOT_ATTENDED, TYPE_PAID};

    fn converted_trial(trial_date: NaiveDate) -> BookingRecord {
        let mut b = trial(trial_date, STATUS_ACTIVE);
        b.booking_type = TYPE_PAID.to_string();
        b.converted_from = Some(TYPE_FREE.to_string());
        b.converted_at = Some(trial_date);
        b
    }

    fn period_2025() -> Period {
        Period::new(d(2025, 1, 1), d(2025, 6, 30)).unwrap()
    }

    #[test]
    fn test_totals_and_rates() {
        let records = vec![
            trial(d(2025, 1, 10), STATUS_ATTENDED),
            trial(d(2025, 2, 3), STATUS_NOT_ATTENDED),
            pending_trial(d(2025, 3, 1)),
            converted_trial(d(2025, 3, 15)),
            // previous year
            trial(d(2024, 2, 1), STATUS_ATTENDED),
            pending_trial(d(2024, 5, 1)),
            // outside both periods
            trial(d(2025, 8, 1), STATUS_ATTENDED),
        ];

        let report = build(&records, period_2025());

        assert_eq!(report.total_trials, Comparison::counts(4, 2));
        assert_eq!(report.total_trials.change_percentage, 100.0);
        assert_eq!(report.attended.current, 2);
        assert_eq!(report.attendance_rate.current, 50.0);
        assert_eq!(report.attendance_rate.previous, 50.0);
        assert_eq!(report.converted.current, 1);
        assert_eq!(report.conversion_rate.current, 25.0);
        assert_eq!(report.conversion_rate.previous, 0.0);
    }

    #[test]
    fn test_memberships_not_from_trials_ignored() {
        let records = vec![membership(d(2025, 2, 1), plan("Monthly", 40.0, "Month", 1))];
        let report = build(&records, period_2025());
        assert_eq!(report.total_trials.current, 0);
        assert!(report.by_venue.is_empty());
    }

    #[test]
    fn test_monthly_series_covers_period() {
        let records = vec![pending_trial(d(2025, 2, 10)), pending_trial(d(2024, 2, 11))];
        let report = build(&records, period_2025());
        assert_eq!(report.monthly.len(), 6);
        assert_eq!(report.monthly[1].month, "2025-02");
        assert_eq!(report.monthly[1].current, 1);
        assert_eq!(report.monthly[1].previous, 1);
    }

    #[test]
    fn test_breakdowns() {
        let mut a = pending_trial(d(2025, 1, 5));
        a.source = Some("Facebook".to_string());
        a.students = vec![
            student(d(2019, 1, 1), "female"),
            student(d(2016, 1, 1), "male"),
        ];
        let mut b = pending_trial(d(2025, 1, 6));
        b.venue_name = "Hillside".to_string();
        b.students = vec![student(d(2019, 6, 1), "female")];

        let report = build(&[a, b], period_2025());

        assert_eq!(report.total_students.current, 3);
        assert_eq!(report.by_venue.len(), 2);
        assert_eq!(report.by_venue[0].percentage, 50.0);

        let sources: Vec<&str> = report.by_source.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(sources, vec!["Facebook", "Unknown"]);

        assert_eq!(report.by_age[0].label, "5-7");
        assert_eq!(report.by_age[0].count, 2);
        assert_eq!(report.by_age[1].label, "8-10");

        assert_eq!(report.by_gender[0].label, "female");
        assert_eq!(report.by_gender[0].percentage, 66.67);
    }

    #[test]
    fn test_top_agents_ranked() {
        let agent_a = Uuid::new_v4();
        let agent_b = Uuid::new_v4();

        let mut records = Vec::new();
        for day in 1..=3 {
            let mut b = pending_trial(d(2025, 1, day));
            b.agent_id = agent_a;
            b.agent_name = "Alex".to_string();
            records.push(b);
        }
        let mut conv = converted_trial(d(2025, 1, 9));
        conv.agent_id = agent_b;
        conv.agent_name = "Bea".to_string();
        records.push(conv);

        let report = build(&records, period_2025());

        assert_eq!(report.top_agents.len(), 2);
        assert_eq!(report.top_agents[0].name, "Alex");
        assert_eq!(report.top_agents[0].trials, 3);
        assert_eq!(report.top_agents[0].conversion_rate, 0.0);
        assert_eq!(report.top_agents[1].name, "Bea");
        assert_eq!(report.top_agents[1].conversion_rate, 100.0);
    }
}
