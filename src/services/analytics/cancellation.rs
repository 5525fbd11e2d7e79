use serde::Serialize;

use super::common::{
    average, breakdown, monthly_series, months_between, percentage, Breakdown, Comparison,
    MonthlyPoint, Period,
};
use super::membership::{active_on, is_membership, membership_start};
use super::BookingRecord;
use crate::models::booking::{TYPE_FREE, TYPE_PAID, TYPE_WAITING_LIST};

#[derive(Debug, Clone, Serialize)]
pub struct CancellationReport {
    pub period: Period,
    pub comparison_period: Period,
    pub total_cancelled: Comparison<i64>,
    pub cancelled_memberships: Comparison<i64>,
    pub churn_rate: Comparison<f64>,
    pub average_months_before_cancelling: Comparison<f64>,
    pub monthly: Vec<MonthlyPoint>,
    pub by_reason: Vec<Breakdown>,
    pub by_venue: Vec<Breakdown>,
    pub by_booking_type: Vec<Breakdown>,
}

fn type_label(booking_type: &str) -> String {
    match booking_type {
        TYPE_FREE => "Free trial",
        TYPE_PAID => "Membership",
        TYPE_WAITING_LIST => "Waiting list",
        other => other,
    }
    .to_string()
}

fn cancelled_in<'a>(records: &'a [BookingRecord], period: &Period) -> Vec<&'a BookingRecord> {
    records
        .iter()
        .filter(|b| period.contains_opt(b.ended_on()))
        .collect()
}

/// Cancelled memberships over everyone who was a member at some point in the period
fn churn_rate(records: &[BookingRecord], cancelled: &[&BookingRecord], period: &Period) -> f64 {
    let exposed = records
        .iter()
        .filter(|b| {
            active_on(b, period.start)
                || (is_membership(b) && period.contains(membership_start(b)))
        })
        .count() as i64;
    let lost = cancelled.iter().filter(|b| is_membership(b)).count() as i64;
    percentage(lost, exposed)
}

fn tenure_before_cancelling(cancelled: &[&BookingRecord]) -> f64 {
    let months: Vec<f64> = cancelled
        .iter()
        .filter(|b| is_membership(b))
        .filter_map(|b| {
            b.ended_on()
                .map(|end| months_between(membership_start(b), end) as f64)
        })
        .collect();
    average(&months)
}

pub fn build(records: &[BookingRecord], period: Period) -> CancellationReport {
    let comparison_period = period.previous_year();
    let current = cancelled_in(records, &period);
    let previous = cancelled_in(records, &comparison_period);

    let memberships_now = current.iter().filter(|b| is_membership(b)).count() as i64;
    let memberships_before = previous.iter().filter(|b| is_membership(b)).count() as i64;

    CancellationReport {
        period,
        comparison_period,
        total_cancelled: Comparison::counts(current.len() as i64, previous.len() as i64),
        cancelled_memberships: Comparison::counts(memberships_now, memberships_before),
        churn_rate: Comparison::values(
            churn_rate(records, &current, &period),
            churn_rate(records, &previous, &comparison_period),
        ),
        average_months_before_cancelling: Comparison::values(
            tenure_before_cancelling(&current),
            tenure_before_cancelling(&previous),
        ),
        monthly: monthly_series(
            &period,
            current.iter().filter_map(|b| b.ended_on()),
            previous.iter().filter_map(|b| b.ended_on()),
        ),
        by_reason: breakdown(current.iter().map(|b| {
            b.cancel_reason
                .clone()
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| "Not specified".to_string())
        })),
        by_venue: breakdown(current.iter().map(|b| b.venue_name.clone())),
        by_booking_type: breakdown(current.iter().map(|b| type_label(&b.booking_type))),
    }
}
