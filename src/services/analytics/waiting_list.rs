use serde::Serialize;

use super::common::{
    breakdown, monthly_series, percentage, Breakdown, Comparison, MonthlyPoint, Period,
};
use super::BookingRecord;
use crate::models::booking::{STATUS_WAITING_LIST, TYPE_WAITING_LIST};

const TOP_CLASSES: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct WaitingListReport {
    pub period: Period,
    pub comparison_period: Period,
    pub currently_waiting: i64,
    pub students_waiting: i64,
    pub added: Comparison<i64>,
    pub converted: Comparison<i64>,
    pub conversion_rate: Comparison<f64>,
    pub monthly: Vec<MonthlyPoint>,
    pub by_venue: Vec<Breakdown>,
    pub by_class: Vec<Breakdown>,
}

/// Bookings that joined through the waiting list, converted or not
fn from_waiting_list(booking: &BookingRecord) -> bool {
    booking.booking_type == TYPE_WAITING_LIST
        || booking.converted_from.as_deref() == Some(TYPE_WAITING_LIST)
}

fn still_waiting(booking: &BookingRecord) -> bool {
    booking.booking_type == TYPE_WAITING_LIST && booking.status == STATUS_WAITING_LIST
}

fn converted(booking: &BookingRecord) -> bool {
    booking.converted_from.as_deref() == Some(TYPE_WAITING_LIST)
}

struct Totals {
    added: i64,
    converted: i64,
    conversion_rate: f64,
}

fn totals(records: &[BookingRecord], period: &Period) -> Totals {
    let added: Vec<&BookingRecord> = records
        .iter()
        .filter(|b| from_waiting_list(b) && period.contains(b.created_at))
        .collect();
    let converted_in_period = records
        .iter()
        .filter(|b| converted(b) && period.contains_opt(b.converted_at))
        .count() as i64;
    // Share of this period's sign-ups that have converted so far
    let added_and_converted = added.iter().filter(|b| converted(b)).count() as i64;

    Totals {
        added: added.len() as i64,
        converted: converted_in_period,
        conversion_rate: percentage(added_and_converted, added.len() as i64),
    }
}

pub fn build(records: &[BookingRecord], period: Period) -> WaitingListReport {
    let comparison_period = period.previous_year();
    let now = totals(records, &period);
    let before = totals(records, &comparison_period);

    let waiting: Vec<&BookingRecord> = records.iter().filter(|b| still_waiting(b)).collect();

    let mut by_class = breakdown(
        waiting
            .iter()
            .map(|b| format!("{} ({})", b.class_name, b.venue_name)),
    );
    by_class.truncate(TOP_CLASSES);

    WaitingListReport {
        period,
        comparison_period,
        currently_waiting: waiting.len() as i64,
        students_waiting: waiting.iter().map(|b| b.student_count()).sum(),
        added: Comparison::counts(now.added, before.added),
        converted: Comparison::counts(now.converted, before.converted),
        conversion_rate: Comparison::values(now.conversion_rate, before.conversion_rate),
        monthly: monthly_series(
            &period,
            records
                .iter()
                .filter(|b| from_waiting_list(b) && period.contains(b.created_at))
                .map(|b| b.created_at),
            records
                .iter()
                .filter(|b| from_waiting_list(b) && comparison_period.contains(b.created_at))
                .map(|b| b.created_at),
        ),
        by_venue: breakdown(waiting.iter().map(|b| b.venue_name.clone())),
        by_class,
    }
}
