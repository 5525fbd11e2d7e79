//! Dashboard reports built from bookings held in memory.
//!
//! Each request loads the bookings in the admin's scope once, then every
//! report is a pure function over `BookingRecord`s and a `Period`, so the
//! numbers can be checked without a database.

pub mod cancellation;
pub mod common;
pub mod free_trial;
pub mod membership;
pub mod waiting_list;

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::Result;
use crate::models::booking::{AnalyticsBookingRow, Booking, STATUS_CANCELLED};
use crate::models::payment_plan::{monthly_fee, plan_months};

pub use cancellation::CancellationReport;
pub use common::Period;
pub use free_trial::FreeTrialReport;
pub use membership::MembershipReport;
pub use waiting_list::WaitingListReport;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub venue_id: Option<Uuid>,
    pub agent_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct StudentRecord {
    pub date_of_birth: NaiveDate,
    pub gender: String,
}

#[derive(Debug, Clone)]
pub struct PlanRecord {
    pub title: String,
    pub price: f64,
    pub interval: String,
    pub duration: i32,
}

impl PlanRecord {
    pub fn months(&self) -> i32 {
        plan_months(&self.interval, self.duration)
    }

    pub fn monthly_fee(&self) -> f64 {
        monthly_fee(self.price, &self.interval, self.duration)
    }
}

/// A booking flattened for aggregation. Timestamps are reduced to dates.
#[derive(Debug, Clone)]
pub struct BookingRecord {
    pub id: Uuid,
    pub booking_type: String,
    pub status: String,
    pub venue_name: String,
    pub class_name: String,
    pub source: Option<String>,
    pub trial_date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub converted_from: Option<String>,
    pub converted_at: Option<NaiveDate>,
    pub cancel_reason: Option<String>,
    pub cancelled_at: Option<NaiveDate>,
    pub agent_id: Uuid,
    pub agent_name: String,
    pub plan: Option<PlanRecord>,
    pub created_at: NaiveDate,
    pub students: Vec<StudentRecord>,
}

impl BookingRecord {
    pub fn student_count(&self) -> i64 {
        self.students.len() as i64
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == STATUS_CANCELLED
    }

    /// Date the booking stopped counting, if it was cancelled
    pub fn ended_on(&self) -> Option<NaiveDate> {
        if self.is_cancelled() {
            Some(self.cancelled_at.unwrap_or(self.created_at))
        } else {
            None
        }
    }

    fn from_row(row: AnalyticsBookingRow, students: Vec<StudentRecord>) -> Self {
        let plan = match (row.plan_title, row.plan_price, row.plan_interval, row.plan_duration) {
            (Some(title), Some(price), Some(interval), Some(duration)) => Some(PlanRecord {
                title,
                price,
                interval,
                duration,
            }),
            _ => None,
        };

        Self {
            id: row.id,
            booking_type: row.booking_type,
            status: row.status,
            venue_name: row.venue_name,
            class_name: row.class_name,
            source: row.source,
            trial_date: row.trial_date,
            start_date: row.start_date,
            converted_from: row.converted_from,
            converted_at: row.converted_at.map(|t| t.date_naive()),
            cancel_reason: row.cancel_reason,
            cancelled_at: row.cancelled_at.map(|t| t.date_naive()),
            agent_id: row.booked_by,
            agent_name: row.agent_name,
            plan,
            created_at: row.created_at.date_naive(),
            students,
        }
    }
}

/// Loads every booking in scope with its plan and students
pub async fn load_records(
    pool: &PgPool,
    scope: &[Uuid],
    query: &AnalyticsQuery,
) -> Result<Vec<BookingRecord>> {
    let rows = AnalyticsBookingRow::load(pool, scope, query.venue_id, query.agent_id).await?;

    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let mut students: HashMap<Uuid, Vec<StudentRecord>> = HashMap::new();
    for student in Booking::students_for(pool, &ids).await? {
        students
            .entry(student.booking_id)
            .or_default()
            .push(StudentRecord {
                date_of_birth: student.date_of_birth,
                gender: student.gender,
            });
    }

    let records: Vec<BookingRecord> = rows
        .into_iter()
        .map(|row| {
            let booking_students = students.remove(&row.id).unwrap_or_default();
            BookingRecord::from_row(row, booking_students)
        })
        .collect();

    Ok(records)
}

/// Resolves the report period relative to today
pub fn resolve_period(query: &AnalyticsQuery) -> Result<Period> {
    Period::from_query(query.from_date, query.to_date, Utc::now().date_naive())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::models::booking::{
        STATUS_ACTIVE, STATUS_PENDING, STATUS_WAITING_LIST, TYPE_FREE, TYPE_PAID,
        TYPE_WAITING_LIST,
    };

    pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    pub fn student(dob: NaiveDate, gender: &str) -> StudentRecord {
        StudentRecord {
            date_of_birth: dob,
            gender: gender.to_string(),
        }
    }

    pub fn base(booking_type: &str, status: &str, created_at: NaiveDate) -> BookingRecord {
        BookingRecord {
            id: Uuid::new_v4(),
            booking_type: booking_type.to_string(),
            status: status.to_string(),
            venue_name: "Riverside".to_string(),
            class_name: "U8 Saturday".to_string(),
            source: None,
            trial_date: None,
            start_date: None,
            converted_from: None,
            converted_at: None,
            cancel_reason: None,
            cancelled_at: None,
            agent_id: Uuid::nil(),
            agent_name: "Sam Agent".to_string(),
            plan: None,
            created_at,
            students: vec![student(d(2017, 1, 1), "male")],
        }
    }

    pub fn trial(trial_date: NaiveDate, status: &str) -> BookingRecord {
        let mut b = base(TYPE_FREE, status, trial_date);
        b.trial_date = Some(trial_date);
        b
    }

    pub fn pending_trial(trial_date: NaiveDate) -> BookingRecord {
        trial(trial_date, STATUS_PENDING)
    }

    pub fn plan(title: &str, price: f64, interval: &str, duration: i32) -> PlanRecord {
        PlanRecord {
            title: title.to_string(),
            price,
            interval: interval.to_string(),
            duration,
        }
    }

    pub fn membership(start: NaiveDate, plan_record: PlanRecord) -> BookingRecord {
        let mut b = base(TYPE_PAID, STATUS_ACTIVE, start);
        b.start_date = Some(start);
        b.plan = Some(plan_record);
        b
    }

    pub fn cancelled(mut b: BookingRecord, on: NaiveDate, reason: &str) -> BookingRecord {
        b.status = STATUS_CANCELLED.to_string();
        b.cancelled_at = Some(on);
        b.cancel_reason = Some(reason.to_string());
        b
    }

    pub fn waiting(created_at: NaiveDate) -> BookingRecord {
        base(TYPE_WAITING_LIST, STATUS_WAITING_LIST, created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_ended_on_only_for_cancelled() {
        let active = membership(d(2025, 1, 1), plan("Monthly", 40.0, "Month", 1));
        assert_eq!(active.ended_on(), None);

        let gone = cancelled(active, d(2025, 3, 2), "Moved away");
        assert_eq!(gone.ended_on(), Some(d(2025, 3, 2)));
    }

    #[test]
    fn test_plan_record_fee() {
        let p = plan("Annual", 360.0, "Year", 1);
        assert_eq!(p.months(), 12);
        assert_eq!(p.monthly_fee(), 30.0);
    }
}
