use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use crate::db::contains_pattern;

pub const TYPE_FREE: &str = "free";
pub const TYPE_PAID: &str = "paid";
pub const TYPE_WAITING_LIST: &str = "waiting list";

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_ATTENDED: &str = "attended";
pub const STATUS_NOT_ATTENDED: &str = "not attended";
pub const STATUS_CANCELLED: &str = "cancelled";
pub const STATUS_WAITING_LIST: &str = "waiting list";

pub const BOOKING_TYPES: &[&str] = &[TYPE_FREE, TYPE_PAID, TYPE_WAITING_LIST];
pub const STATUSES: &[&str] = &[
    STATUS_PENDING,
    STATUS_ACTIVE,
    STATUS_ATTENDED,
    STATUS_NOT_ATTENDED,
    STATUS_CANCELLED,
    STATUS_WAITING_LIST,
];
pub const GENDERS: &[&str] = &["male", "female", "other"];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub booking_type: String, // "free", "paid" or "waiting list"
    pub status: String,
    pub venue_id: Uuid,
    pub class_schedule_id: Uuid,
    pub payment_plan_id: Option<Uuid>,
    pub trial_date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub source: Option<String>, // marketing channel the lead came from
    pub converted_from: Option<String>,
    pub converted_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub cancel_note: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub booked_by: Uuid,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BookingStudent {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub medical_information: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BookingParent {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub relation: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BookingEmergency {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub relation: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentData {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub medical_information: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentData {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub relation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyData {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub relation: String,
}

#[derive(Debug, Clone)]
pub struct CreateBookingData {
    pub booking_type: String,
    pub status: String,
    pub venue_id: Uuid,
    pub class_schedule_id: Uuid,
    pub trial_date: Option<NaiveDate>,
    pub source: Option<String>,
    pub booked_by: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub booking_type: Option<String>,
    pub venue_id: Option<Uuid>,
    pub status: Option<String>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub search: Option<String>,
}

/// Booking with its students, as shown in listings
#[derive(Debug, Clone, Serialize)]
pub struct BookingWithStudents {
    #[serde(flatten)]
    pub booking: Booking,
    pub students: Vec<BookingStudent>,
}

/// Booking with every contact attached
#[derive(Debug, Clone, Serialize)]
pub struct BookingDetails {
    #[serde(flatten)]
    pub booking: Booking,
    pub students: Vec<BookingStudent>,
    pub parents: Vec<BookingParent>,
    pub emergency: Option<BookingEmergency>,
}

impl Booking {
    /// Whether this booking currently occupies seats in its class
    pub fn holds_seats(&self) -> bool {
        self.booking_type != TYPE_WAITING_LIST && self.status != STATUS_CANCELLED
    }

    pub async fn insert(
        conn: &mut PgConnection,
        data: &CreateBookingData,
    ) -> Result<Self, sqlx::Error> {
        let booking = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO bookings (
                booking_type, status, venue_id, class_schedule_id,
                trial_date, source, booked_by, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING *
            "#,
        )
        .bind(&data.booking_type)
        .bind(&data.status)
        .bind(data.venue_id)
        .bind(data.class_schedule_id)
        .bind(data.trial_date)
        .bind(&data.source)
        .bind(data.booked_by)
        .fetch_one(conn)
        .await?;

        Ok(booking)
    }

    pub async fn insert_student(
        conn: &mut PgConnection,
        booking_id: Uuid,
        data: &StudentData,
    ) -> Result<BookingStudent, sqlx::Error> {
        let student = sqlx::query_as::<_, BookingStudent>(
            r#"
            INSERT INTO booking_students (
                booking_id, first_name, last_name, date_of_birth, gender, medical_information
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(data.date_of_birth)
        .bind(&data.gender)
        .bind(&data.medical_information)
        .fetch_one(conn)
        .await?;

        Ok(student)
    }

    pub async fn insert_parent(
        conn: &mut PgConnection,
        booking_id: Uuid,
        data: &ParentData,
    ) -> Result<BookingParent, sqlx::Error> {
        let parent = sqlx::query_as::<_, BookingParent>(
            r#"
            INSERT INTO booking_parents (booking_id, first_name, last_name, email, phone, relation)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(data.email.to_lowercase())
        .bind(&data.phone)
        .bind(&data.relation)
        .fetch_one(conn)
        .await?;

        Ok(parent)
    }

    pub async fn insert_emergency(
        conn: &mut PgConnection,
        booking_id: Uuid,
        data: &EmergencyData,
    ) -> Result<BookingEmergency, sqlx::Error> {
        let emergency = sqlx::query_as::<_, BookingEmergency>(
            r#"
            INSERT INTO booking_emergencies (booking_id, first_name, last_name, phone, relation)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(&data.phone)
        .bind(&data.relation)
        .fetch_one(conn)
        .await?;

        Ok(emergency)
    }

    pub async fn find_in_scope(
        pool: &PgPool,
        id: Uuid,
        scope: &[Uuid],
    ) -> Result<Option<Self>, sqlx::Error> {
        let booking = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM bookings WHERE id = $1 AND created_by = ANY($2)
            "#,
        )
        .bind(id)
        .bind(scope)
        .fetch_optional(pool)
        .await?;

        Ok(booking)
    }

    /// Loads a booking with its students, parents and emergency contact
    pub async fn find_details(
        pool: &PgPool,
        id: Uuid,
        scope: &[Uuid],
    ) -> Result<Option<BookingDetails>, sqlx::Error> {
        let Some(booking) = Self::find_in_scope(pool, id, scope).await? else {
            return Ok(None);
        };

        let students = Self::students_for(pool, &[booking.id]).await?;

        let parents = sqlx::query_as::<_, BookingParent>(
            r#"
            SELECT * FROM booking_parents WHERE booking_id = $1 ORDER BY created_at ASC
            "#,
        )
        .bind(booking.id)
        .fetch_all(pool)
        .await?;

        let emergency = sqlx::query_as::<_, BookingEmergency>(
            r#"
            SELECT * FROM booking_emergencies WHERE booking_id = $1
            "#,
        )
        .bind(booking.id)
        .fetch_optional(pool)
        .await?;

        Ok(Some(BookingDetails {
            booking,
            students,
            parents,
            emergency,
        }))
    }

    /// Students for a set of bookings
    pub async fn students_for(
        pool: &PgPool,
        booking_ids: &[Uuid],
    ) -> Result<Vec<BookingStudent>, sqlx::Error> {
        let students = sqlx::query_as::<_, BookingStudent>(
            r#"
            SELECT * FROM booking_students
            WHERE booking_id = ANY($1)
            ORDER BY created_at ASC
            "#,
        )
        .bind(booking_ids)
        .fetch_all(pool)
        .await?;

        Ok(students)
    }

    /// Lists bookings with their students
    pub async fn list(
        pool: &PgPool,
        scope: &[Uuid],
        filter: &BookingFilter,
    ) -> Result<Vec<BookingWithStudents>, sqlx::Error> {
        let search = filter.search.as_deref().map(contains_pattern);

        let bookings = sqlx::query_as::<_, Self>(
            r#"
            SELECT b.* FROM bookings b
            CROSS JOIN LATERAL (
                -- trials are dated by the day they take place
                SELECT CASE WHEN b.booking_type = 'free'
                    THEN COALESCE(b.trial_date, b.created_at::DATE)
                    ELSE b.created_at::DATE
                END AS listed_on
            ) d
            WHERE b.created_by = ANY($1)
              AND ($2::TEXT IS NULL OR b.booking_type = $2)
              AND ($3::UUID IS NULL OR b.venue_id = $3)
              AND ($4::TEXT IS NULL OR b.status = $4)
              AND ($5::DATE IS NULL OR d.listed_on >= $5)
              AND ($6::DATE IS NULL OR d.listed_on <= $6)
              AND (
                  $7::TEXT IS NULL OR EXISTS (
                      SELECT 1 FROM booking_students s
                      WHERE s.booking_id = b.id
                        AND (s.first_name || ' ' || s.last_name) ILIKE $7
                  )
              )
            ORDER BY b.created_at DESC
            "#,
        )
        .bind(scope)
        .bind(&filter.booking_type)
        .bind(filter.venue_id)
        .bind(&filter.status)
        .bind(filter.from_date)
        .bind(filter.to_date)
        .bind(search)
        .fetch_all(pool)
        .await?;

        let ids: Vec<Uuid> = bookings.iter().map(|b| b.id).collect();
        let mut by_booking: HashMap<Uuid, Vec<BookingStudent>> = HashMap::new();
        for student in Self::students_for(pool, &ids).await? {
            by_booking.entry(student.booking_id).or_default().push(student);
        }

        Ok(bookings
            .into_iter()
            .map(|booking| BookingWithStudents {
                students: by_booking.remove(&booking.id).unwrap_or_default(),
                booking,
            })
            .collect())
    }

    pub async fn set_status(
        conn: &mut PgConnection,
        id: Uuid,
        status: &str,
    ) -> Result<Self, sqlx::Error> {
        let booking = sqlx::query_as::<_, Self>(
            r#"
            UPDATE bookings
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_one(conn)
        .await?;

        Ok(booking)
    }

    pub async fn lock_for_update(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let booking = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM bookings WHERE id = $1 FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(booking)
    }

    pub async fn count_students(conn: &mut PgConnection, id: Uuid) -> Result<i64, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM booking_students WHERE booking_id = $1
            "#,
        )
        .bind(id)
        .fetch_one(conn)
        .await?;

        Ok(count)
    }

    pub async fn mark_cancelled(
        conn: &mut PgConnection,
        id: Uuid,
        reason: &str,
        note: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        let booking = sqlx::query_as::<_, Self>(
            r#"
            UPDATE bookings
            SET status = 'cancelled', cancel_reason = $2, cancel_note = $3,
                cancelled_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(reason)
        .bind(note)
        .fetch_one(conn)
        .await?;

        Ok(booking)
    }

    /// Turns a trial or waiting-list booking into an active membership
    pub async fn mark_converted(
        conn: &mut PgConnection,
        id: Uuid,
        payment_plan_id: Uuid,
        start_date: NaiveDate,
        converted_from: &str,
    ) -> Result<Self, sqlx::Error> {
        let booking = sqlx::query_as::<_, Self>(
            r#"
            UPDATE bookings
            SET booking_type = 'paid', status = 'active', payment_plan_id = $2,
                start_date = $3, converted_from = $4, converted_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(payment_plan_id)
        .bind(start_date)
        .bind(converted_from)
        .fetch_one(conn)
        .await?;

        Ok(booking)
    }
}

/// Flat booking row joined with the names and plan terms analytics needs
#[derive(Debug, Clone, FromRow)]
pub struct AnalyticsBookingRow {
    pub id: Uuid,
    pub booking_type: String,
    pub status: String,
    pub venue_id: Uuid,
    pub venue_name: String,
    pub class_schedule_id: Uuid,
    pub class_name: String,
    pub source: Option<String>,
    pub trial_date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub converted_from: Option<String>,
    pub converted_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub booked_by: Uuid,
    pub agent_name: String,
    pub plan_title: Option<String>,
    pub plan_price: Option<f64>,
    pub plan_interval: Option<String>,
    pub plan_duration: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl AnalyticsBookingRow {
    /// Every booking in scope, optionally narrowed to a venue or agent.
    /// Periods are applied in memory since reports compare two of them.
    pub async fn load(
        pool: &PgPool,
        scope: &[Uuid],
        venue_id: Option<Uuid>,
        agent_id: Option<Uuid>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let rows = sqlx::query_as::<_, Self>(
            r#"
            SELECT
                b.id, b.booking_type, b.status, b.venue_id, v.name AS venue_name,
                b.class_schedule_id, c.class_name, b.source, b.trial_date, b.start_date,
                b.converted_from, b.converted_at, b.cancel_reason, b.cancelled_at,
                b.booked_by, (a.first_name || ' ' || a.last_name) AS agent_name,
                p.title AS plan_title, p.price AS plan_price,
                p.interval AS plan_interval, p.duration AS plan_duration,
                b.created_at
            FROM bookings b
            JOIN venues v ON v.id = b.venue_id
            JOIN class_schedules c ON c.id = b.class_schedule_id
            JOIN admins a ON a.id = b.booked_by
            LEFT JOIN payment_plans p ON p.id = b.payment_plan_id
            WHERE b.created_by = ANY($1)
              AND ($2::UUID IS NULL OR b.venue_id = $2)
              AND ($3::UUID IS NULL OR b.booked_by = $3)
            ORDER BY b.created_at ASC
            "#,
        )
        .bind(scope)
        .bind(venue_id)
        .bind(agent_id)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }
}
