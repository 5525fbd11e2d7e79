use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

pub const DAYS: &[&str] = &[
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_CANCELLED: &str = "cancelled";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClassSchedule {
    pub id: Uuid,
    pub venue_id: Uuid,
    pub class_name: String,
    pub day: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub capacity: i32, // seats still free
    pub total_capacity: i32,
    pub allow_free_trial: bool,
    pub status: String, // "active" or "cancelled"
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct CreateClassScheduleData {
    pub venue_id: Uuid,
    pub class_name: String,
    pub day: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub total_capacity: i32,
    pub allow_free_trial: bool,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateClassScheduleData {
    pub class_name: Option<String>,
    pub day: Option<String>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub total_capacity: Option<i32>,
    pub capacity: Option<i32>,
    pub allow_free_trial: Option<bool>,
}

/// Free seats after the total capacity changes; `None` if bookings already
/// hold more seats than the new total allows.
pub fn adjusted_capacity(capacity: i32, old_total: i32, new_total: i32) -> Option<i32> {
    let adjusted = capacity + (new_total - old_total);
    (adjusted >= 0).then_some(adjusted)
}

impl ClassSchedule {
    pub fn is_active(&self) -> bool {
        self.status == STATUS_ACTIVE && self.deleted_at.is_none()
    }

    pub async fn create(
        pool: &PgPool,
        data: CreateClassScheduleData,
    ) -> Result<Self, sqlx::Error> {
        let class = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO class_schedules (
                venue_id, class_name, day, start_time, end_time,
                capacity, total_capacity, allow_free_trial, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(data.venue_id)
        .bind(&data.class_name)
        .bind(&data.day)
        .bind(data.start_time)
        .bind(data.end_time)
        .bind(data.total_capacity)
        .bind(data.allow_free_trial)
        .bind(data.created_by)
        .fetch_one(pool)
        .await?;

        Ok(class)
    }

    pub async fn find_in_scope(
        pool: &PgPool,
        id: Uuid,
        scope: &[Uuid],
    ) -> Result<Option<Self>, sqlx::Error> {
        let class = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM class_schedules
            WHERE id = $1 AND created_by = ANY($2) AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(scope)
        .fetch_optional(pool)
        .await?;

        Ok(class)
    }

    /// Lists classes, optionally for a single venue
    pub async fn list_in_scope(
        pool: &PgPool,
        scope: &[Uuid],
        venue_id: Option<Uuid>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let classes = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM class_schedules
            WHERE created_by = ANY($1)
              AND deleted_at IS NULL
              AND ($2::UUID IS NULL OR venue_id = $2)
            ORDER BY
                CASE day
                    WHEN 'Monday' THEN 1 WHEN 'Tuesday' THEN 2 WHEN 'Wednesday' THEN 3
                    WHEN 'Thursday' THEN 4 WHEN 'Friday' THEN 5 WHEN 'Saturday' THEN 6
                    ELSE 7
                END,
                start_time ASC
            "#,
        )
        .bind(scope)
        .bind(venue_id)
        .fetch_all(pool)
        .await?;

        Ok(classes)
    }

    /// Applies a partial update; call with the row locked when `capacity` is set
    pub async fn update(
        conn: &mut PgConnection,
        id: Uuid,
        data: UpdateClassScheduleData,
    ) -> Result<Self, sqlx::Error> {
        let class = sqlx::query_as::<_, Self>(
            r#"
            UPDATE class_schedules
            SET
                class_name = COALESCE($2, class_name),
                day = COALESCE($3, day),
                start_time = COALESCE($4, start_time),
                end_time = COALESCE($5, end_time),
                total_capacity = COALESCE($6, total_capacity),
                capacity = COALESCE($7, capacity),
                allow_free_trial = COALESCE($8, allow_free_trial),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.class_name)
        .bind(data.day)
        .bind(data.start_time)
        .bind(data.end_time)
        .bind(data.total_capacity)
        .bind(data.capacity)
        .bind(data.allow_free_trial)
        .fetch_one(conn)
        .await?;

        Ok(class)
    }

    pub async fn set_status(pool: &PgPool, id: Uuid, status: &str) -> Result<Self, sqlx::Error> {
        let class = sqlx::query_as::<_, Self>(
            r#"
            UPDATE class_schedules
            SET status = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_one(pool)
        .await?;

        Ok(class)
    }

    pub async fn soft_delete(pool: &PgPool, id: Uuid, deleted_by: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE class_schedules
            SET deleted_at = NOW(), deleted_by = $2
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(deleted_by)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Loads a class row and locks it until the surrounding transaction ends
    pub async fn lock_for_update(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let class = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM class_schedules
            WHERE id = $1 AND deleted_at IS NULL
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(class)
    }

    /// Adds `delta` free seats (negative to take seats)
    pub async fn adjust_capacity(
        conn: &mut PgConnection,
        id: Uuid,
        delta: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE class_schedules
            SET capacity = LEAST(total_capacity, capacity + $2), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(delta)
        .execute(conn)
        .await?;

        Ok(())
    }
}
