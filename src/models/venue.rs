use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::db::contains_pattern;

pub const FACILITIES: &[&str] = &["indoor", "outdoor"];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Venue {
    pub id: Uuid,
    pub name: String,
    pub area: String,
    pub address: String,
    pub facility: String, // "indoor" or "outdoor"
    pub parking_note: Option<String>,
    pub how_to_enter_facility: Option<String>,
    pub is_congested: bool,
    pub has_parking: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct CreateVenueData {
    pub name: String,
    pub area: String,
    pub address: String,
    pub facility: String,
    pub parking_note: Option<String>,
    pub how_to_enter_facility: Option<String>,
    pub is_congested: bool,
    pub has_parking: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateVenueData {
    pub name: Option<String>,
    pub area: Option<String>,
    pub address: Option<String>,
    pub facility: Option<String>,
    pub parking_note: Option<String>,
    pub how_to_enter_facility: Option<String>,
    pub is_congested: Option<bool>,
    pub has_parking: Option<bool>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Venue {
    pub async fn create(pool: &PgPool, data: CreateVenueData) -> Result<Self, sqlx::Error> {
        let venue = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO venues (
                name, area, address, facility, parking_note, how_to_enter_facility,
                is_congested, has_parking, latitude, longitude, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(&data.area)
        .bind(&data.address)
        .bind(&data.facility)
        .bind(&data.parking_note)
        .bind(&data.how_to_enter_facility)
        .bind(data.is_congested)
        .bind(data.has_parking)
        .bind(data.latitude)
        .bind(data.longitude)
        .bind(data.created_by)
        .fetch_one(pool)
        .await?;

        Ok(venue)
    }

    /// Finds a venue visible to the given admin scope
    pub async fn find_in_scope(
        pool: &PgPool,
        id: Uuid,
        scope: &[Uuid],
    ) -> Result<Option<Self>, sqlx::Error> {
        let venue = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM venues
            WHERE id = $1 AND created_by = ANY($2) AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(scope)
        .fetch_optional(pool)
        .await?;

        Ok(venue)
    }

    /// Lists venues, optionally filtered by a case-insensitive name/area search
    pub async fn list_in_scope(
        pool: &PgPool,
        scope: &[Uuid],
        search: Option<&str>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let pattern = search.map(contains_pattern);

        let venues = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM venues
            WHERE created_by = ANY($1)
              AND deleted_at IS NULL
              AND ($2::TEXT IS NULL OR name ILIKE $2 OR area ILIKE $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(scope)
        .bind(pattern)
        .fetch_all(pool)
        .await?;

        Ok(venues)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateVenueData,
    ) -> Result<Self, sqlx::Error> {
        let venue = sqlx::query_as::<_, Self>(
            r#"
            UPDATE venues
            SET
                name = COALESCE($2, name),
                area = COALESCE($3, area),
                address = COALESCE($4, address),
                facility = COALESCE($5, facility),
                parking_note = COALESCE($6, parking_note),
                how_to_enter_facility = COALESCE($7, how_to_enter_facility),
                is_congested = COALESCE($8, is_congested),
                has_parking = COALESCE($9, has_parking),
                latitude = COALESCE($10, latitude),
                longitude = COALESCE($11, longitude),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.name)
        .bind(data.area)
        .bind(data.address)
        .bind(data.facility)
        .bind(data.parking_note)
        .bind(data.how_to_enter_facility)
        .bind(data.is_congested)
        .bind(data.has_parking)
        .bind(data.latitude)
        .bind(data.longitude)
        .fetch_one(pool)
        .await?;

        Ok(venue)
    }

    /// Counts active, non-deleted classes still scheduled at a venue
    pub async fn count_active_classes(pool: &PgPool, id: Uuid) -> Result<i64, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM class_schedules
            WHERE venue_id = $1 AND status = 'active' AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Soft delete
    pub async fn soft_delete(pool: &PgPool, id: Uuid, deleted_by: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE venues
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
}
