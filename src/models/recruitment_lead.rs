use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

pub const ROLE_TYPES: &[&str] = &["coach", "venue_manager"];
pub const STATUSES: &[&str] = &["pending", "interviewed", "recruited", "rejected"];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RecruitmentLead {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub postcode: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub role_type: String, // "coach" or "venue_manager"
    pub experience_years: Option<i32>,
    pub qualifications: Option<String>,
    pub status: String, // "pending", "interviewed", "recruited", "rejected"
    pub telephone_call_score: Option<i32>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct CreateLeadData {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub postcode: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub role_type: String,
    pub experience_years: Option<i32>,
    pub qualifications: Option<String>,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateLeadData {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub postcode: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub experience_years: Option<i32>,
    pub qualifications: Option<String>,
    pub telephone_call_score: Option<i32>,
}

impl RecruitmentLead {
    pub async fn create(pool: &PgPool, data: CreateLeadData) -> Result<Self, sqlx::Error> {
        let lead = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO recruitment_leads (
                first_name, last_name, email, phone, postcode, age, gender,
                role_type, experience_years, qualifications, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(data.email.to_lowercase())
        .bind(&data.phone)
        .bind(&data.postcode)
        .bind(data.age)
        .bind(&data.gender)
        .bind(&data.role_type)
        .bind(data.experience_years)
        .bind(&data.qualifications)
        .bind(data.created_by)
        .fetch_one(pool)
        .await?;

        Ok(lead)
    }

    pub async fn find_in_scope(
        pool: &PgPool,
        id: Uuid,
        scope: &[Uuid],
    ) -> Result<Option<Self>, sqlx::Error> {
        let lead = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM recruitment_leads
            WHERE id = $1 AND created_by = ANY($2) AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(scope)
        .fetch_optional(pool)
        .await?;

        Ok(lead)
    }

    pub async fn list_in_scope(
        pool: &PgPool,
        scope: &[Uuid],
        status: Option<&str>,
        role_type: Option<&str>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let leads = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM recruitment_leads
            WHERE created_by = ANY($1)
              AND deleted_at IS NULL
              AND ($2::TEXT IS NULL OR status = $2)
              AND ($3::TEXT IS NULL OR role_type = $3)
            ORDER BY created_at DESC
            "#,
        )
        .bind(scope)
        .bind(status)
        .bind(role_type)
        .fetch_all(pool)
        .await?;

        Ok(leads)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateLeadData,
    ) -> Result<Self, sqlx::Error> {
        let lead = sqlx::query_as::<_, Self>(
            r#"
            UPDATE recruitment_leads
            SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                email = COALESCE($4, email),
                phone = COALESCE($5, phone),
                postcode = COALESCE($6, postcode),
                age = COALESCE($7, age),
                gender = COALESCE($8, gender),
                experience_years = COALESCE($9, experience_years),
                qualifications = COALESCE($10, qualifications),
                telephone_call_score = COALESCE($11, telephone_call_score),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(data.email.map(|e| e.to_lowercase()))
        .bind(data.phone)
        .bind(data.postcode)
        .bind(data.age)
        .bind(data.gender)
        .bind(data.experience_years)
        .bind(data.qualifications)
        .bind(data.telephone_call_score)
        .fetch_one(pool)
        .await?;

        Ok(lead)
    }

    pub async fn set_status(pool: &PgPool, id: Uuid, status: &str) -> Result<Self, sqlx::Error> {
        let lead = sqlx::query_as::<_, Self>(
            r#"
            UPDATE recruitment_leads
            SET status = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_one(pool)
        .await?;

        Ok(lead)
    }

    pub async fn soft_delete(pool: &PgPool, id: Uuid, deleted_by: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE recruitment_leads
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
