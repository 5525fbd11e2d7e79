use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

pub const MODES: &[&str] = &["email", "text"];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TemplateCategory {
    pub id: Uuid,
    pub name: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CustomTemplate {
    pub id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub mode_of_communication: String, // "email" or "text"
    pub subject: Option<String>,
    pub content: String,
    pub tags: Vec<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct CreateTemplateData {
    pub category_id: Uuid,
    pub title: String,
    pub mode_of_communication: String,
    pub subject: Option<String>,
    pub content: String,
    pub tags: Vec<String>,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateTemplateData {
    pub category_id: Option<Uuid>,
    pub title: Option<String>,
    pub mode_of_communication: Option<String>,
    pub subject: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl TemplateCategory {
    pub async fn create(pool: &PgPool, name: &str, created_by: Uuid) -> Result<Self, sqlx::Error> {
        let category = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO template_categories (name, created_by)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(created_by)
        .fetch_one(pool)
        .await?;

        Ok(category)
    }

    pub async fn find_in_scope(
        pool: &PgPool,
        id: Uuid,
        scope: &[Uuid],
    ) -> Result<Option<Self>, sqlx::Error> {
        let category = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM template_categories
            WHERE id = $1 AND created_by = ANY($2) AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(scope)
        .fetch_optional(pool)
        .await?;

        Ok(category)
    }

    /// Case-insensitive name lookup within a scope
    pub async fn find_by_name(
        pool: &PgPool,
        name: &str,
        scope: &[Uuid],
    ) -> Result<Option<Self>, sqlx::Error> {
        let category = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM template_categories
            WHERE LOWER(name) = LOWER($1) AND created_by = ANY($2) AND deleted_at IS NULL
            "#,
        )
        .bind(name)
        .bind(scope)
        .fetch_optional(pool)
        .await?;

        Ok(category)
    }

    pub async fn list_in_scope(pool: &PgPool, scope: &[Uuid]) -> Result<Vec<Self>, sqlx::Error> {
        let categories = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM template_categories
            WHERE created_by = ANY($1) AND deleted_at IS NULL
            ORDER BY name ASC
            "#,
        )
        .bind(scope)
        .fetch_all(pool)
        .await?;

        Ok(categories)
    }

    pub async fn rename(pool: &PgPool, id: Uuid, name: &str) -> Result<Self, sqlx::Error> {
        let category = sqlx::query_as::<_, Self>(
            r#"
            UPDATE template_categories
            SET name = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .fetch_one(pool)
        .await?;

        Ok(category)
    }

    pub async fn count_templates(pool: &PgPool, id: Uuid) -> Result<i64, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM custom_templates
            WHERE category_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    pub async fn soft_delete(pool: &PgPool, id: Uuid, deleted_by: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE template_categories
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

impl CustomTemplate {
    pub async fn create(pool: &PgPool, data: CreateTemplateData) -> Result<Self, sqlx::Error> {
        let template = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO custom_templates (
                category_id, title, mode_of_communication, subject, content, tags, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(data.category_id)
        .bind(&data.title)
        .bind(&data.mode_of_communication)
        .bind(&data.subject)
        .bind(&data.content)
        .bind(&data.tags)
        .bind(data.created_by)
        .fetch_one(pool)
        .await?;

        Ok(template)
    }

    pub async fn find_in_scope(
        pool: &PgPool,
        id: Uuid,
        scope: &[Uuid],
    ) -> Result<Option<Self>, sqlx::Error> {
        let template = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM custom_templates
            WHERE id = $1 AND created_by = ANY($2) AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(scope)
        .fetch_optional(pool)
        .await?;

        Ok(template)
    }

    pub async fn list_in_scope(
        pool: &PgPool,
        scope: &[Uuid],
        category_id: Option<Uuid>,
        mode: Option<&str>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let templates = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM custom_templates
            WHERE created_by = ANY($1)
              AND deleted_at IS NULL
              AND ($2::UUID IS NULL OR category_id = $2)
              AND ($3::TEXT IS NULL OR mode_of_communication = $3)
            ORDER BY created_at DESC
            "#,
        )
        .bind(scope)
        .bind(category_id)
        .bind(mode)
        .fetch_all(pool)
        .await?;

        Ok(templates)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTemplateData,
    ) -> Result<Self, sqlx::Error> {
        let template = sqlx::query_as::<_, Self>(
            r#"
            UPDATE custom_templates
            SET
                category_id = COALESCE($2, category_id),
                title = COALESCE($3, title),
                mode_of_communication = COALESCE($4, mode_of_communication),
                subject = COALESCE($5, subject),
                content = COALESCE($6, content),
                tags = COALESCE($7, tags),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.category_id)
        .bind(data.title)
        .bind(data.mode_of_communication)
        .bind(data.subject)
        .bind(data.content)
        .bind(data.tags)
        .fetch_one(pool)
        .await?;

        Ok(template)
    }

    pub async fn soft_delete(pool: &PgPool, id: Uuid, deleted_by: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE custom_templates
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
