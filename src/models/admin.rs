use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

pub const ROLE_SUPER_ADMIN: &str = "super_admin";
pub const ROLES: &[&str] = &[ROLE_SUPER_ADMIN, "admin", "agent", "coach"];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Admin {
    pub id: Uuid,
    pub super_admin_id: Option<Uuid>, // owner in the admin tree, None for a root account
    pub role: String,                 // "super_admin", "admin", "agent", "coach"
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct CreateAdminData {
    pub super_admin_id: Option<Uuid>,
    pub role: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateAdminData {
    pub role: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password_hash: Option<String>,
}

impl Admin {
    /// Root of the ownership tree this admin belongs to.
    pub fn scope_root(&self) -> Uuid {
        self.super_admin_id.unwrap_or(self.id)
    }

    /// Only root accounts and super admins may manage other admins.
    pub fn can_manage_admins(&self) -> bool {
        self.role == ROLE_SUPER_ADMIN || self.super_admin_id.is_none()
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub async fn create(pool: &PgPool, data: CreateAdminData) -> Result<Self, sqlx::Error> {
        let admin = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO admins (
                super_admin_id, role, first_name, last_name, email, phone, password_hash
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(data.super_admin_id)
        .bind(&data.role)
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(data.email.to_lowercase())
        .bind(&data.phone)
        .bind(&data.password_hash)
        .fetch_one(pool)
        .await?;

        Ok(admin)
    }

    /// Finds a non-deleted admin by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let admin = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM admins WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(admin)
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let admin = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM admins WHERE LOWER(email) = LOWER($1) AND deleted_at IS NULL
            "#,
        )
        .bind(email.trim())
        .fetch_optional(pool)
        .await?;

        Ok(admin)
    }

    /// Lists the admins visible from a scope root (the root itself and its children)
    pub async fn list_in_scope(pool: &PgPool, root: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let admins = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM admins
            WHERE (id = $1 OR super_admin_id = $1) AND deleted_at IS NULL
            ORDER BY created_at ASC
            "#,
        )
        .bind(root)
        .fetch_all(pool)
        .await?;

        Ok(admins)
    }

    /// IDs whose records this admin may see. Deleted admins are kept so that
    /// rows they created stay visible.
    pub async fn scope_ids(pool: &PgPool, admin: &Admin) -> Result<Vec<Uuid>, sqlx::Error> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM admins WHERE id = $1 OR super_admin_id = $1
            "#,
        )
        .bind(admin.scope_root())
        .fetch_all(pool)
        .await?;

        Ok(ids)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateAdminData,
    ) -> Result<Self, sqlx::Error> {
        let admin = sqlx::query_as::<_, Self>(
            r#"
            UPDATE admins
            SET
                role = COALESCE($2, role),
                first_name = COALESCE($3, first_name),
                last_name = COALESCE($4, last_name),
                email = COALESCE($5, email),
                phone = COALESCE($6, phone),
                password_hash = COALESCE($7, password_hash),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.role)
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(data.email.map(|e| e.to_lowercase()))
        .bind(data.phone)
        .bind(data.password_hash)
        .fetch_one(pool)
        .await?;

        Ok(admin)
    }

    pub async fn soft_delete(pool: &PgPool, id: Uuid, deleted_by: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE admins
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
