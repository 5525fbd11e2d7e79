use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

pub const CATEGORY_FREE_TRIALS: &str = "Free Trials";
pub const CATEGORY_MEMBERS: &str = "Members";
pub const CATEGORY_CANCELLED_MEMBERSHIPS: &str = "Cancelled Memberships";
pub const CATEGORY_MEMBER_ACQUISITION: &str = "Member Acquisition";

pub const CATEGORIES: &[&str] = &[
    "Complaints",
    "Payments",
    CATEGORY_CANCELLED_MEMBERSHIPS,
    CATEGORY_MEMBERS,
    CATEGORY_MEMBER_ACQUISITION,
    CATEGORY_FREE_TRIALS,
    "Admins",
    "System",
];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub category: String,
    pub title: String,
    pub description: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A notification together with the reader's read state
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NotificationView {
    pub id: Uuid,
    pub category: String,
    pub title: String,
    pub description: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

impl Notification {
    /// Records a notification; runs on the caller's connection so it commits
    /// with the change it describes.
    pub async fn create(
        conn: &mut PgConnection,
        category: &str,
        title: &str,
        description: &str,
        created_by: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let notification = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO notifications (category, title, description, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(category)
        .bind(title)
        .bind(description)
        .bind(created_by)
        .fetch_one(conn)
        .await?;

        Ok(notification)
    }

    pub async fn list_for_admin(
        pool: &PgPool,
        scope: &[Uuid],
        admin_id: Uuid,
        category: Option<&str>,
    ) -> Result<Vec<NotificationView>, sqlx::Error> {
        let notifications = sqlx::query_as::<_, NotificationView>(
            r#"
            SELECT n.*, (r.admin_id IS NOT NULL) AS is_read
            FROM notifications n
            LEFT JOIN notification_reads r
              ON r.notification_id = n.id AND r.admin_id = $2
            WHERE n.created_by = ANY($1)
              AND ($3::TEXT IS NULL OR n.category = $3)
            ORDER BY n.created_at DESC
            "#,
        )
        .bind(scope)
        .bind(admin_id)
        .bind(category)
        .fetch_all(pool)
        .await?;

        Ok(notifications)
    }

    pub async fn exists_in_scope(
        pool: &PgPool,
        id: Uuid,
        scope: &[Uuid],
    ) -> Result<bool, sqlx::Error> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (SELECT 1 FROM notifications WHERE id = $1 AND created_by = ANY($2))
            "#,
        )
        .bind(id)
        .bind(scope)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    pub async fn mark_read(pool: &PgPool, id: Uuid, admin_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO notification_reads (notification_id, admin_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(id)
        .bind(admin_id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Marks every visible notification as read, returns how many were new
    pub async fn mark_all_read(
        pool: &PgPool,
        scope: &[Uuid],
        admin_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO notification_reads (notification_id, admin_id)
            SELECT id, $2 FROM notifications WHERE created_by = ANY($1)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(scope)
        .bind(admin_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}
