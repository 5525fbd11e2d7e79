use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

pub const STATUSES: &[&str] = &["to_do", "in_progress", "in_review", "completed"];
pub const PRIORITIES: &[&str] = &["low", "medium", "high"];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ToDoItem {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: String,
    pub assigned_admins: Vec<Uuid>,
    pub due_date: Option<NaiveDate>,
    pub sort_order: i32,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct CreateToDoData {
    pub title: String,
    pub description: Option<String>,
    pub priority: String,
    pub assigned_admins: Vec<Uuid>,
    pub due_date: Option<NaiveDate>,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateToDoData {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub assigned_admins: Option<Vec<Uuid>>,
    pub due_date: Option<NaiveDate>,
    pub sort_order: Option<i32>,
}

/// Items bucketed by status, in board column order
#[derive(Debug, Clone, Serialize)]
pub struct ToDoBoard {
    pub to_do: Vec<ToDoItem>,
    pub in_progress: Vec<ToDoItem>,
    pub in_review: Vec<ToDoItem>,
    pub completed: Vec<ToDoItem>,
}

impl ToDoBoard {
    pub fn from_items(items: Vec<ToDoItem>) -> Self {
        let mut board = ToDoBoard {
            to_do: Vec::new(),
            in_progress: Vec::new(),
            in_review: Vec::new(),
            completed: Vec::new(),
        };

        for item in items {
            match item.status.as_str() {
                "in_progress" => board.in_progress.push(item),
                "in_review" => board.in_review.push(item),
                "completed" => board.completed.push(item),
                _ => board.to_do.push(item),
            }
        }

        board
    }
}

impl ToDoItem {
    /// New items go to the bottom of the "to_do" column
    pub async fn create(pool: &PgPool, data: CreateToDoData) -> Result<Self, sqlx::Error> {
        let item = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO todo_lists (
                title, description, priority, assigned_admins, due_date, sort_order, created_by
            )
            VALUES (
                $1, $2, $3, $4, $5,
                (
                    SELECT COALESCE(MAX(sort_order), 0) + 1 FROM todo_lists
                    WHERE status = 'to_do' AND created_by = $6
                ),
                $6
            )
            RETURNING *
            "#,
        )
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.priority)
        .bind(&data.assigned_admins)
        .bind(data.due_date)
        .bind(data.created_by)
        .fetch_one(pool)
        .await?;

        Ok(item)
    }

    pub async fn find_in_scope(
        pool: &PgPool,
        id: Uuid,
        scope: &[Uuid],
    ) -> Result<Option<Self>, sqlx::Error> {
        let item = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM todo_lists
            WHERE id = $1 AND created_by = ANY($2) AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(scope)
        .fetch_optional(pool)
        .await?;

        Ok(item)
    }

    pub async fn list_in_scope(pool: &PgPool, scope: &[Uuid]) -> Result<Vec<Self>, sqlx::Error> {
        let items = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM todo_lists
            WHERE created_by = ANY($1) AND deleted_at IS NULL
            ORDER BY sort_order ASC, created_at ASC
            "#,
        )
        .bind(scope)
        .fetch_all(pool)
        .await?;

        Ok(items)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateToDoData,
    ) -> Result<Self, sqlx::Error> {
        let item = sqlx::query_as::<_, Self>(
            r#"
            UPDATE todo_lists
            SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                priority = COALESCE($4, priority),
                assigned_admins = COALESCE($5, assigned_admins),
                due_date = COALESCE($6, due_date),
                sort_order = COALESCE($7, sort_order),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.priority)
        .bind(data.assigned_admins)
        .bind(data.due_date)
        .bind(data.sort_order)
        .fetch_one(pool)
        .await?;

        Ok(item)
    }

    pub async fn set_status(pool: &PgPool, id: Uuid, status: &str) -> Result<Self, sqlx::Error> {
        let item = sqlx::query_as::<_, Self>(
            r#"
            UPDATE todo_lists
            SET status = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_one(pool)
        .await?;

        Ok(item)
    }

    pub async fn soft_delete(pool: &PgPool, id: Uuid, deleted_by: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE todo_lists
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

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, status: &str) -> ToDoItem {
        ToDoItem {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: None,
            status: status.to_string(),
            priority: "medium".to_string(),
            assigned_admins: vec![],
            due_date: None,
            sort_order: 0,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
            deleted_by: None,
        }
    }

    #[test]
    fn test_board_grouping_keeps_order() {
        let board = ToDoBoard::from_items(vec![
            item("call venue", "to_do"),
            item("order kit", "completed"),
            item("chase invoice", "to_do"),
            item("review coach", "in_review"),
        ]);

        let titles: Vec<&str> = board.to_do.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["call venue", "chase invoice"]);
        assert!(board.in_progress.is_empty());
        assert_eq!(board.in_review.len(), 1);
        assert_eq!(board.completed.len(), 1);
    }
}
