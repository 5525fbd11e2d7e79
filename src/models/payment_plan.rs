use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

pub const INTERVALS: &[&str] = &["Month", "Quarter", "Year"];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentPlan {
    pub id: Uuid,
    pub title: String,
    pub price: f64,
    pub price_lesson: Option<f64>,
    pub interval: String, // "Month", "Quarter" or "Year"
    pub duration: i32,
    pub students: i32,
    pub joining_fee: Option<f64>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct CreatePaymentPlanData {
    pub title: String,
    pub price: f64,
    pub price_lesson: Option<f64>,
    pub interval: String,
    pub duration: i32,
    pub students: i32,
    pub joining_fee: Option<f64>,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct UpdatePaymentPlanData {
    pub title: Option<String>,
    pub price: Option<f64>,
    pub price_lesson: Option<f64>,
    pub interval: Option<String>,
    pub duration: Option<i32>,
    pub students: Option<i32>,
    pub joining_fee: Option<f64>,
}

/// Length of a plan in months. Unknown intervals count as monthly.
pub fn plan_months(interval: &str, duration: i32) -> i32 {
    let per_unit = match interval {
        "Quarter" => 3,
        "Year" => 12,
        _ => 1,
    };
    duration.max(1) * per_unit
}

/// Price spread evenly over the plan's months.
pub fn monthly_fee(price: f64, interval: &str, duration: i32) -> f64 {
    price / plan_months(interval, duration) as f64
}

impl PaymentPlan {
    pub fn months(&self) -> i32 {
        plan_months(&self.interval, self.duration)
    }

    pub fn monthly_fee(&self) -> f64 {
        monthly_fee(self.price, &self.interval, self.duration)
    }

    pub async fn create(pool: &PgPool, data: CreatePaymentPlanData) -> Result<Self, sqlx::Error> {
        let plan = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO payment_plans (
                title, price, price_lesson, interval, duration, students, joining_fee, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&data.title)
        .bind(data.price)
        .bind(data.price_lesson)
        .bind(&data.interval)
        .bind(data.duration)
        .bind(data.students)
        .bind(data.joining_fee)
        .bind(data.created_by)
        .fetch_one(pool)
        .await?;

        Ok(plan)
    }

    pub async fn find_in_scope(
        pool: &PgPool,
        id: Uuid,
        scope: &[Uuid],
    ) -> Result<Option<Self>, sqlx::Error> {
        let plan = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM payment_plans
            WHERE id = $1 AND created_by = ANY($2) AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(scope)
        .fetch_optional(pool)
        .await?;

        Ok(plan)
    }

    pub async fn list_in_scope(pool: &PgPool, scope: &[Uuid]) -> Result<Vec<Self>, sqlx::Error> {
        let plans = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM payment_plans
            WHERE created_by = ANY($1) AND deleted_at IS NULL
            ORDER BY price ASC
            "#,
        )
        .bind(scope)
        .fetch_all(pool)
        .await?;

        Ok(plans)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdatePaymentPlanData,
    ) -> Result<Self, sqlx::Error> {
        let plan = sqlx::query_as::<_, Self>(
            r#"
            UPDATE payment_plans
            SET
                title = COALESCE($2, title),
                price = COALESCE($3, price),
                price_lesson = COALESCE($4, price_lesson),
                interval = COALESCE($5, interval),
                duration = COALESCE($6, duration),
                students = COALESCE($7, students),
                joining_fee = COALESCE($8, joining_fee),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.title)
        .bind(data.price)
        .bind(data.price_lesson)
        .bind(data.interval)
        .bind(data.duration)
        .bind(data.students)
        .bind(data.joining_fee)
        .fetch_one(pool)
        .await?;

        Ok(plan)
    }

    pub async fn soft_delete(pool: &PgPool, id: Uuid, deleted_by: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE payment_plans
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

    #[test]
    fn test_plan_months() {
        assert_eq!(plan_months("Month", 1), 1);
        assert_eq!(plan_months("Month", 6), 6);
        assert_eq!(plan_months("Quarter", 2), 6);
        assert_eq!(plan_months("Year", 1), 12);
        assert_eq!(plan_months("Fortnight", 3), 3);
        assert_eq!(plan_months("Year", 0), 12);
    }

    #[test]
    fn test_monthly_fee() {
        assert_eq!(monthly_fee(120.0, "Year", 1), 10.0);
        assert_eq!(monthly_fee(90.0, "Quarter", 1), 30.0);
        assert_eq!(monthly_fee(45.0, "Month", 1), 45.0);
    }
}
