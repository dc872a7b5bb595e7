//! Dashboard aggregates.

use serde::Serialize;
use sqlx::SqlitePool;

use super::order::OrderStatus;

/// Counters for the admin dashboard
#[derive(Debug, Clone, Default, Serialize)]
pub struct AdminStats {
    pub total_orders: i64,
    pub pending_orders: i64,
    pub approved_orders: i64,
    pub active_products: i64,
    pub active_staff: i64,
    pub monthly_revenue: f64,
}

/// Monthly figures for the staff dashboard
#[derive(Debug, Clone, Default, Serialize)]
pub struct MonthlyStats {
    pub orders: i64,
    pub revenue: f64,
}

/// `YYYY-MM` of the current UTC month
pub fn current_month() -> String {
    chrono::Utc::now().format("%Y-%m").to_string()
}

pub async fn admin_stats(db: &SqlitePool, month: &str) -> Result<AdminStats, sqlx::Error> {
    let total_orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(db)
        .await?;

    let pending_orders = count_orders_with_status(db, OrderStatus::Pending).await?;
    let approved_orders = count_orders_with_status(db, OrderStatus::Approved).await?;

    let active_products: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
        .fetch_one(db)
        .await?;

    let active_staff: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'staff' AND is_active = 1")
            .fetch_one(db)
            .await?;

    let monthly = monthly_stats(db, month, None).await?;

    Ok(AdminStats {
        total_orders,
        pending_orders,
        approved_orders,
        active_products,
        active_staff,
        monthly_revenue: monthly.revenue,
    })
}

async fn count_orders_with_status(db: &SqlitePool, status: OrderStatus) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE status = ?")
        .bind(status.as_str())
        .fetch_one(db)
        .await
}

/// Orders created in `month` and revenue from the approved or completed ones,
/// optionally restricted to one staff member
pub async fn monthly_stats(
    db: &SqlitePool,
    month: &str,
    staff_id: Option<&str>,
) -> Result<MonthlyStats, sqlx::Error> {
    let orders: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM orders
        WHERE substr(created_at, 1, 7) = ? AND (? IS NULL OR staff_id = ?)
        "#,
    )
    .bind(month)
    .bind(staff_id)
    .bind(staff_id)
    .fetch_one(db)
    .await?;

    let revenue: f64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(total_amount), 0.0) FROM orders
        WHERE substr(created_at, 1, 7) = ?
          AND status IN ('approved', 'completed')
          AND (? IS NULL OR staff_id = ?)
        "#,
    )
    .bind(month)
    .bind(staff_id)
    .bind(staff_id)
    .fetch_one(db)
    .await?;

    Ok(MonthlyStats { orders, revenue })
}
