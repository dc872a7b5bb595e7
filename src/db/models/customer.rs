//! Customer models.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub secondary_phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub created_at: String,
}

/// Contact details captured on the order form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerDetails {
    pub name: String,
    pub phone: String,
    pub secondary_phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

/// Find the customer by phone and refresh their details, or create one.
pub async fn upsert_customer_by_phone(
    conn: &mut SqliteConnection,
    details: &CustomerDetails,
) -> Result<String, sqlx::Error> {
    let existing: Option<String> =
        sqlx::query_scalar("SELECT id FROM customers WHERE phone = ? ORDER BY created_at LIMIT 1")
            .bind(&details.phone)
            .fetch_optional(&mut *conn)
            .await?;

    if let Some(id) = existing {
        update_customer(conn, &id, details).await?;
        return Ok(id);
    }

    let id = uuid::Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO customers (id, name, phone, secondary_phone, email, address, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&details.name)
    .bind(&details.phone)
    .bind(&details.secondary_phone)
    .bind(&details.email)
    .bind(&details.address)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(&mut *conn)
    .await?;

    Ok(id)
}

pub async fn update_customer(
    conn: &mut SqliteConnection,
    id: &str,
    details: &CustomerDetails,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE customers
        SET name = ?, phone = ?, secondary_phone = ?, email = ?, address = ?
        WHERE id = ?
        "#,
    )
    .bind(&details.name)
    .bind(&details.phone)
    .bind(&details.secondary_phone)
    .bind(&details.email)
    .bind(&details.address)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
