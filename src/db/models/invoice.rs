//! Invoice records.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub id: String,
    /// Sequential, e.g. `INV-00042`
    pub invoice_number: String,
    pub order_id: String,
    pub generated_at: String,
}

impl Invoice {
    /// Generation date as `DD-MM-YYYY`
    pub fn date_display(&self) -> String {
        chrono::DateTime::parse_from_rfc3339(&self.generated_at)
            .map(|d| d.format("%d-%m-%Y").to_string())
            .unwrap_or_else(|_| self.generated_at.clone())
    }
}

/// Number for the invoice following `existing` issued invoices
pub fn invoice_number_for(existing: i64) -> String {
    format!("INV-{:05}", existing + 1)
}

/// Return the order's invoice, allocating the next number when it has none.
///
/// Run inside the caller's write transaction so numbering stays sequential.
pub async fn ensure_invoice(conn: &mut SqliteConnection, order_id: &str) -> Result<Invoice, sqlx::Error> {
    let existing = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE order_id = ?")
        .bind(order_id)
        .fetch_optional(&mut *conn)
        .await?;
    if let Some(invoice) = existing {
        return Ok(invoice);
    }

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices")
        .fetch_one(&mut *conn)
        .await?;

    let invoice = Invoice {
        id: uuid::Uuid::new_v4().to_string(),
        invoice_number: invoice_number_for(count),
        order_id: order_id.to_string(),
        generated_at: chrono::Utc::now().to_rfc3339(),
    };

    sqlx::query("INSERT INTO invoices (id, invoice_number, order_id, generated_at) VALUES (?, ?, ?, ?)")
        .bind(&invoice.id)
        .bind(&invoice.invoice_number)
        .bind(&invoice.order_id)
        .bind(&invoice.generated_at)
        .execute(&mut *conn)
        .await?;

    Ok(invoice)
}
