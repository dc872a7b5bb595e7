//! Rental order models: orders, their lines, and booking lookups.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool};

use super::customer::Customer;
use super::invoice::Invoice;
use super::product::like_pattern;

/// Order lifecycle. Moves forward one step at a time and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Approved,
    Completed,
}

impl OrderStatus {
    /// Statuses whose orders hold their products for the rental window
    pub const OPEN: [OrderStatus; 2] = [OrderStatus::Pending, OrderStatus::Approved];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Approved => "approved",
            OrderStatus::Completed => "completed",
        }
    }

    /// The only status this one may move to
    pub fn next(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Approved),
            OrderStatus::Approved => Some(OrderStatus::Completed),
            OrderStatus::Completed => None,
        }
    }

    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        self.next() == Some(target)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "approved" => Ok(OrderStatus::Approved),
            "completed" => Ok(OrderStatus::Completed),
            _ => Err(format!("Unknown order status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: String,
    pub transaction_id: String,
    pub customer_id: String,
    pub staff_id: String,
    /// `YYYY-MM-DD`
    pub delivery_date: String,
    /// `YYYY-MM-DD`
    pub return_date: String,
    pub status: String,
    pub total_amount: f64,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Order {
    pub fn status_enum(&self) -> OrderStatus {
        self.status.parse().unwrap_or(OrderStatus::Pending)
    }

    pub fn is_pending(&self) -> bool {
        self.status_enum() == OrderStatus::Pending
    }
}

/// One row of an order listing
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderSummary {
    pub id: String,
    pub transaction_id: String,
    pub status: String,
    pub delivery_date: String,
    pub return_date: String,
    pub total_amount: f64,
    pub created_at: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub staff_id: String,
    pub staff_name: String,
    pub invoice_number: Option<String>,
    pub product_codes: Option<String>,
}

impl OrderSummary {
    pub fn products_display(&self) -> String {
        self.product_codes.clone().unwrap_or_else(|| "-".to_string())
    }

    pub fn invoice_display(&self) -> String {
        self.invoice_number.clone().unwrap_or_else(|| "-".to_string())
    }

    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending.as_str()
    }

    /// Label of the forward transition available from this row, if any
    pub fn next_status(&self) -> String {
        self.status
            .parse::<OrderStatus>()
            .ok()
            .and_then(|s| s.next())
            .map(|s| s.as_str().to_string())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItemDetail {
    pub id: String,
    pub product_id: String,
    pub product_code: String,
    pub product_name: String,
    /// Line price captured when the product was added
    pub price: f64,
    pub image_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderAccessory {
    pub id: String,
    pub order_id: String,
    pub accessory_name: String,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderExtraCharge {
    pub id: String,
    pub order_id: String,
    pub description: String,
    pub amount: f64,
    pub remarks: Option<String>,
}

/// An order with everything needed to display or print it
#[derive(Debug, Clone)]
pub struct OrderDetail {
    pub order: Order,
    pub customer: Customer,
    pub staff_name: String,
    pub staff_role: String,
    pub items: Vec<OrderItemDetail>,
    pub accessories: Vec<OrderAccessory>,
    pub extra_charges: Vec<OrderExtraCharge>,
    pub invoice: Option<Invoice>,
}

/// An open order that already holds a product
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Booking {
    pub order_id: String,
    pub transaction_id: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub delivery_date: String,
    pub return_date: String,
    pub status: String,
}

/// Filters for order listings. Text filters are substring matches.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub product_code: Option<String>,
    pub customer: Option<String>,
    /// Matches orders delivered or returned on this `YYYY-MM-DD` date
    pub date: Option<String>,
    pub staff_name: Option<String>,
    pub limit: Option<i64>,
}

/// Row values for a new order
#[derive(Debug, Clone)]
pub struct NewOrder<'a> {
    pub transaction_id: &'a str,
    pub customer_id: &'a str,
    pub staff_id: &'a str,
    pub delivery_date: &'a str,
    pub return_date: &'a str,
    pub notes: Option<&'a str>,
}

pub async fn get_order(db: &SqlitePool, id: &str) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn load_order_detail(db: &SqlitePool, id: &str) -> Result<Option<OrderDetail>, sqlx::Error> {
    let order = match get_order(db, id).await? {
        Some(order) => order,
        None => return Ok(None),
    };

    let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = ?")
        .bind(&order.customer_id)
        .fetch_one(db)
        .await?;

    let (staff_name, staff_role): (String, String) =
        sqlx::query_as("SELECT name, role FROM users WHERE id = ?")
            .bind(&order.staff_id)
            .fetch_one(db)
            .await?;

    let items = sqlx::query_as::<_, OrderItemDetail>(
        r#"
        SELECT oi.id, oi.product_id, p.product_code, p.name AS product_name, oi.price, p.image_path
        FROM order_items oi
        JOIN products p ON p.id = oi.product_id
        WHERE oi.order_id = ?
        ORDER BY p.product_code
        "#,
    )
    .bind(id)
    .fetch_all(db)
    .await?;

    let accessories = sqlx::query_as::<_, OrderAccessory>(
        "SELECT * FROM order_accessories WHERE order_id = ? ORDER BY rowid",
    )
    .bind(id)
    .fetch_all(db)
    .await?;

    let extra_charges = sqlx::query_as::<_, OrderExtraCharge>(
        "SELECT * FROM order_extra_charges WHERE order_id = ? ORDER BY rowid",
    )
    .bind(id)
    .fetch_all(db)
    .await?;

    let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE order_id = ?")
        .bind(id)
        .fetch_optional(db)
        .await?;

    Ok(Some(OrderDetail {
        order,
        customer,
        staff_name,
        staff_role,
        items,
        accessories,
        extra_charges,
        invoice,
    }))
}

/// List orders newest first
pub async fn list_orders(db: &SqlitePool, filter: &OrderFilter) -> Result<Vec<OrderSummary>, sqlx::Error> {
    let mut conditions: Vec<&str> = Vec::new();
    let mut bindings: Vec<String> = Vec::new();

    if let Some(code) = non_empty(&filter.product_code) {
        conditions.push(
            r#"EXISTS (
                SELECT 1 FROM order_items oi JOIN products p ON p.id = oi.product_id
                WHERE oi.order_id = o.id AND p.product_code LIKE ? ESCAPE '\'
            )"#,
        );
        bindings.push(like_pattern(code));
    }

    if let Some(customer) = non_empty(&filter.customer) {
        conditions.push("(c.name LIKE ? ESCAPE '\\' OR c.phone LIKE ? ESCAPE '\\')");
        let pattern = like_pattern(customer);
        bindings.push(pattern.clone());
        bindings.push(pattern);
    }

    if let Some(date) = non_empty(&filter.date) {
        conditions.push("(o.delivery_date = ? OR o.return_date = ?)");
        bindings.push(date.to_string());
        bindings.push(date.to_string());
    }

    if let Some(staff) = non_empty(&filter.staff_name) {
        conditions.push("u.name LIKE ? ESCAPE '\\'");
        bindings.push(like_pattern(staff));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let limit_clause = match filter.limit {
        Some(limit) => format!("LIMIT {}", limit.max(0)),
        None => String::new(),
    };

    let sql = format!(
        r#"
        SELECT o.id, o.transaction_id, o.status, o.delivery_date, o.return_date, o.total_amount,
               o.created_at, c.name AS customer_name, c.phone AS customer_phone,
               o.staff_id, u.name AS staff_name, i.invoice_number,
               (SELECT GROUP_CONCAT(p.product_code, ', ')
                FROM order_items oi JOIN products p ON p.id = oi.product_id
                WHERE oi.order_id = o.id) AS product_codes
        FROM orders o
        JOIN customers c ON c.id = o.customer_id
        JOIN users u ON u.id = o.staff_id
        LEFT JOIN invoices i ON i.order_id = o.id
        {}
        ORDER BY o.created_at DESC
        {}
        "#,
        where_clause, limit_clause
    );

    let mut query = sqlx::query_as::<_, OrderSummary>(&sql);
    for binding in &bindings {
        query = query.bind(binding);
    }
    query.fetch_all(db).await
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

pub async fn insert_order(conn: &mut SqliteConnection, order: &NewOrder<'_>) -> Result<String, sqlx::Error> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO orders (id, transaction_id, customer_id, staff_id, delivery_date, return_date,
                            status, total_amount, notes, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, 'pending', 0, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(order.transaction_id)
    .bind(order.customer_id)
    .bind(order.staff_id)
    .bind(order.delivery_date)
    .bind(order.return_date)
    .bind(order.notes)
    .bind(&now)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    Ok(id)
}

pub async fn update_order_schedule(
    conn: &mut SqliteConnection,
    id: &str,
    delivery_date: &str,
    return_date: &str,
    notes: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE orders SET delivery_date = ?, return_date = ?, notes = ?, updated_at = ? WHERE id = ?",
    )
    .bind(delivery_date)
    .bind(return_date)
    .bind(notes)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Remove every item, accessory and extra charge of an order
pub async fn clear_order_lines(conn: &mut SqliteConnection, order_id: &str) -> Result<(), sqlx::Error> {
    for table in ["order_items", "order_accessories", "order_extra_charges"] {
        sqlx::query(&format!("DELETE FROM {} WHERE order_id = ?", table))
            .bind(order_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

pub async fn insert_order_item(
    conn: &mut SqliteConnection,
    order_id: &str,
    product_id: &str,
    price: f64,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO order_items (id, order_id, product_id, price) VALUES (?, ?, ?, ?)")
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(order_id)
        .bind(product_id)
        .bind(price)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn insert_order_accessory(
    conn: &mut SqliteConnection,
    order_id: &str,
    name: &str,
    remarks: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO order_accessories (id, order_id, accessory_name, remarks) VALUES (?, ?, ?, ?)",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(order_id)
    .bind(name)
    .bind(remarks)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn insert_order_extra_charge(
    conn: &mut SqliteConnection,
    order_id: &str,
    description: &str,
    amount: f64,
    remarks: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO order_extra_charges (id, order_id, description, amount, remarks) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(order_id)
    .bind(description)
    .bind(amount)
    .bind(remarks)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn order_has_product(
    conn: &mut SqliteConnection,
    order_id: &str,
    product_id: &str,
) -> Result<bool, sqlx::Error> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM order_items WHERE order_id = ? AND product_id = ?")
            .bind(order_id)
            .bind(product_id)
            .fetch_one(&mut *conn)
            .await?;
    Ok(count > 0)
}

/// Recompute the stored total from the order's lines and return it.
///
/// The total is items plus extra charges; it is never taken from a form.
pub async fn recalculate_order_total(conn: &mut SqliteConnection, order_id: &str) -> Result<f64, sqlx::Error> {
    let total: f64 = sqlx::query_scalar(
        r#"
        SELECT
            COALESCE((SELECT SUM(price) FROM order_items WHERE order_id = ?1), 0.0)
          + COALESCE((SELECT SUM(amount) FROM order_extra_charges WHERE order_id = ?1), 0.0)
        "#,
    )
    .bind(order_id)
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query("UPDATE orders SET total_amount = ?, updated_at = ? WHERE id = ?")
        .bind(total)
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(order_id)
        .execute(&mut *conn)
        .await?;

    Ok(total)
}

/// Find an open order holding `product_id` whose rental window overlaps
/// `[delivery_date, return_date]` (inclusive), skipping `exclude_order_id`.
pub async fn find_booking_conflict(
    conn: &mut SqliteConnection,
    product_id: &str,
    delivery_date: &str,
    return_date: &str,
    exclude_order_id: Option<&str>,
) -> Result<Option<Booking>, sqlx::Error> {
    let mut query = sqlx::query_as::<_, Booking>(
        r#"
        SELECT o.id AS order_id, o.transaction_id, c.name AS customer_name, c.phone AS customer_phone,
               o.delivery_date, o.return_date, o.status
        FROM order_items oi
        JOIN orders o ON o.id = oi.order_id
        JOIN customers c ON c.id = o.customer_id
        WHERE oi.product_id = ?
          AND o.delivery_date <= ?
          AND o.return_date >= ?
          AND o.id != COALESCE(?, '')
          AND o.status IN (?, ?)
        ORDER BY o.delivery_date
        LIMIT 1
        "#,
    )
    .bind(product_id)
    .bind(return_date)
    .bind(delivery_date)
    .bind(exclude_order_id);
    for status in OrderStatus::OPEN {
        query = query.bind(status.as_str());
    }
    query.fetch_optional(&mut *conn).await
}

/// All open orders holding a product, earliest delivery first
pub async fn open_bookings_for_product(db: &SqlitePool, product_id: &str) -> Result<Vec<Booking>, sqlx::Error> {
    let mut query = sqlx::query_as::<_, Booking>(
        r#"
        SELECT o.id AS order_id, o.transaction_id, c.name AS customer_name, c.phone AS customer_phone,
               o.delivery_date, o.return_date, o.status
        FROM order_items oi
        JOIN orders o ON o.id = oi.order_id
        JOIN customers c ON c.id = o.customer_id
        WHERE oi.product_id = ? AND o.status IN (?, ?)
        ORDER BY o.delivery_date
        "#,
    )
    .bind(product_id);
    for status in OrderStatus::OPEN {
        query = query.bind(status.as_str());
    }
    query.fetch_all(db).await
}

pub async fn set_order_status(db: &SqlitePool, id: &str, status: OrderStatus) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE orders SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}
