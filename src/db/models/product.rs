//! Rental catalog models.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Sqlite, SqliteConnection, SqlitePool};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: String,
    pub product_code: String,
    pub name: String,
    /// Price for one rental of the garment
    pub rental_price: f64,
    pub deposit_amount: f64,
    /// Relative to the data directory, e.g. `uploads/LH-01_front.jpg`
    pub image_path: Option<String>,
    /// Availability flag; inactive products cannot be booked
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Product {
    /// URL of the product image, empty when there is none
    pub fn image_url(&self) -> String {
        self.image_path
            .as_ref()
            .map(|p| format!("/{}", p))
            .unwrap_or_default()
    }

    pub fn has_image(&self) -> bool {
        self.image_path.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub product_code: String,
    pub name: String,
    pub rental_price: f64,
    pub deposit_amount: f64,
    pub image_path: Option<String>,
}

/// Edit of an existing product. `image_path` replaces the stored image only
/// when set.
#[derive(Debug, Clone)]
pub struct ProductChanges {
    pub product_code: String,
    pub name: String,
    pub rental_price: f64,
    pub deposit_amount: f64,
    pub image_path: Option<String>,
}

pub async fn get_product(db: &SqlitePool, id: &str) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await
}

/// Load a product on an open connection, e.g. inside a transaction
pub async fn fetch_product(conn: &mut SqliteConnection, id: &str) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn find_product_by_code(db: &SqlitePool, code: &str) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE product_code = ? COLLATE NOCASE")
        .bind(code)
        .fetch_optional(db)
        .await
}

/// Check whether a product code is taken, ignoring case and optionally one product
pub async fn product_code_exists(
    db: &SqlitePool,
    code: &str,
    exclude_id: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM products WHERE product_code = ? COLLATE NOCASE AND id != COALESCE(?, '')",
    )
    .bind(code)
    .bind(exclude_id)
    .fetch_one(db)
    .await?;
    Ok(count > 0)
}

pub async fn insert_product<'e, E>(executor: E, product: &NewProduct) -> Result<String, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO products (id, product_code, name, rental_price, deposit_amount, image_path, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&product.product_code)
    .bind(&product.name)
    .bind(product.rental_price)
    .bind(product.deposit_amount)
    .bind(&product.image_path)
    .bind(&now)
    .bind(&now)
    .execute(executor)
    .await?;

    Ok(id)
}

pub async fn update_product(
    db: &SqlitePool,
    id: &str,
    changes: &ProductChanges,
) -> Result<bool, sqlx::Error> {
    let now = chrono::Utc::now().to_rfc3339();
    let result = sqlx::query(
        r#"
        UPDATE products
        SET product_code = ?, name = ?, rental_price = ?, deposit_amount = ?,
            image_path = COALESCE(?, image_path), updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&changes.product_code)
    .bind(&changes.name)
    .bind(changes.rental_price)
    .bind(changes.deposit_amount)
    .bind(&changes.image_path)
    .bind(&now)
    .bind(id)
    .execute(db)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn toggle_product_active(db: &SqlitePool, id: &str) -> Result<Option<Product>, sqlx::Error> {
    let now = chrono::Utc::now().to_rfc3339();
    let result = sqlx::query(
        "UPDATE products SET is_active = NOT is_active, updated_at = ? WHERE id = ?",
    )
    .bind(&now)
    .bind(id)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_product(db, id).await
}

/// Case-insensitive substring match on code or name
pub async fn search_products(
    db: &SqlitePool,
    search: Option<&str>,
    active_only: bool,
) -> Result<Vec<Product>, sqlx::Error> {
    let mut conditions = Vec::new();
    let mut bindings: Vec<String> = Vec::new();

    if let Some(term) = search.map(str::trim).filter(|s| !s.is_empty()) {
        conditions.push("(product_code LIKE ? ESCAPE '\\' OR name LIKE ? ESCAPE '\\')");
        let pattern = like_pattern(term);
        bindings.push(pattern.clone());
        bindings.push(pattern);
    }

    if active_only {
        conditions.push("is_active = 1");
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let sql = format!("SELECT * FROM products {} ORDER BY product_code", where_clause);
    let mut query = sqlx::query_as::<_, Product>(&sql);
    for binding in &bindings {
        query = query.bind(binding);
    }
    query.fetch_all(db).await
}

/// Build a `LIKE` pattern matching `term` anywhere, with wildcards escaped
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_in_memory;

    fn product(code: &str, name: &str) -> NewProduct {
        NewProduct {
            product_code: code.to_string(),
            name: name.to_string(),
            rental_price: 1500.0,
            deposit_amount: 500.0,
            image_path: None,
        }
    }

    #[tokio::test]
    async fn test_search_matches_code_or_name() {
        let db = init_in_memory().await.unwrap();
        insert_product(&db, &product("LH-101", "Red Lehenga")).await.unwrap();
        insert_product(&db, &product("SH-201", "Ivory Sherwani")).await.unwrap();
        insert_product(&db, &product("GW-301", "Lehenga Gown")).await.unwrap();

        let by_name = search_products(&db, Some("lehenga"), false).await.unwrap();
        let codes: Vec<_> = by_name.iter().map(|p| p.product_code.as_str()).collect();
        assert_eq!(codes, vec!["GW-301", "LH-101"]);

        let by_code = search_products(&db, Some("sh-2"), false).await.unwrap();
        assert_eq!(by_code.len(), 1);
        assert_eq!(by_code[0].name, "Ivory Sherwani");

        let all = search_products(&db, Some("  "), false).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_search_treats_wildcards_literally() {
        let db = init_in_memory().await.unwrap();
        insert_product(&db, &product("LH_1", "Plain")).await.unwrap();
        insert_product(&db, &product("LHX1", "Other")).await.unwrap();

        let found = search_products(&db, Some("H_"), false).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].product_code, "LH_1");
    }

    #[tokio::test]
    async fn test_toggle_hides_from_active_search() {
        let db = init_in_memory().await.unwrap();
        let id = insert_product(&db, &product("LH-101", "Red Lehenga")).await.unwrap();

        let toggled = toggle_product_active(&db, &id).await.unwrap().unwrap();
        assert!(!toggled.is_active);
        assert!(search_products(&db, None, true).await.unwrap().is_empty());
        assert!(toggle_product_active(&db, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_code_exists_respects_exclusion() {
        let db = init_in_memory().await.unwrap();
        let id = insert_product(&db, &product("LH-101", "Red Lehenga")).await.unwrap();

        assert!(product_code_exists(&db, "LH-101", None).await.unwrap());
        assert!(!product_code_exists(&db, "LH-101", Some(&id)).await.unwrap());
        assert!(!product_code_exists(&db, "LH-999", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_keeps_image_when_not_replaced() {
        let db = init_in_memory().await.unwrap();
        let mut new = product("LH-101", "Red Lehenga");
        new.image_path = Some("uploads/LH-101_a.jpg".to_string());
        let id = insert_product(&db, &new).await.unwrap();

        let changes = ProductChanges {
            product_code: "LH-101".to_string(),
            name: "Crimson Lehenga".to_string(),
            rental_price: 1800.0,
            deposit_amount: 600.0,
            image_path: None,
        };
        assert!(update_product(&db, &id, &changes).await.unwrap());

        let stored = get_product(&db, &id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Crimson Lehenga");
        assert_eq!(stored.image_url(), "/uploads/LH-101_a.jpg");
    }
}
