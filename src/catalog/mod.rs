//! Product catalog: create, edit, availability and bulk add.

pub mod uploads;

use std::collections::HashSet;
use thiserror::Error;

use crate::api::error::AppError;
use crate::api::validation::{parse_amount, parse_optional_amount, validate_product_code, validate_required};
use crate::db::{
    get_product, insert_product, product_code_exists, toggle_product_active, update_product, DbPool,
    NewProduct, Product, ProductChanges,
};
pub use uploads::{ImageStore, UploadError, UploadedImage};

/// Row counts offered by the bulk add form
pub const BULK_ROW_COUNTS: [usize; 5] = [1, 2, 3, 5, 10];

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{}", .0.join("; "))]
    Invalid(Vec<String>),

    #[error("Product code {0} already exists")]
    DuplicateCode(String),

    #[error("Product not found")]
    NotFound,

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl CatalogError {
    /// Errors the user can fix by correcting the form
    pub fn is_user_error(&self) -> bool {
        !matches!(
            self,
            CatalogError::Database(_) | CatalogError::NotFound | CatalogError::Upload(UploadError::Io(_))
        )
    }

    pub fn messages(&self) -> Vec<String> {
        match self {
            CatalogError::Invalid(messages) => messages.clone(),
            other => vec![other.to_string()],
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Database(e) => AppError::from(e),
            CatalogError::NotFound => AppError::not_found("Product not found"),
            CatalogError::DuplicateCode(code) => {
                AppError::conflict(format!("Product code {} already exists", code))
            }
            CatalogError::Upload(UploadError::Io(e)) => {
                tracing::error!(error = %e, "Image storage failed");
                AppError::internal("Failed to store image")
            }
            other => AppError::bad_request(other.to_string()),
        }
    }
}

/// Raw product fields as submitted by a form
#[derive(Debug, Clone, Default)]
pub struct ProductInput {
    pub product_code: String,
    pub name: String,
    pub rental_price: String,
    pub deposit_amount: String,
}

impl ProductInput {
    /// A bulk row with none of code, name or price filled in
    pub fn is_blank(&self) -> bool {
        self.product_code.trim().is_empty()
            && self.name.trim().is_empty()
            && self.rental_price.trim().is_empty()
    }
}

impl From<&Product> for ProductInput {
    fn from(product: &Product) -> Self {
        Self {
            product_code: product.product_code.clone(),
            name: product.name.clone(),
            rental_price: amount_field(product.rental_price),
            deposit_amount: amount_field(product.deposit_amount),
        }
    }
}

/// Amount as typed into a form: no decimals for whole rupees
fn amount_field(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{:.0}", amount)
    } else {
        format!("{:.2}", amount)
    }
}

/// Validated product fields
#[derive(Debug, Clone, PartialEq)]
pub struct ProductFields {
    pub product_code: String,
    pub name: String,
    pub rental_price: f64,
    pub deposit_amount: f64,
}

/// Validate a product form, collecting every problem
pub fn parse_product(input: &ProductInput) -> Result<ProductFields, Vec<String>> {
    let mut problems = Vec::new();

    if let Err(e) = validate_product_code(&input.product_code) {
        problems.push(e);
    }
    if let Err(e) = validate_required(&input.name, "Product name") {
        problems.push(e);
    }
    let rental_price = parse_amount(&input.rental_price, "Rental price")
        .map_err(|e| problems.push(e))
        .ok();
    let deposit_amount = parse_optional_amount(Some(input.deposit_amount.as_str()), "Deposit")
        .map_err(|e| problems.push(e))
        .ok();

    match (rental_price, deposit_amount) {
        (Some(rental_price), Some(deposit_amount)) if problems.is_empty() => Ok(ProductFields {
            product_code: input.product_code.trim().to_string(),
            name: input.name.trim().to_string(),
            rental_price,
            deposit_amount,
        }),
        _ => Err(problems),
    }
}

pub async fn create_product(
    db: &DbPool,
    store: &ImageStore,
    input: &ProductInput,
    image: Option<&UploadedImage>,
) -> Result<Product, CatalogError> {
    let fields = parse_product(input).map_err(CatalogError::Invalid)?;
    if let Some(image) = image {
        store.check(image)?;
    }

    if product_code_exists(db, &fields.product_code, None).await? {
        return Err(CatalogError::DuplicateCode(fields.product_code));
    }

    let image_path = match image {
        Some(image) => Some(store.save(&fields.product_code, image).await?),
        None => None,
    };

    let new_product = NewProduct {
        product_code: fields.product_code,
        name: fields.name,
        rental_price: fields.rental_price,
        deposit_amount: fields.deposit_amount,
        image_path,
    };

    let id = match insert_product(db, &new_product).await {
        Ok(id) => id,
        Err(e) => {
            if let Some(path) = &new_product.image_path {
                store.remove(path).await;
            }
            return Err(e.into());
        }
    };

    tracing::info!(code = %new_product.product_code, "Product created");
    get_product(db, &id).await?.ok_or(CatalogError::NotFound)
}

pub async fn edit_product(
    db: &DbPool,
    store: &ImageStore,
    id: &str,
    input: &ProductInput,
    image: Option<&UploadedImage>,
) -> Result<Product, CatalogError> {
    let existing = get_product(db, id).await?.ok_or(CatalogError::NotFound)?;
    let fields = parse_product(input).map_err(CatalogError::Invalid)?;
    if let Some(image) = image {
        store.check(image)?;
    }

    if product_code_exists(db, &fields.product_code, Some(&existing.id)).await? {
        return Err(CatalogError::DuplicateCode(fields.product_code));
    }

    let image_path = match image {
        Some(image) => Some(store.save(&fields.product_code, image).await?),
        None => None,
    };

    let changes = ProductChanges {
        product_code: fields.product_code,
        name: fields.name,
        rental_price: fields.rental_price,
        deposit_amount: fields.deposit_amount,
        image_path,
    };
    update_product(db, id, &changes).await?;

    tracing::info!(product_id = %id, code = %changes.product_code, "Product updated");
    get_product(db, id).await?.ok_or(CatalogError::NotFound)
}

/// Flip a product's availability and return it
pub async fn toggle_availability(db: &DbPool, id: &str) -> Result<Product, CatalogError> {
    let product = toggle_product_active(db, id)
        .await?
        .ok_or(CatalogError::NotFound)?;
    tracing::info!(code = %product.product_code, active = product.is_active, "Product availability changed");
    Ok(product)
}

/// One row of a bulk add submission
#[derive(Debug, Clone, Default)]
pub struct BulkRow {
    pub input: ProductInput,
    pub image: Option<UploadedImage>,
}

/// Create every filled-in row, or none of them.
///
/// Blank rows are ignored. Any invalid row, or a code that exists already
/// or repeats within the batch, rejects the whole batch with one message
/// per problem. Returns the number of products created.
pub async fn bulk_add(db: &DbPool, store: &ImageStore, rows: &[BulkRow]) -> Result<usize, CatalogError> {
    let mut problems = Vec::new();
    let mut accepted: Vec<(ProductFields, Option<&UploadedImage>)> = Vec::new();
    let mut seen_codes = HashSet::new();

    for (index, row) in rows.iter().enumerate() {
        if row.input.is_blank() {
            continue;
        }
        let label = format!("Row {}", index + 1);

        let fields = match parse_product(&row.input) {
            Ok(fields) => fields,
            Err(errors) => {
                problems.extend(errors.into_iter().map(|e| format!("{}: {}", label, e)));
                continue;
            }
        };

        if let Some(image) = &row.image {
            if let Err(e) = store.check(image) {
                problems.push(format!("{}: {}", label, e));
            }
        }

        if !seen_codes.insert(fields.product_code.to_lowercase()) {
            problems.push(format!(
                "{}: Product code {} is repeated in this batch",
                label, fields.product_code
            ));
        } else if product_code_exists(db, &fields.product_code, None).await? {
            problems.push(format!(
                "{}: Product code {} already exists",
                label, fields.product_code
            ));
        }

        accepted.push((fields, row.image.as_ref()));
    }

    if accepted.is_empty() && problems.is_empty() {
        problems.push("Fill in at least one product".to_string());
    }
    if !problems.is_empty() {
        tracing::warn!(problems = problems.len(), "Bulk add rejected");
        return Err(CatalogError::Invalid(problems));
    }

    let mut stored_images = Vec::new();
    let mut new_products = Vec::with_capacity(accepted.len());
    for (fields, image) in accepted {
        let image_path = match image {
            Some(image) => match store.save(&fields.product_code, image).await {
                Ok(path) => {
                    stored_images.push(path.clone());
                    Some(path)
                }
                Err(e) => {
                    remove_all(store, &stored_images).await;
                    return Err(e.into());
                }
            },
            None => None,
        };
        new_products.push(NewProduct {
            product_code: fields.product_code,
            name: fields.name,
            rental_price: fields.rental_price,
            deposit_amount: fields.deposit_amount,
            image_path,
        });
    }

    let result: Result<(), sqlx::Error> = async {
        let mut tx = db.begin().await?;
        for product in &new_products {
            insert_product(&mut *tx, product).await?;
        }
        tx.commit().await
    }
    .await;

    if let Err(e) = result {
        remove_all(store, &stored_images).await;
        return Err(e.into());
    }

    tracing::info!(count = new_products.len(), "Bulk added products");
    Ok(new_products.len())
}

async fn remove_all(store: &ImageStore, paths: &[String]) {
    for path in paths {
        store.remove(path).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_in_memory, search_products};

    fn input(code: &str, name: &str, price: &str) -> ProductInput {
        ProductInput {
            product_code: code.to_string(),
            name: name.to_string(),
            rental_price: price.to_string(),
            deposit_amount: String::new(),
        }
    }

    fn row(code: &str, name: &str, price: &str) -> BulkRow {
        BulkRow {
            input: input(code, name, price),
            image: None,
        }
    }

    async fn product_count(db: &DbPool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(db)
            .await
            .unwrap()
    }

    #[test]
    fn test_parse_product_collects_every_problem() {
        let problems = parse_product(&input("", "", "abc")).unwrap_err();
        assert_eq!(problems.len(), 3);

        let fields = parse_product(&input(" LH-01 ", "Lehenga", "1500")).unwrap();
        assert_eq!(fields.product_code, "LH-01");
        assert_eq!(fields.deposit_amount, 0.0);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_code() {
        let db = init_in_memory().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        create_product(&db, &store, &input("LH-01", "Lehenga", "1500"), None)
            .await
            .unwrap();
        let err = create_product(&db, &store, &input("LH-01", "Other", "900"), None)
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::DuplicateCode(_)));
        assert!(err.is_user_error());

        let err = create_product(&db, &store, &input("lh-01", "Other", "900"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateCode(_)));
        assert_eq!(product_count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_create_stores_image() {
        let db = init_in_memory().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path().join("uploads"));
        let image = UploadedImage {
            file_name: "front.jpg".to_string(),
            bytes: vec![1, 2, 3],
        };

        let product = create_product(&db, &store, &input("SH-7", "Sherwani", "2500"), Some(&image))
            .await
            .unwrap();

        assert_eq!(product.image_path.as_deref(), Some("uploads/SH-7_front.jpg"));
        assert_eq!(product.image_url(), "/uploads/SH-7_front.jpg");
        assert!(dir.path().join("uploads/SH-7_front.jpg").is_file());
    }

    #[tokio::test]
    async fn test_edit_cannot_take_another_code() {
        let db = init_in_memory().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        create_product(&db, &store, &input("LH-01", "Lehenga", "1500"), None)
            .await
            .unwrap();
        let gown = create_product(&db, &store, &input("GW-02", "Gown", "1200"), None)
            .await
            .unwrap();

        let err = edit_product(&db, &store, &gown.id, &input("LH-01", "Gown", "1200"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateCode(_)));

        let edited = edit_product(&db, &store, &gown.id, &input("GW-02", "Evening Gown", "1300"), None)
            .await
            .unwrap();
        assert_eq!(edited.name, "Evening Gown");
        assert_eq!(edited.rental_price, 1300.0);
    }

    #[tokio::test]
    async fn test_toggle_hides_product_from_active_search() {
        let db = init_in_memory().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        let product = create_product(&db, &store, &input("LH-01", "Lehenga", "1500"), None)
            .await
            .unwrap();
        let toggled = toggle_availability(&db, &product.id).await.unwrap();
        assert!(!toggled.is_active);
        assert!(search_products(&db, None, true).await.unwrap().is_empty());

        assert!(matches!(
            toggle_availability(&db, "missing").await,
            Err(CatalogError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_bulk_add_creates_every_valid_row() {
        let db = init_in_memory().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        let rows = vec![
            row("LH-01", "Lehenga", "1500"),
            row("", "", ""),
            row("LH-02", "Lehenga Red", "1800"),
            row("SH-01", "Sherwani", "2500"),
        ];

        assert_eq!(bulk_add(&db, &store, &rows).await.unwrap(), 3);
        assert_eq!(product_count(&db).await, 3);
    }

    #[tokio::test]
    async fn test_bulk_add_is_all_or_nothing() {
        let db = init_in_memory().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        let missing_name = vec![row("LH-01", "Lehenga", "1500"), row("LH-02", "", "1800")];
        let err = bulk_add(&db, &store, &missing_name).await.unwrap_err();
        assert_eq!(err.messages(), vec!["Row 2: Product name is required"]);
        assert_eq!(product_count(&db).await, 0);

        let repeated = vec![row("LH-01", "Lehenga", "1500"), row("lh-01", "Copy", "1500")];
        let err = bulk_add(&db, &store, &repeated).await.unwrap_err();
        assert!(err.messages()[0].contains("repeated"));
        assert_eq!(product_count(&db).await, 0);

        create_product(&db, &store, &input("SH-01", "Sherwani", "2500"), None)
            .await
            .unwrap();
        let existing = vec![row("LH-01", "Lehenga", "1500"), row("SH-01", "Sherwani", "2500")];
        let err = bulk_add(&db, &store, &existing).await.unwrap_err();
        assert!(err.messages()[0].contains("already exists"));
        assert_eq!(product_count(&db).await, 1);

        let other_case = vec![row("sh-01", "Sherwani copy", "2500")];
        let err = bulk_add(&db, &store, &other_case).await.unwrap_err();
        assert!(err.messages()[0].contains("already exists"));
        assert_eq!(product_count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_bulk_add_needs_one_row() {
        let db = init_in_memory().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        let err = bulk_add(&db, &store, &[row("", "", ""), BulkRow::default()])
            .await
            .unwrap_err();
        assert_eq!(err.messages(), vec!["Fill in at least one product"]);
    }
}
