use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::Response,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use super::flash::redirect_success;
use super::{
    render_template, render_with_status, BulkAddTemplate, BulkCountOption, EditProductTemplate, Flashes,
    ManageProductsTemplate, PageContext,
};
use crate::api::AppError;
use crate::catalog::{
    bulk_add, create_product, edit_product, toggle_availability, BulkRow, CatalogError, ProductInput,
    UploadedImage, BULK_ROW_COUNTS,
};
use crate::db::{get_product, search_products, User};
use crate::AppState;

const PRODUCTS_PAGE: &str = "/admin/products";
const DEFAULT_BULK_ROWS: usize = 5;

/// Text fields and image parts of a product form
#[derive(Debug, Default)]
struct ProductSubmission {
    fields: HashMap<String, String>,
    images: HashMap<String, UploadedImage>,
}

impl ProductSubmission {
    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut submission = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = match field.name() {
                Some(name) => name.to_string(),
                None => continue,
            };

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field.bytes().await?;
                    // Browsers send an empty part when no file was chosen
                    if !file_name.is_empty() && !bytes.is_empty() {
                        submission.images.insert(
                            name,
                            UploadedImage {
                                file_name,
                                bytes: bytes.to_vec(),
                            },
                        );
                    }
                }
                None => {
                    let value = field.text().await?;
                    submission.fields.insert(name, value);
                }
            }
        }

        Ok(submission)
    }

    fn text(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    /// Product fields named `product_code{suffix}`, `name{suffix}`, ...
    fn product_input(&self, suffix: &str) -> ProductInput {
        ProductInput {
            product_code: self.text(&format!("product_code{}", suffix)),
            name: self.text(&format!("name{}", suffix)),
            rental_price: self.text(&format!("rental_price{}", suffix)),
            deposit_amount: self.text(&format!("deposit_amount{}", suffix)),
        }
    }

    fn image(&self, name: &str) -> Option<&UploadedImage> {
        self.images.get(name)
    }

    fn bulk_rows(&self, count: usize) -> Vec<BulkRow> {
        (0..count)
            .map(|i| BulkRow {
                input: self.product_input(&format!("_{}", i)),
                image: self.image(&format!("image_{}", i)).cloned(),
            })
            .collect()
    }
}

/// Row count offered by the bulk form, defaulting to five rows
fn bulk_row_count(requested: Option<usize>) -> usize {
    requested
        .filter(|n| BULK_ROW_COUNTS.contains(n))
        .unwrap_or(DEFAULT_BULK_ROWS)
}

fn count_options(selected: usize) -> Vec<BulkCountOption> {
    BULK_ROW_COUNTS
        .iter()
        .map(|&count| BulkCountOption {
            count,
            selected: count == selected,
        })
        .collect()
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductSearch {
    #[serde(default)]
    pub search: String,
}

async fn products_page(
    state: &AppState,
    page: PageContext,
    search: String,
    form: ProductInput,
    status: StatusCode,
) -> Result<Response, AppError> {
    let products = search_products(&state.db, Some(&search), false).await?;
    Ok(render_with_status(
        status,
        ManageProductsTemplate {
            page,
            products,
            search,
            form,
        },
    ))
}

pub async fn manage_products(
    State(state): State<Arc<AppState>>,
    user: User,
    flashes: Flashes,
    Query(query): Query<ProductSearch>,
) -> Result<Response, AppError> {
    let page = PageContext::new(&state, user, flashes);
    products_page(&state, page, query.search, ProductInput::default(), StatusCode::OK).await
}

pub async fn add_product(
    State(state): State<Arc<AppState>>,
    user: User,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let submission = ProductSubmission::read(multipart).await?;
    let input = submission.product_input("");

    match create_product(&state.db, &state.images, &input, submission.image("image")).await {
        Ok(product) => Ok(redirect_success(
            PRODUCTS_PAGE,
            format!("Product {} added successfully", product.product_code),
        )),
        Err(e) if e.is_user_error() => {
            let page = PageContext::new(&state, user, Flashes::default()).with_errors(e.messages());
            products_page(&state, page, String::new(), input, StatusCode::UNPROCESSABLE_ENTITY).await
        }
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct BulkQuery {
    pub count: Option<usize>,
}

pub async fn bulk_add_form(
    State(state): State<Arc<AppState>>,
    user: User,
    flashes: Flashes,
    Query(query): Query<BulkQuery>,
) -> Response {
    let count = bulk_row_count(query.count);
    render_template(BulkAddTemplate {
        page: PageContext::new(&state, user, flashes),
        counts: count_options(count),
        rows: vec![ProductInput::default(); count],
    })
}

pub async fn bulk_add_submit(
    State(state): State<Arc<AppState>>,
    user: User,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let submission = ProductSubmission::read(multipart).await?;
    let count = bulk_row_count(submission.text("count").trim().parse().ok());
    let rows = submission.bulk_rows(count);

    match bulk_add(&state.db, &state.images, &rows).await {
        Ok(created) => Ok(redirect_success(
            PRODUCTS_PAGE,
            format!("{} products added successfully", created),
        )),
        Err(e) if e.is_user_error() => Ok(render_with_status(
            StatusCode::UNPROCESSABLE_ENTITY,
            BulkAddTemplate {
                page: PageContext::new(&state, user, Flashes::default()).with_errors(e.messages()),
                counts: count_options(count),
                rows: rows.into_iter().map(|row| row.input).collect(),
            },
        )),
        Err(e) => Err(e.into()),
    }
}

pub async fn edit_product_form(
    State(state): State<Arc<AppState>>,
    user: User,
    flashes: Flashes,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let product = get_product(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;

    Ok(render_template(EditProductTemplate {
        page: PageContext::new(&state, user, flashes),
        form: ProductInput::from(&product),
        product,
    }))
}

pub async fn edit_product_submit(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let submission = ProductSubmission::read(multipart).await?;
    let input = submission.product_input("");

    match edit_product(&state.db, &state.images, &id, &input, submission.image("image")).await {
        Ok(product) => Ok(redirect_success(
            PRODUCTS_PAGE,
            format!("Product {} updated successfully", product.product_code),
        )),
        Err(e) if e.is_user_error() => {
            let product = get_product(&state.db, &id)
                .await?
                .ok_or_else(|| AppError::not_found("Product not found"))?;
            Ok(render_with_status(
                StatusCode::UNPROCESSABLE_ENTITY,
                EditProductTemplate {
                    page: PageContext::new(&state, user, Flashes::default()).with_errors(e.messages()),
                    product,
                    form: input,
                },
            ))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn toggle_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let product = toggle_availability(&state.db, &id).await.map_err(|e| match e {
        CatalogError::NotFound => AppError::not_found("Product not found"),
        other => other.into(),
    })?;

    let availability = if product.is_active { "available" } else { "unavailable" };
    Ok(redirect_success(
        PRODUCTS_PAGE,
        format!("Product {} is now {}", product.product_code, availability),
    ))
}
