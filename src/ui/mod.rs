// Server-rendered pages: Askama templates, form handlers and flash messages

mod dashboard;
mod flash;
mod invoices;
mod orders;
mod products;
mod staff;
mod templates;

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::api::AppError;
use crate::AppState;

pub use flash::{clear_consumed_flash, redirect_with_flash, Flash, Flashes, FLASH_COOKIE};
pub use templates::*;

// Helper to render templates and handle errors
fn render_template<T: Template>(template: T) -> Response {
    render_with_status(StatusCode::OK, template)
}

fn render_with_status<T: Template>(status: StatusCode, template: T) -> Response {
    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Template rendering failed");
            AppError::internal("Failed to render page").into_response()
        }
    }
}

/// Pages for every signed-in user
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(dashboard::home))
        .route("/staff/dashboard", get(dashboard::staff_dashboard))
        .route("/staff/orders", get(orders::staff_orders))
        .route(
            "/staff/orders/:id/edit",
            get(orders::staff_edit_form).post(orders::staff_edit_submit),
        )
        .route("/orders/new", get(orders::new_order_form).post(orders::create_order_submit))
        .route(
            "/orders/:id/add-products",
            get(orders::add_products_form).post(orders::add_products_submit),
        )
        .route("/orders/:id/invoice", get(invoices::invoice_page))
        .route("/orders/:id/invoice/download", get(invoices::invoice_download))
}

/// Admin pages, mounted under `/admin` behind the admin check
pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dashboard", get(dashboard::admin_dashboard))
        .route("/staff", get(staff::manage_staff).post(staff::add_staff))
        .route("/staff/:id/toggle", post(staff::toggle_staff))
        .route("/products", get(products::manage_products).post(products::add_product))
        .route(
            "/products/bulk-add",
            get(products::bulk_add_form).post(products::bulk_add_submit),
        )
        .route(
            "/products/:id/edit",
            get(products::edit_product_form).post(products::edit_product_submit),
        )
        .route("/products/:id/toggle", post(products::toggle_product))
        .route("/orders", get(orders::admin_orders))
        .route(
            "/orders/:id/edit",
            get(orders::admin_edit_form).post(orders::admin_edit_submit),
        )
        .route("/orders/:id/status", post(orders::update_status))
        .route("/orders/:id/packing-slip", get(invoices::packing_slip_page))
        .route(
            "/orders/:id/packing-slip/download",
            get(invoices::packing_slip_download),
        )
}
