// Askama template definitions

use askama::Template;
use serde::Deserialize;

use super::flash::{Flash, Flashes};
use crate::catalog::ProductInput;
use crate::config::BusinessConfig;
use crate::db::{AdminStats, Invoice, MonthlyStats, OrderDetail, OrderFilter, OrderSummary, Product, User};
use crate::invoice::SlipContent;
use crate::orders::OrderForm;
use crate::AppState;

/// Custom filters for Askama templates
mod filters {
    pub fn rupees(amount: &f64) -> ::askama::Result<String> {
        Ok(crate::utils::format_rupees(*amount))
    }

    pub fn date(value: &str) -> ::askama::Result<String> {
        Ok(crate::utils::display_date(value))
    }

    pub fn truncate(s: &str, len: usize) -> ::askama::Result<String> {
        if s.chars().count() <= len {
            Ok(s.to_string())
        } else {
            Ok(format!("{}...", s.chars().take(len).collect::<String>()))
        }
    }
}

/// What every signed-in page needs for the shared layout
pub struct PageContext {
    pub user: User,
    pub flashes: Vec<Flash>,
    pub business_name: String,
}

impl PageContext {
    pub fn new(state: &AppState, user: User, flashes: Flashes) -> Self {
        Self {
            user,
            flashes: flashes.into_vec(),
            business_name: state.config.business.name.clone(),
        }
    }

    /// Append error messages shown above a re-rendered form
    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.flashes.extend(Flash::errors(errors));
        self
    }
}

// Row count choice on the bulk add page
pub struct BulkCountOption {
    pub count: usize,
    pub selected: bool,
}

// Product offered on an order form
pub struct ProductChoice {
    pub product: Product,
    pub selected: bool,
}

pub struct AccessoryRow {
    pub name: String,
    pub remarks: String,
}

pub struct ExtraRow {
    pub description: String,
    pub amount: String,
    pub remarks: String,
}

/// Query string of the order listings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OrderSearch {
    pub search: String,
    pub customer: String,
    pub date: String,
    pub staff: String,
}

impl OrderSearch {
    pub fn to_filter(&self) -> OrderFilter {
        let text = |value: &str| {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        };
        OrderFilter {
            product_code: text(&self.search),
            customer: text(&self.customer),
            date: text(&self.date),
            staff_name: text(&self.staff),
            ..OrderFilter::default()
        }
    }
}

// Login template
#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub business_name: String,
    pub error: Option<String>,
    pub email: String,
}

// Error page
#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub status: u16,
    pub title: String,
    pub messages: Vec<String>,
}

#[derive(Template)]
#[template(path = "admin_dashboard.html")]
pub struct AdminDashboardTemplate {
    pub page: PageContext,
    pub stats: AdminStats,
    pub recent_orders: Vec<OrderSummary>,
    pub month_label: String,
}

#[derive(Template)]
#[template(path = "staff_dashboard.html")]
pub struct StaffDashboardTemplate {
    pub page: PageContext,
    pub stats: MonthlyStats,
    pub month_label: String,
    pub scope_label: String,
}

#[derive(Template)]
#[template(path = "manage_staff.html")]
pub struct ManageStaffTemplate {
    pub page: PageContext,
    pub staff: Vec<User>,
}

#[derive(Template)]
#[template(path = "manage_products.html")]
pub struct ManageProductsTemplate {
    pub page: PageContext,
    pub products: Vec<Product>,
    pub search: String,
    pub form: ProductInput,
}

#[derive(Template)]
#[template(path = "bulk_add_products.html")]
pub struct BulkAddTemplate {
    pub page: PageContext,
    pub counts: Vec<BulkCountOption>,
    pub rows: Vec<ProductInput>,
}

#[derive(Template)]
#[template(path = "edit_product.html")]
pub struct EditProductTemplate {
    pub page: PageContext,
    pub product: Product,
    pub form: ProductInput,
}

#[derive(Template)]
#[template(path = "manage_orders.html")]
pub struct AdminOrdersTemplate {
    pub page: PageContext,
    pub orders: Vec<OrderSummary>,
    pub search: OrderSearch,
}

#[derive(Template)]
#[template(path = "staff_orders.html")]
pub struct StaffOrdersTemplate {
    pub page: PageContext,
    pub orders: Vec<OrderSummary>,
    pub search: OrderSearch,
}

// Create and edit order form
#[derive(Template)]
#[template(path = "order_form.html")]
pub struct OrderFormTemplate {
    pub page: PageContext,
    pub heading: String,
    pub action: String,
    pub cancel_url: String,
    pub form: OrderForm,
    pub products: Vec<ProductChoice>,
    pub accessories: Vec<AccessoryRow>,
    pub extras: Vec<ExtraRow>,
}

#[derive(Template)]
#[template(path = "add_products.html")]
pub struct AddProductsTemplate {
    pub page: PageContext,
    pub detail: OrderDetail,
    pub products: Vec<ProductChoice>,
    pub back_url: String,
}

#[derive(Template)]
#[template(path = "invoice.html")]
pub struct InvoiceTemplate {
    pub page: PageContext,
    pub detail: OrderDetail,
    pub invoice: Invoice,
    pub business: BusinessConfig,
    pub amount_words: String,
}

#[derive(Template)]
#[template(path = "packing_slip.html")]
pub struct PackingSlipTemplate {
    pub page: PageContext,
    pub detail: OrderDetail,
    pub slip: SlipContent,
}
