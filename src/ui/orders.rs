use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
};
use axum_extra::extract::Form;
use serde::Deserialize;
use std::sync::Arc;

use super::flash::{redirect_error, redirect_success, redirect_with_flash};
use super::{
    render_template, render_with_status, AccessoryRow, AddProductsTemplate, AdminOrdersTemplate, ExtraRow,
    Flash, Flashes, OrderFormTemplate, OrderSearch, PageContext, ProductChoice, StaffOrdersTemplate,
};
use crate::api::AppError;
use crate::db::{list_orders, load_order_detail, search_products, OrderDetail, OrderStatus, User};
use crate::orders::{self, can_modify, OrderError, OrderForm};
use crate::AppState;

const MIN_ACCESSORY_ROWS: usize = 3;
const MIN_EXTRA_ROWS: usize = 2;

/// Where a user goes back to after working on an order
fn orders_page(user: &User) -> &'static str {
    if user.is_admin() {
        "/admin/orders"
    } else {
        "/staff/orders"
    }
}

fn dashboard_page(user: &User) -> &'static str {
    if user.is_admin() {
        "/admin/dashboard"
    } else {
        "/staff/dashboard"
    }
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

pub async fn admin_orders(
    State(state): State<Arc<AppState>>,
    user: User,
    flashes: Flashes,
    Query(search): Query<OrderSearch>,
) -> Result<Response, AppError> {
    let mut filter = search.to_filter();
    filter.customer = None;
    let orders = list_orders(&state.db, &filter).await?;

    Ok(render_template(AdminOrdersTemplate {
        page: PageContext::new(&state, user, flashes),
        orders,
        search,
    }))
}

pub async fn staff_orders(
    State(state): State<Arc<AppState>>,
    user: User,
    flashes: Flashes,
    Query(search): Query<OrderSearch>,
) -> Result<Response, AppError> {
    let mut filter = search.to_filter();
    filter.staff_name = None;
    let orders = list_orders(&state.db, &filter).await?;

    Ok(render_template(StaffOrdersTemplate {
        page: PageContext::new(&state, user, flashes),
        orders,
        search,
    }))
}

// ---------------------------------------------------------------------------
// Order form
// ---------------------------------------------------------------------------

/// Pre-filled form values for an existing order
fn form_from_detail(detail: &OrderDetail) -> OrderForm {
    let customer = &detail.customer;
    OrderForm {
        customer_name: customer.name.clone(),
        customer_phone: customer.phone.clone(),
        secondary_phone: customer.secondary_phone.clone().unwrap_or_default(),
        customer_email: customer.email.clone().unwrap_or_default(),
        customer_address: customer.address.clone().unwrap_or_default(),
        delivery_date: detail.order.delivery_date.clone(),
        return_date: detail.order.return_date.clone(),
        notes: detail.order.notes.clone().unwrap_or_default(),
        product_ids: detail.items.iter().map(|i| i.product_id.clone()).collect(),
        accessory_name: detail.accessories.iter().map(|a| a.accessory_name.clone()).collect(),
        accessory_remarks: detail
            .accessories
            .iter()
            .map(|a| a.remarks.clone().unwrap_or_default())
            .collect(),
        extra_description: detail.extra_charges.iter().map(|e| e.description.clone()).collect(),
        extra_amount: detail.extra_charges.iter().map(|e| e.amount.to_string()).collect(),
        extra_remarks: detail
            .extra_charges
            .iter()
            .map(|e| e.remarks.clone().unwrap_or_default())
            .collect(),
    }
}

fn value_at(values: &[String], index: usize) -> String {
    values.get(index).cloned().unwrap_or_default()
}

/// Filled accessory rows followed by blank ones to type into
fn accessory_rows(form: &OrderForm) -> Vec<AccessoryRow> {
    let mut rows: Vec<AccessoryRow> = form
        .accessory_name
        .iter()
        .enumerate()
        .filter(|(_, name)| !name.trim().is_empty())
        .map(|(i, name)| AccessoryRow {
            name: name.clone(),
            remarks: value_at(&form.accessory_remarks, i),
        })
        .collect();

    let target = (rows.len() + 1).max(MIN_ACCESSORY_ROWS);
    while rows.len() < target {
        rows.push(AccessoryRow {
            name: String::new(),
            remarks: String::new(),
        });
    }
    rows
}

fn extra_rows(form: &OrderForm) -> Vec<ExtraRow> {
    let mut rows: Vec<ExtraRow> = form
        .extra_description
        .iter()
        .enumerate()
        .filter(|(_, description)| !description.trim().is_empty())
        .map(|(i, description)| ExtraRow {
            description: description.clone(),
            amount: value_at(&form.extra_amount, i),
            remarks: value_at(&form.extra_remarks, i),
        })
        .collect();

    let target = (rows.len() + 1).max(MIN_EXTRA_ROWS);
    while rows.len() < target {
        rows.push(ExtraRow {
            description: String::new(),
            amount: String::new(),
            remarks: String::new(),
        });
    }
    rows
}

/// Bookable products, plus whatever the order already holds
async fn product_choices(
    state: &AppState,
    form: &OrderForm,
    detail: Option<&OrderDetail>,
) -> Result<Vec<ProductChoice>, AppError> {
    let mut products = search_products(&state.db, None, true).await?;

    if let Some(detail) = detail {
        for item in &detail.items {
            if !products.iter().any(|p| p.id == item.product_id) {
                if let Some(product) = crate::db::get_product(&state.db, &item.product_id).await? {
                    products.push(product);
                }
            }
        }
    }

    Ok(products
        .into_iter()
        .map(|product| ProductChoice {
            selected: form.product_ids.iter().any(|id| id == &product.id),
            product,
        })
        .collect())
}

struct FormPage<'a> {
    heading: String,
    action: String,
    cancel_url: &'a str,
    detail: Option<&'a OrderDetail>,
}

async fn render_order_form(
    state: &AppState,
    page: PageContext,
    form: OrderForm,
    target: FormPage<'_>,
    status: StatusCode,
) -> Result<Response, AppError> {
    let products = product_choices(state, &form, target.detail).await?;
    Ok(render_with_status(
        status,
        OrderFormTemplate {
            page,
            heading: target.heading,
            action: target.action,
            cancel_url: target.cancel_url.to_string(),
            accessories: accessory_rows(&form),
            extras: extra_rows(&form),
            form,
            products,
        },
    ))
}

pub async fn new_order_form(
    State(state): State<Arc<AppState>>,
    user: User,
    flashes: Flashes,
) -> Result<Response, AppError> {
    let cancel_url = dashboard_page(&user);
    let page = PageContext::new(&state, user, flashes);
    render_order_form(
        &state,
        page,
        OrderForm::default(),
        FormPage {
            heading: "Create Order".to_string(),
            action: "/orders/new".to_string(),
            cancel_url,
            detail: None,
        },
        StatusCode::OK,
    )
    .await
}

pub async fn create_order_submit(
    State(state): State<Arc<AppState>>,
    user: User,
    Form(form): Form<OrderForm>,
) -> Result<Response, AppError> {
    let result = match form.parse() {
        Ok(draft) => orders::create_order(&state.db, &user, &draft).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(created) => {
            let next = if user.is_admin() { "/admin/orders" } else { "/staff/dashboard" };
            Ok(redirect_success(
                next,
                format!(
                    "Order {} created successfully (Invoice {})",
                    created.transaction_id, created.invoice_number
                ),
            ))
        }
        Err(e) if e.is_user_error() => {
            let cancel_url = dashboard_page(&user);
            let page = PageContext::new(&state, user, Flashes::default()).with_errors(e.messages());
            render_order_form(
                &state,
                page,
                form,
                FormPage {
                    heading: "Create Order".to_string(),
                    action: "/orders/new".to_string(),
                    cancel_url,
                    detail: None,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            )
            .await
        }
        Err(e) => Err(e.into()),
    }
}

async fn editable_order(state: &AppState, user: &User, id: &str) -> Result<Result<OrderDetail, Response>, AppError> {
    let detail = load_order_detail(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))?;

    if !can_modify(user, &detail.order) {
        tracing::warn!(order_id = %id, user_id = %user.id, "Order edit denied");
        return Ok(Err(redirect_error(
            orders_page(user),
            OrderError::NotPermitted.to_string(),
        )));
    }
    Ok(Ok(detail))
}

async fn edit_form(
    state: Arc<AppState>,
    user: User,
    flashes: Flashes,
    id: String,
    action: String,
) -> Result<Response, AppError> {
    let detail = match editable_order(&state, &user, &id).await? {
        Ok(detail) => detail,
        Err(redirect) => return Ok(redirect),
    };

    let cancel_url = orders_page(&user);
    let page = PageContext::new(&state, user, flashes);
    render_order_form(
        &state,
        page,
        form_from_detail(&detail),
        FormPage {
            heading: format!("Edit Order #{}", detail.order.transaction_id),
            action,
            cancel_url,
            detail: Some(&detail),
        },
        StatusCode::OK,
    )
    .await
}

async fn edit_submit(
    state: Arc<AppState>,
    user: User,
    id: String,
    action: String,
    form: OrderForm,
) -> Result<Response, AppError> {
    let detail = match editable_order(&state, &user, &id).await? {
        Ok(detail) => detail,
        Err(redirect) => return Ok(redirect),
    };

    let result = match form.parse() {
        Ok(draft) => orders::edit_order(&state.db, &user, &id, &draft).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(_) => Ok(redirect_success(
            orders_page(&user),
            format!("Order {} updated successfully", detail.order.transaction_id),
        )),
        Err(e) if e.is_user_error() => {
            let cancel_url = orders_page(&user);
            let page = PageContext::new(&state, user, Flashes::default()).with_errors(e.messages());
            render_order_form(
                &state,
                page,
                form,
                FormPage {
                    heading: format!("Edit Order #{}", detail.order.transaction_id),
                    action,
                    cancel_url,
                    detail: Some(&detail),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            )
            .await
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn staff_edit_form(
    State(state): State<Arc<AppState>>,
    user: User,
    flashes: Flashes,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let action = format!("/staff/orders/{}/edit", id);
    edit_form(state, user, flashes, id, action).await
}

pub async fn staff_edit_submit(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Form(form): Form<OrderForm>,
) -> Result<Response, AppError> {
    let action = format!("/staff/orders/{}/edit", id);
    edit_submit(state, user, id, action, form).await
}

pub async fn admin_edit_form(
    State(state): State<Arc<AppState>>,
    user: User,
    flashes: Flashes,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let action = format!("/admin/orders/{}/edit", id);
    edit_form(state, user, flashes, id, action).await
}

pub async fn admin_edit_submit(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Form(form): Form<OrderForm>,
) -> Result<Response, AppError> {
    let action = format!("/admin/orders/{}/edit", id);
    edit_submit(state, user, id, action, form).await
}

// ---------------------------------------------------------------------------
// Adding products to a pending order
// ---------------------------------------------------------------------------

pub async fn add_products_form(
    State(state): State<Arc<AppState>>,
    user: User,
    flashes: Flashes,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let detail = match editable_order(&state, &user, &id).await? {
        Ok(detail) => detail,
        Err(redirect) => return Ok(redirect),
    };
    if !detail.order.is_pending() {
        return Ok(redirect_error(orders_page(&user), "Cannot modify approved orders"));
    }

    let products = search_products(&state.db, None, true)
        .await?
        .into_iter()
        .filter(|p| !detail.items.iter().any(|item| item.product_id == p.id))
        .map(|product| ProductChoice {
            product,
            selected: false,
        })
        .collect();

    let back_url = orders_page(&user).to_string();
    Ok(render_template(AddProductsTemplate {
        page: PageContext::new(&state, user, flashes),
        detail,
        products,
        back_url,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct AddProductsForm {
    #[serde(default)]
    pub product_ids: Vec<String>,
}

pub async fn add_products_submit(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Form(form): Form<AddProductsForm>,
) -> Result<Response, AppError> {
    let back = orders_page(&user);
    if form.product_ids.iter().all(|id| id.trim().is_empty()) {
        return Ok(redirect_error(
            &format!("/orders/{}/add-products", id),
            "Select at least one product",
        ));
    }

    let outcome = match orders::add_products(&state.db, &user, &id, &form.product_ids).await {
        Ok(outcome) => outcome,
        Err(e @ (OrderError::NotPermitted | OrderError::NotPending)) => {
            return Ok(redirect_error(back, e.to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    let mut flashes = Vec::new();
    if !outcome.added.is_empty() {
        flashes.push(Flash::success(format!(
            "Products added successfully: {}",
            outcome.added.join(", ")
        )));
    }
    if !outcome.already_on_order.is_empty() {
        flashes.push(Flash::success(format!(
            "Already on this order: {}",
            outcome.already_on_order.join(", ")
        )));
    }
    flashes.extend(Flash::errors(outcome.rejected));

    Ok(redirect_with_flash(back, flashes))
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Form(form): Form<StatusForm>,
) -> Result<Response, AppError> {
    const BACK: &str = "/admin/orders";

    let target: OrderStatus = match form.status.parse() {
        Ok(status) => status,
        Err(e) => return Ok(redirect_error(BACK, e)),
    };

    match orders::change_status(&state.db, &id, target).await {
        Ok(order) => Ok(redirect_success(
            BACK,
            format!("Order {} status updated to {}", order.transaction_id, order.status),
        )),
        Err(e @ OrderError::InvalidTransition { .. }) => Ok(redirect_error(BACK, e.to_string())),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_keep_values_and_pad_with_blanks() {
        let form = OrderForm {
            accessory_name: vec!["Dupatta".to_string(), " ".to_string(), "Safa".to_string()],
            accessory_remarks: vec!["red".to_string()],
            extra_description: vec!["Alteration".to_string()],
            extra_amount: vec!["300".to_string()],
            ..OrderForm::default()
        };

        let accessories = accessory_rows(&form);
        assert_eq!(accessories.len(), 3);
        assert_eq!(accessories[0].name, "Dupatta");
        assert_eq!(accessories[0].remarks, "red");
        assert_eq!(accessories[1].name, "Safa");
        assert_eq!(accessories[1].remarks, "");
        assert!(accessories[2].name.is_empty());

        let extras = extra_rows(&form);
        assert_eq!(extras.len(), 2);
        assert_eq!(extras[0].amount, "300");
        assert!(extras[1].description.is_empty());

        assert_eq!(accessory_rows(&OrderForm::default()).len(), MIN_ACCESSORY_ROWS);
    }
}
