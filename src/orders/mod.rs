//! Rental orders: creation, edits, adding products, status changes and
//! availability lookups.
//!
//! Every mutation of an order's lines runs in one transaction that ends by
//! recomputing the stored total.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use thiserror::Error;

use crate::api::error::AppError;
use crate::api::validation::{
    parse_amount, parse_date, validate_optional_email, validate_phone, validate_rental_window,
    validate_required, DATE_FORMAT,
};
use crate::db::{
    clear_order_lines, ensure_invoice, fetch_product, find_booking_conflict, find_product_by_code,
    get_order, insert_order, insert_order_accessory, insert_order_extra_charge, insert_order_item,
    open_bookings_for_product, order_has_product, recalculate_order_total, set_order_status,
    update_customer, update_order_schedule, upsert_customer_by_phone, Booking, CustomerDetails,
    DbPool, NewOrder, Order, OrderStatus, Product, User,
};

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("{}", .0.join("; "))]
    Invalid(Vec<String>),

    #[error("Order not found")]
    NotFound,

    #[error("Product {0} not found")]
    ProductNotFound(String),

    #[error("Product {0} is not available for rent")]
    ProductUnavailable(String),

    #[error(
        "Duplicate order: {customer} already has order {transaction_id} with {product_code} \
         from {delivery_date} to {return_date}"
    )]
    DuplicateOrder {
        customer: String,
        transaction_id: String,
        product_code: String,
        delivery_date: String,
        return_date: String,
    },

    #[error(
        "Product {product_code} is already booked from {delivery_date} to {return_date} \
         (order {transaction_id})"
    )]
    ProductBooked {
        product_code: String,
        transaction_id: String,
        delivery_date: String,
        return_date: String,
    },

    #[error("You can only change your own pending orders")]
    NotPermitted,

    #[error("Only pending orders can be changed")]
    NotPending,

    #[error("Cannot change order status from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl OrderError {
    pub fn messages(&self) -> Vec<String> {
        match self {
            OrderError::Invalid(messages) => messages.clone(),
            other => vec![other.to_string()],
        }
    }

    /// Errors shown back on the form rather than as an error page
    pub fn is_user_error(&self) -> bool {
        !matches!(
            self,
            OrderError::Database(_) | OrderError::NotFound | OrderError::NotPermitted
        )
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        let message = err.to_string();
        match err {
            OrderError::Database(e) => AppError::from(e),
            OrderError::NotFound | OrderError::ProductNotFound(_) => AppError::not_found(message),
            OrderError::NotPermitted => AppError::forbidden(message),
            OrderError::DuplicateOrder { .. }
            | OrderError::ProductBooked { .. }
            | OrderError::NotPending => AppError::conflict(message),
            _ => AppError::bad_request(message),
        }
    }
}

/// Order form as submitted. Repeated fields arrive as parallel lists.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OrderForm {
    pub customer_name: String,
    pub customer_phone: String,
    pub secondary_phone: String,
    pub customer_email: String,
    pub customer_address: String,
    pub delivery_date: String,
    pub return_date: String,
    pub notes: String,
    pub product_ids: Vec<String>,
    pub accessory_name: Vec<String>,
    pub accessory_remarks: Vec<String>,
    pub extra_description: Vec<String>,
    pub extra_amount: Vec<String>,
    pub extra_remarks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccessoryLine {
    pub name: String,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtraChargeLine {
    pub description: String,
    pub amount: f64,
    pub remarks: Option<String>,
}

/// A validated order form
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub customer: CustomerDetails,
    pub delivery_date: NaiveDate,
    pub return_date: NaiveDate,
    pub notes: Option<String>,
    pub product_ids: Vec<String>,
    pub accessories: Vec<AccessoryLine>,
    pub extra_charges: Vec<ExtraChargeLine>,
}

impl OrderDraft {
    fn delivery(&self) -> String {
        self.delivery_date.format(DATE_FORMAT).to_string()
    }

    fn return_by(&self) -> String {
        self.return_date.format(DATE_FORMAT).to_string()
    }
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

impl OrderForm {
    /// Validate the form into a draft, collecting every problem
    pub fn parse(&self) -> Result<OrderDraft, OrderError> {
        let mut problems = Vec::new();
        let mut check = |result: Result<(), String>| {
            if let Err(e) = result {
                problems.push(e);
            }
        };

        check(validate_required(&self.customer_name, "Customer name"));
        check(validate_phone(&self.customer_phone));
        if let Some(secondary) = optional(&self.secondary_phone) {
            check(validate_phone(&secondary).map_err(|_| "Invalid secondary phone number".to_string()));
        }
        check(validate_optional_email(Some(self.customer_email.as_str())));

        let delivery_date = parse_date(&self.delivery_date, "Delivery date")
            .map_err(|e| problems.push(e))
            .ok();
        let return_date = parse_date(&self.return_date, "Return date")
            .map_err(|e| problems.push(e))
            .ok();
        if let (Some(delivery), Some(return_date)) = (delivery_date, return_date) {
            if let Err(e) = validate_rental_window(delivery, return_date) {
                problems.push(e);
            }
        }

        let mut product_ids: Vec<String> = Vec::new();
        for id in self.product_ids.iter().map(|id| id.trim()).filter(|id| !id.is_empty()) {
            if !product_ids.iter().any(|existing| existing == id) {
                product_ids.push(id.to_string());
            }
        }
        if product_ids.is_empty() {
            problems.push("Select at least one product".to_string());
        }

        let accessories = self
            .accessory_name
            .iter()
            .enumerate()
            .filter_map(|(i, name)| {
                optional(name).map(|name| AccessoryLine {
                    name,
                    remarks: self.accessory_remarks.get(i).and_then(|r| optional(r)),
                })
            })
            .collect();

        let mut extra_charges = Vec::new();
        for (i, description) in self.extra_description.iter().enumerate() {
            let description = match optional(description) {
                Some(d) => d,
                None => continue,
            };
            let raw_amount = self.extra_amount.get(i).map(String::as_str).unwrap_or("");
            match parse_amount(raw_amount, &format!("Amount for '{}'", description)) {
                Ok(amount) => extra_charges.push(ExtraChargeLine {
                    description,
                    amount,
                    remarks: self.extra_remarks.get(i).and_then(|r| optional(r)),
                }),
                Err(e) => problems.push(e),
            }
        }

        match (delivery_date, return_date) {
            (Some(delivery_date), Some(return_date)) if problems.is_empty() => Ok(OrderDraft {
                customer: CustomerDetails {
                    name: self.customer_name.trim().to_string(),
                    phone: self.customer_phone.trim().to_string(),
                    secondary_phone: optional(&self.secondary_phone),
                    email: optional(&self.customer_email),
                    address: optional(&self.customer_address),
                },
                delivery_date,
                return_date,
                notes: optional(&self.notes),
                product_ids,
                accessories,
                extra_charges,
            }),
            _ => Err(OrderError::Invalid(problems)),
        }
    }
}

/// Whether `actor` may edit the order or add products to it
pub fn can_modify(actor: &User, order: &Order) -> bool {
    actor.is_admin() || (order.staff_id == actor.id && order.is_pending())
}

/// Short uppercase reference printed on slips, e.g. `3F9A1C0B`
pub fn generate_transaction_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}

/// Load the requested products, all of which must exist. Products must be
/// available unless `existing_order` already holds them.
async fn load_bookable_products(
    conn: &mut SqliteConnection,
    product_ids: &[String],
    existing_order: Option<&str>,
) -> Result<Vec<Product>, OrderError> {
    let mut products = Vec::with_capacity(product_ids.len());
    for id in product_ids {
        let product = fetch_product(conn, id)
            .await?
            .ok_or_else(|| OrderError::ProductNotFound(id.clone()))?;
        if !product.is_active {
            let held = match existing_order {
                Some(order_id) => order_has_product(conn, order_id, &product.id).await?,
                None => false,
            };
            if !held {
                return Err(OrderError::ProductUnavailable(product.product_code));
            }
        }
        products.push(product);
    }
    Ok(products)
}

fn booking_error(product: &Product, booking: Booking, phone: &str) -> OrderError {
    if booking.customer_phone == phone {
        OrderError::DuplicateOrder {
            customer: booking.customer_name,
            transaction_id: booking.transaction_id,
            product_code: product.product_code.clone(),
            delivery_date: booking.delivery_date,
            return_date: booking.return_date,
        }
    } else {
        OrderError::ProductBooked {
            product_code: product.product_code.clone(),
            transaction_id: booking.transaction_id,
            delivery_date: booking.delivery_date,
            return_date: booking.return_date,
        }
    }
}

/// Reject the draft if any product is held by another open order whose
/// rental window overlaps the draft's.
async fn guard_bookings(
    conn: &mut SqliteConnection,
    products: &[Product],
    draft: &OrderDraft,
    exclude_order_id: Option<&str>,
) -> Result<(), OrderError> {
    let (delivery, return_by) = (draft.delivery(), draft.return_by());
    for product in products {
        if let Some(booking) =
            find_booking_conflict(conn, &product.id, &delivery, &return_by, exclude_order_id).await?
        {
            tracing::warn!(
                code = %product.product_code,
                conflicting_order = %booking.transaction_id,
                "Order rejected by booking guard"
            );
            return Err(booking_error(product, booking, &draft.customer.phone));
        }
    }
    Ok(())
}

/// Insert items, accessories and extra charges, then recompute the total
async fn write_order_lines(
    conn: &mut SqliteConnection,
    order_id: &str,
    products: &[Product],
    draft: &OrderDraft,
) -> Result<f64, sqlx::Error> {
    for product in products {
        insert_order_item(conn, order_id, &product.id, product.rental_price).await?;
    }
    for accessory in &draft.accessories {
        insert_order_accessory(conn, order_id, &accessory.name, accessory.remarks.as_deref()).await?;
    }
    for extra in &draft.extra_charges {
        insert_order_extra_charge(conn, order_id, &extra.description, extra.amount, extra.remarks.as_deref())
            .await?;
    }
    recalculate_order_total(conn, order_id).await
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedOrder {
    pub id: String,
    pub transaction_id: String,
    pub invoice_number: String,
    pub total_amount: f64,
}

/// Create a pending order owned by `staff`
pub async fn create_order(db: &DbPool, staff: &User, draft: &OrderDraft) -> Result<CreatedOrder, OrderError> {
    let mut tx = db.begin().await?;

    let products = load_bookable_products(&mut tx, &draft.product_ids, None).await?;
    guard_bookings(&mut tx, &products, draft, None).await?;

    let customer_id = upsert_customer_by_phone(&mut tx, &draft.customer).await?;
    let transaction_id = generate_transaction_id();
    let (delivery, return_by) = (draft.delivery(), draft.return_by());

    let order_id = insert_order(
        &mut tx,
        &NewOrder {
            transaction_id: &transaction_id,
            customer_id: &customer_id,
            staff_id: &staff.id,
            delivery_date: &delivery,
            return_date: &return_by,
            notes: draft.notes.as_deref(),
        },
    )
    .await?;

    let total_amount = write_order_lines(&mut tx, &order_id, &products, draft).await?;
    let invoice = ensure_invoice(&mut tx, &order_id).await?;
    tx.commit().await?;

    tracing::info!(
        order_id = %order_id,
        transaction_id = %transaction_id,
        staff_id = %staff.id,
        items = products.len(),
        total = total_amount,
        "Order created"
    );

    Ok(CreatedOrder {
        id: order_id,
        transaction_id,
        invoice_number: invoice.invoice_number,
        total_amount,
    })
}

/// Replace an order's customer details, dates and lines
pub async fn edit_order(db: &DbPool, actor: &User, order_id: &str, draft: &OrderDraft) -> Result<f64, OrderError> {
    let order = get_order(db, order_id).await?.ok_or(OrderError::NotFound)?;
    if !can_modify(actor, &order) {
        return Err(OrderError::NotPermitted);
    }

    let mut tx = db.begin().await?;

    let products = load_bookable_products(&mut tx, &draft.product_ids, Some(order_id)).await?;
    guard_bookings(&mut tx, &products, draft, Some(order_id)).await?;

    update_customer(&mut tx, &order.customer_id, &draft.customer).await?;
    update_order_schedule(
        &mut tx,
        order_id,
        &draft.delivery(),
        &draft.return_by(),
        draft.notes.as_deref(),
    )
    .await?;

    clear_order_lines(&mut tx, order_id).await?;
    let total = write_order_lines(&mut tx, order_id, &products, draft).await?;
    tx.commit().await?;

    tracing::info!(order_id = %order_id, actor = %actor.id, total, "Order updated");
    Ok(total)
}

/// What happened to each product offered to `add_products`
#[derive(Debug, Clone, Default, Serialize)]
pub struct AddProductsOutcome {
    pub added: Vec<String>,
    pub already_on_order: Vec<String>,
    /// One message per product that could not be added
    pub rejected: Vec<String>,
    pub total_amount: f64,
}

/// Add products to a pending order, skipping ones it already has and ones
/// booked elsewhere for overlapping dates
pub async fn add_products(
    db: &DbPool,
    actor: &User,
    order_id: &str,
    product_ids: &[String],
) -> Result<AddProductsOutcome, OrderError> {
    let order = get_order(db, order_id).await?.ok_or(OrderError::NotFound)?;
    if !can_modify(actor, &order) {
        return Err(OrderError::NotPermitted);
    }
    if !order.is_pending() {
        return Err(OrderError::NotPending);
    }

    let phone: String = sqlx::query_scalar("SELECT phone FROM customers WHERE id = ?")
        .bind(&order.customer_id)
        .fetch_one(db)
        .await?;

    let mut outcome = AddProductsOutcome::default();
    let mut tx = db.begin().await?;

    for id in product_ids.iter().map(|id| id.trim()).filter(|id| !id.is_empty()) {
        let product = match fetch_product(&mut tx, id).await? {
            Some(product) => product,
            None => {
                outcome.rejected.push(format!("Product {} not found", id));
                continue;
            }
        };

        if order_has_product(&mut tx, order_id, &product.id).await? {
            outcome.already_on_order.push(product.product_code);
            continue;
        }
        if !product.is_active {
            outcome
                .rejected
                .push(OrderError::ProductUnavailable(product.product_code).to_string());
            continue;
        }

        let conflict = find_booking_conflict(
            &mut tx,
            &product.id,
            &order.delivery_date,
            &order.return_date,
            Some(order_id),
        )
        .await?;
        if let Some(booking) = conflict {
            outcome
                .rejected
                .push(booking_error(&product, booking, &phone).to_string());
            continue;
        }

        insert_order_item(&mut tx, order_id, &product.id, product.rental_price).await?;
        outcome.added.push(product.product_code);
    }

    outcome.total_amount = recalculate_order_total(&mut tx, order_id).await?;
    tx.commit().await?;

    tracing::info!(
        order_id = %order_id,
        added = outcome.added.len(),
        rejected = outcome.rejected.len(),
        "Products added to order"
    );
    Ok(outcome)
}

/// Move an order one step forward in its lifecycle
pub async fn change_status(db: &DbPool, order_id: &str, target: OrderStatus) -> Result<Order, OrderError> {
    let order = get_order(db, order_id).await?.ok_or(OrderError::NotFound)?;
    let current = order.status_enum();

    if !current.can_transition_to(target) {
        tracing::warn!(order_id = %order_id, from = %current, to = %target, "Rejected status change");
        return Err(OrderError::InvalidTransition { from: current, to: target });
    }

    set_order_status(db, order_id, target).await?;
    tracing::info!(order_id = %order_id, from = %current, to = %target, "Order status changed");

    get_order(db, order_id).await?.ok_or(OrderError::NotFound)
}

/// A product and the open orders holding it
#[derive(Debug, Clone, Serialize)]
pub struct Availability {
    pub product: Product,
    pub bookings: Vec<Booking>,
    pub is_available: bool,
}

pub async fn check_availability(db: &DbPool, product_code: &str) -> Result<Availability, OrderError> {
    let code = product_code.trim();
    let product = find_product_by_code(db, code)
        .await?
        .ok_or_else(|| OrderError::ProductNotFound(code.to_string()))?;
    let bookings = open_bookings_for_product(db, &product.id).await?;

    Ok(Availability {
        is_available: bookings.is_empty(),
        product,
        bookings,
    })
}
