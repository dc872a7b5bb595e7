//! JSON endpoints used by the order forms.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{AppError, JsonError, ValidationErrorBuilder};
use super::validation::validate_required;
use crate::db::{
    load_order_detail, Customer, Order, OrderAccessory, OrderExtraCharge, OrderItemDetail, User,
};
use crate::orders::{check_availability as lookup_availability, Availability};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AvailabilityRequest {
    pub product_code: String,
}

/// Report a product and the open orders holding it
pub async fn check_availability(
    State(state): State<Arc<AppState>>,
    _user: User,
    Json(request): Json<AvailabilityRequest>,
) -> Result<Json<Availability>, JsonError> {
    let mut errors = ValidationErrorBuilder::new();
    errors.check(
        "product_code",
        validate_required(&request.product_code, "Product code"),
    );
    errors.finish()?;

    let availability = lookup_availability(&state.db, &request.product_code)
        .await
        .map_err(AppError::from)?;
    Ok(Json(availability))
}

#[derive(Debug, Serialize)]
pub struct OrderDetailsResponse {
    pub order: Order,
    pub customer: Customer,
    pub staff_name: String,
    pub invoice_number: Option<String>,
    pub items: Vec<OrderItemDetail>,
    pub accessories: Vec<OrderAccessory>,
    pub extra_charges: Vec<OrderExtraCharge>,
}

pub async fn order_details(
    State(state): State<Arc<AppState>>,
    _user: User,
    Path(id): Path<String>,
) -> Result<Json<OrderDetailsResponse>, JsonError> {
    let detail = load_order_detail(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))?;

    Ok(Json(OrderDetailsResponse {
        invoice_number: detail.invoice.map(|i| i.invoice_number),
        order: detail.order,
        customer: detail.customer,
        staff_name: detail.staff_name,
        items: detail.items,
        accessories: detail.accessories,
        extra_charges: detail.extra_charges,
    }))
}
