use axum::{
    extract::State,
    response::{Redirect, Response},
};
use std::sync::Arc;

use super::{render_template, AdminDashboardTemplate, Flashes, PageContext, StaffDashboardTemplate};
use crate::api::AppError;
use crate::db::{admin_stats, current_month, list_orders, monthly_stats, OrderFilter, User};
use crate::AppState;

const RECENT_ORDERS: i64 = 10;

fn month_label() -> String {
    chrono::Utc::now().format("%B %Y").to_string()
}

// Landing page: send users to the dashboard for their role
pub async fn home(user: User) -> Redirect {
    if user.is_admin() {
        Redirect::to("/admin/dashboard")
    } else {
        Redirect::to("/staff/dashboard")
    }
}

pub async fn admin_dashboard(
    State(state): State<Arc<AppState>>,
    user: User,
    flashes: Flashes,
) -> Result<Response, AppError> {
    let stats = admin_stats(&state.db, &current_month()).await?;
    let recent_orders = list_orders(
        &state.db,
        &OrderFilter {
            limit: Some(RECENT_ORDERS),
            ..OrderFilter::default()
        },
    )
    .await?;

    Ok(render_template(AdminDashboardTemplate {
        page: PageContext::new(&state, user, flashes),
        stats,
        recent_orders,
        month_label: month_label(),
    }))
}

// Monthly figures; admins see the whole shop, staff their own orders
pub async fn staff_dashboard(
    State(state): State<Arc<AppState>>,
    user: User,
    flashes: Flashes,
) -> Result<Response, AppError> {
    let staff_id = (!user.is_admin()).then(|| user.id.clone());
    let stats = monthly_stats(&state.db, &current_month(), staff_id.as_deref()).await?;

    let scope_label = if staff_id.is_some() {
        "Your orders"
    } else {
        "All orders"
    };

    Ok(render_template(StaffDashboardTemplate {
        page: PageContext::new(&state, user, flashes),
        stats,
        month_label: month_label(),
        scope_label: scope_label.to_string(),
    }))
}
