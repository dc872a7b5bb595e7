use axum::{
    extract::{Path, State},
    response::Response,
    Form,
};
use serde::Deserialize;
use std::sync::Arc;

use super::flash::{redirect_error, redirect_success, redirect_with_flash};
use super::{render_template, Flash, Flashes, ManageStaffTemplate, PageContext};
use crate::api::auth::hash_password;
use crate::api::validation::{validate_email, validate_password, validate_phone, validate_required};
use crate::api::AppError;
use crate::db::{
    create_user, find_user_by_email, get_user, list_users_by_role, toggle_user_active, NewUser, User,
    UserRole,
};
use crate::AppState;

const STAFF_PAGE: &str = "/admin/staff";

#[derive(Debug, Deserialize)]
pub struct StaffForm {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub password: String,
}

impl StaffForm {
    fn problems(&self) -> Vec<String> {
        let phone = self.phone.trim();
        [
            validate_required(&self.name, "Name"),
            validate_email(self.email.trim()),
            if phone.is_empty() { Ok(()) } else { validate_phone(phone) },
            validate_password(&self.password),
        ]
        .into_iter()
        .filter_map(Result::err)
        .collect()
    }
}

pub async fn manage_staff(
    State(state): State<Arc<AppState>>,
    user: User,
    flashes: Flashes,
) -> Result<Response, AppError> {
    let staff = list_users_by_role(&state.db, UserRole::Staff).await?;
    Ok(render_template(ManageStaffTemplate {
        page: PageContext::new(&state, user, flashes),
        staff,
    }))
}

pub async fn add_staff(
    State(state): State<Arc<AppState>>,
    Form(form): Form<StaffForm>,
) -> Result<Response, AppError> {
    let problems = form.problems();
    if !problems.is_empty() {
        return Ok(redirect_with_flash(STAFF_PAGE, Flash::errors(problems)));
    }

    let email = form.email.trim().to_lowercase();
    if find_user_by_email(&state.db, &email).await?.is_some() {
        return Ok(redirect_error(STAFF_PAGE, "Email already exists"));
    }

    let password_hash = hash_password(&form.password).map_err(|e| {
        tracing::error!(error = %e, "Password hashing failed");
        AppError::internal("Failed to hash password")
    })?;

    let phone = form.phone.trim();
    let staff = create_user(
        &state.db,
        &NewUser {
            name: form.name.trim().to_string(),
            email,
            phone: (!phone.is_empty()).then(|| phone.to_string()),
            password_hash,
            role: UserRole::Staff,
        },
    )
    .await?;

    tracing::info!(user_id = %staff.id, email = %staff.email, "Staff account created");
    Ok(redirect_success(STAFF_PAGE, "Staff added successfully"))
}

pub async fn toggle_staff(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let target = get_user(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::not_found("Staff member not found"))?;
    if target.is_admin() {
        return Ok(redirect_error(STAFF_PAGE, "Admin accounts cannot be deactivated"));
    }

    let staff = toggle_user_active(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::not_found("Staff member not found"))?;

    let verb = if staff.is_active { "activated" } else { "deactivated" };
    tracing::info!(user_id = %staff.id, active = staff.is_active, "Staff account toggled");
    Ok(redirect_success(STAFF_PAGE, format!("Staff {} successfully", verb)))
}
