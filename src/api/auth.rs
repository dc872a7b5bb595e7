use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use askama::Template;
use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use rand::Rng;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use super::error::AppError;
use crate::db::{create_session, delete_expired_sessions, delete_session, find_session_user, find_user_by_email, User};
use crate::ui::LoginTemplate;
use crate::AppState;

/// Name of the cookie carrying the raw session token
pub const SESSION_COOKIE: &str = "rental_session";

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Generate a random token
pub fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// Hash a token for storage
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Create a session for `user` and return the raw token for the cookie
pub async fn start_session(state: &AppState, user: &User) -> Result<String, AppError> {
    let token = generate_token();
    let expires_at = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::days(state.config.auth.session_ttl_days))
        .ok_or_else(|| AppError::internal("Session expiry out of range"))?
        .to_rfc3339();

    match delete_expired_sessions(&state.db).await {
        Ok(0) => {}
        Ok(purged) => tracing::debug!(purged, "Removed expired sessions"),
        Err(e) => tracing::warn!(error = %e, "Failed to remove expired sessions"),
    }

    create_session(&state.db, &user.id, &hash_token(&token), &expires_at).await?;
    Ok(token)
}

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Resolve the session cookie to its user, if the session is valid
pub async fn current_user(state: &AppState, headers: &HeaderMap) -> Result<Option<User>, AppError> {
    let jar = CookieJar::from_headers(headers);
    let token = match jar.get(SESSION_COOKIE) {
        Some(cookie) if !cookie.value().is_empty() => cookie.value().to_string(),
        _ => return Ok(None),
    };

    Ok(find_session_user(&state.db, &hash_token(&token)).await?)
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

fn login_page_response(state: &AppState, status: StatusCode, error: Option<String>, email: String) -> Response {
    let template = LoginTemplate {
        business_name: state.config.business.name.clone(),
        error,
        email,
    };
    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => AppError::internal(format!("Template error: {}", e)).into_response(),
    }
}

/// Login page; signed-in users go straight to their dashboard
pub async fn login_page(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    match current_user(&state, &headers).await {
        Ok(Some(_)) => Redirect::to("/").into_response(),
        Ok(None) => login_page_response(&state, StatusCode::OK, None, String::new()),
        Err(e) => e.into_response(),
    }
}

/// Login form submission
pub async fn login_submit(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let email = form.email.trim().to_string();

    let user = match find_user_by_email(&state.db, &email).await {
        Ok(user) => user,
        Err(e) => return AppError::from(e).into_response(),
    };

    let user = match user {
        Some(user) if verify_password(&form.password, &user.password_hash) => user,
        _ => {
            tracing::warn!(email = %email, "Failed login attempt");
            return login_page_response(
                &state,
                StatusCode::UNAUTHORIZED,
                Some("Invalid email or password".to_string()),
                email,
            );
        }
    };

    if !user.is_active {
        tracing::warn!(email = %email, "Login attempt on deactivated account");
        return login_page_response(
            &state,
            StatusCode::FORBIDDEN,
            Some("Account deactivated. Contact admin.".to_string()),
            email,
        );
    }

    let token = match start_session(&state, &user).await {
        Ok(token) => token,
        Err(e) => return e.into_response(),
    };

    tracing::info!(user_id = %user.id, role = %user.role, "User logged in");

    let jar = jar.add(session_cookie(token, state.config.auth.secure_cookies));
    (jar, Redirect::to("/")).into_response()
}

/// Drop the session and clear the cookie
pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if let Err(e) = delete_session(&state.db, &hash_token(cookie.value())).await {
            return AppError::from(e).into_response();
        }
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Redirect::to("/login")).into_response()
}

/// Middleware for the admin area: anonymous users are sent to login,
/// signed-in non-admins get 403.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let user = match current_user(&state, request.headers()).await {
        Ok(Some(user)) => user,
        Ok(None) => return Redirect::to("/login").into_response(),
        Err(e) => return e.into_response(),
    };

    if !user.is_admin() {
        tracing::warn!(user_id = %user.id, path = %request.uri().path(), "Non-admin denied");
        return AppError::forbidden("Admin access required").into_response();
    }

    request.extensions_mut().insert(user);
    next.run(request).await
}

/// Extractor for the signed-in user. Requests without a valid session are
/// redirected to the login page.
#[async_trait]
impl FromRequestParts<Arc<AppState>> for User {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<User>() {
            return Ok(user.clone());
        }

        match current_user(state, &parts.headers).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(Redirect::to("/login").into_response()),
            Err(e) => Err(e.into_response()),
        }
    }
}
