pub mod auth;
pub mod error;
mod orders;
pub mod rate_limit;
pub mod validation;

pub use error::{AppError, ErrorCode, JsonError, ValidationErrorBuilder};

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{ui, AppState};

pub fn create_router(state: Arc<AppState>) -> Router {
    // Login (public, rate limited per client IP)
    let login_routes = Router::new()
        .route("/login", get(auth::login_page).post(auth::login_submit))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_login,
        ));

    // Admin pages
    let admin_routes = ui::admin_router().layer(middleware::from_fn_with_state(
        state.clone(),
        auth::require_admin,
    ));

    // JSON endpoints for signed-in users
    let api_routes = Router::new()
        .route("/check-availability", post(orders::check_availability))
        .route("/orders/:id", get(orders::order_details));

    Router::new()
        .route("/health", get(health_check))
        .route("/logout", get(auth::logout))
        .merge(login_routes)
        .merge(ui::create_router())
        .nest("/admin", admin_routes)
        .nest("/api", api_routes)
        .nest_service("/uploads", ServeDir::new(state.images.dir()))
        .layer(middleware::from_fn(ui::clear_consumed_flash))
        .layer(DefaultBodyLimit::max(state.config.uploads.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::db::{
        create_user, ensure_admin_user, get_user, init_in_memory, insert_product, list_orders,
        list_users_by_role, toggle_user_active, NewProduct, NewUser, OrderFilter, User, UserRole,
    };

    async fn test_state(data_dir: &std::path::Path) -> Arc<AppState> {
        let mut config = Config::default();
        config.server.data_dir = data_dir.to_path_buf();
        let db = init_in_memory().await.unwrap();
        ensure_admin_user(&db, &config.auth).await.unwrap();
        Arc::new(AppState::new(config, db))
    }

    async fn session_cookie(state: &AppState, user: &User) -> String {
        let token = auth::start_session(state, user).await.unwrap();
        format!("{}={}", auth::SESSION_COOKIE, token)
    }

    async fn staff_user(state: &AppState) -> User {
        create_user(
            &state.db,
            &NewUser {
                name: "Kavya".to_string(),
                email: "kavya@rental.com".to_string(),
                phone: None,
                password_hash: auth::hash_password("secret1").unwrap(),
                role: UserRole::Staff,
            },
        )
        .await
        .unwrap()
    }

    async fn admin_user(state: &AppState) -> User {
        crate::db::find_user_by_email(&state.db, &state.config.auth.admin_email)
            .await
            .unwrap()
            .unwrap()
    }

    async fn send(state: &Arc<AppState>, request: Request<Body>) -> Response {
        create_router(state.clone()).oneshot(request).await.unwrap()
    }

    fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn post_form(uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    fn set_cookie(response: &Response) -> &str {
        response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8_lossy(&bytes).to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;

        let response = send(&state, get("/health", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "OK");
    }

    #[tokio::test]
    async fn test_admin_area_requires_admin() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;

        let response = send(&state, get("/admin/dashboard", None)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");

        let staff = staff_user(&state).await;
        let cookie = session_cookie(&state, &staff).await;
        let response = send(&state, get("/admin/dashboard", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = send(&state, get("/staff/dashboard", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Welcome, Kavya"));
    }

    #[tokio::test]
    async fn test_home_redirects_by_role() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;

        let admin = admin_user(&state).await;
        let cookie = session_cookie(&state, &admin).await;
        let response = send(&state, get("/", Some(&cookie))).await;
        assert_eq!(location(&response), "/admin/dashboard");

        let response = send(&state, get("/admin/dashboard", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Admin Dashboard"));
    }

    #[tokio::test]
    async fn test_login() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;
        staff_user(&state).await;

        let response = send(
            &state,
            post_form("/login", None, "email=KAVYA%40rental.com&password=secret1"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(set_cookie(&response).starts_with("rental_session="));

        let response = send(
            &state,
            post_form("/login", None, "email=kavya%40rental.com&password=wrong"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(body_text(response).await.contains("Invalid email or password"));
    }

    #[tokio::test]
    async fn test_order_flow_to_invoice_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;
        let staff = staff_user(&state).await;
        let cookie = session_cookie(&state, &staff).await;

        let product_id = insert_product(
            &state.db,
            &NewProduct {
                product_code: "LH-101".to_string(),
                name: "Red Lehenga".to_string(),
                rental_price: 2500.0,
                deposit_amount: 1000.0,
                image_path: None,
            },
        )
        .await
        .unwrap();

        let body = format!(
            "customer_name=Meera&customer_phone=9876543210&delivery_date=2026-11-01\
             &return_date=2026-11-03&product_ids={}&extra_description=Alteration&extra_amount=300",
            product_id
        );
        let response = send(&state, post_form("/orders/new", Some(&cookie), &body)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/staff/dashboard");

        let orders = list_orders(&state.db, &OrderFilter::default()).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].total_amount, 2800.0);

        let response = send(
            &state,
            get(&format!("/orders/{}/invoice", orders[0].id), Some(&cookie)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("LH-101"));

        let response = send(
            &state,
            get(&format!("/orders/{}/invoice/download", orders[0].id), Some(&cookie)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/pdf"
        );
        assert!(body_text(response).await.starts_with("%PDF"));
    }

    #[tokio::test]
    async fn test_invalid_order_is_rerendered() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;
        let staff = staff_user(&state).await;
        let cookie = session_cookie(&state, &staff).await;

        let body = "customer_name=Meera&customer_phone=98&delivery_date=2026-11-05&return_date=2026-11-01";
        let response = send(&state, post_form("/orders/new", Some(&cookie), body)).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let html = body_text(response).await;
        assert!(html.contains("Return date cannot be before delivery date"));
        assert!(html.contains("Select at least one product"));
    }

    #[tokio::test]
    async fn test_deactivated_account_cannot_log_in() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;
        let staff = staff_user(&state).await;
        toggle_user_active(&state.db, &staff.id).await.unwrap();

        let response = send(
            &state,
            post_form("/login", None, "email=kavya%40rental.com&password=secret1"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(!set_cookie(&response).starts_with("rental_session="));
        assert!(body_text(response).await.contains("Account deactivated. Contact admin."));
    }

    #[tokio::test]
    async fn test_admin_account_cannot_be_toggled() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;
        let admin = admin_user(&state).await;
        let cookie = session_cookie(&state, &admin).await;

        let response = send(
            &state,
            post_form(&format!("/admin/staff/{}/toggle", admin.id), Some(&cookie), ""),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/admin/staff");
        assert!(set_cookie(&response).starts_with("rental_flash="));

        let admin = get_user(&state.db, &admin.id).await.unwrap().unwrap();
        assert!(admin.is_active);
        let response = send(&state, get("/admin/dashboard", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_duplicate_staff_email_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;
        staff_user(&state).await;
        let admin = admin_user(&state).await;
        let cookie = session_cookie(&state, &admin).await;

        let response = send(
            &state,
            post_form(
                "/admin/staff",
                Some(&cookie),
                "name=Copy&email=KAVYA%40rental.com&phone=&password=secret1",
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/admin/staff");
        assert!(set_cookie(&response).starts_with("rental_flash="));

        let staff = list_users_by_role(&state.db, UserRole::Staff).await.unwrap();
        assert_eq!(staff.len(), 1);
        assert_eq!(staff[0].name, "Kavya");
    }
}
