//! One-shot flash messages carried across a redirect in a cookie.

use axum::{
    async_trait,
    body::Body,
    extract::FromRequestParts,
    http::{header::SET_COOKIE, request::Parts, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

pub const FLASH_COOKIE: &str = "rental_flash";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flash {
    /// `success` or `error`
    pub kind: String,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: "success".to_string(),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: "error".to_string(),
            message: message.into(),
        }
    }

    pub fn errors(messages: Vec<String>) -> Vec<Self> {
        messages.into_iter().map(Flash::error).collect()
    }

    pub fn is_error(&self) -> bool {
        self.kind == "error"
    }
}

fn encode(flashes: &[Flash]) -> String {
    hex::encode(serde_json::to_vec(flashes).unwrap_or_default())
}

fn decode(value: &str) -> Vec<Flash> {
    hex::decode(value)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_default()
}

/// Flash messages left by the previous response
#[derive(Debug, Clone, Default)]
pub struct Flashes(pub Vec<Flash>);

impl Flashes {
    pub fn into_vec(self) -> Vec<Flash> {
        self.0
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Flashes {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        Ok(Flashes(
            jar.get(FLASH_COOKIE)
                .map(|cookie| decode(cookie.value()))
                .unwrap_or_default(),
        ))
    }
}

/// Redirect to `to`, showing `flashes` on the next page
pub fn redirect_with_flash(to: &str, flashes: Vec<Flash>) -> Response {
    let cookie = Cookie::build((FLASH_COOKIE, encode(&flashes)))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    (CookieJar::new().add(cookie), Redirect::to(to)).into_response()
}

pub fn redirect_success(to: &str, message: impl Into<String>) -> Response {
    redirect_with_flash(to, vec![Flash::success(message)])
}

pub fn redirect_error(to: &str, message: impl Into<String>) -> Response {
    redirect_with_flash(to, vec![Flash::error(message)])
}

/// Expire the flash cookie once a page has shown it. Redirects keep it so
/// the messages survive to the page they lead to.
pub async fn clear_consumed_flash(request: Request<Body>, next: Next) -> Response {
    let had_flash = CookieJar::from_headers(request.headers())
        .get(FLASH_COOKIE)
        .is_some();

    let mut response = next.run(request).await;
    if !had_flash || response.status().is_redirection() {
        return response;
    }

    let mut removal = Cookie::build((FLASH_COOKIE, "")).path("/").build();
    removal.make_removal();
    if let Ok(value) = HeaderValue::from_str(&removal.to_string()) {
        response.headers_mut().append(SET_COOKIE, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, StatusCode};

    #[test]
    fn test_cookie_value_round_trip() {
        let flashes = vec![Flash::success("Order created"), Flash::error("Row 2: price; \"quoted\"")];
        let value = encode(&flashes);

        assert!(value.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(decode(&value), flashes);
        assert!(decode("not-hex").is_empty());
    }

    #[test]
    fn test_redirect_sets_flash_cookie() {
        let response = redirect_success("/admin/staff", "Staff added successfully");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/admin/staff");
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("rental_flash="));
        assert!(cookie.contains("Path=/"));
    }
}
