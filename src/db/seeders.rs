//! Database seeders for built-in data
//!
//! Runs on every startup; only inserts what is missing.

use anyhow::{anyhow, Result};
use sqlx::SqlitePool;
use tracing::info;

use super::models::{create_user, find_user_by_email, NewUser, UserRole};
use crate::api::auth::hash_password;
use crate::config::AuthConfig;

/// Create the bootstrap admin account unless a user with its email exists
pub async fn ensure_admin_user(pool: &SqlitePool, auth: &AuthConfig) -> Result<()> {
    if find_user_by_email(pool, &auth.admin_email).await?.is_some() {
        return Ok(());
    }

    let password_hash = hash_password(&auth.admin_password)
        .map_err(|e| anyhow!("Failed to hash admin password: {}", e))?;

    create_user(
        pool,
        &NewUser {
            name: auth.admin_name.clone(),
            email: auth.admin_email.clone(),
            phone: None,
            password_hash,
            role: UserRole::Admin,
        },
    )
    .await?;

    info!(email = %auth.admin_email, "Created admin account");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::verify_password;
    use crate::db::init_in_memory;

    #[tokio::test]
    async fn test_admin_seeded_once() {
        let db = init_in_memory().await.unwrap();
        let auth = AuthConfig::default();

        ensure_admin_user(&db, &auth).await.unwrap();
        ensure_admin_user(&db, &auth).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(count, 1);

        let admin = find_user_by_email(&db, "admin@rental.com").await.unwrap().unwrap();
        assert!(admin.is_admin());
        assert!(verify_password("admin123", &admin.password_hash));
    }
}
