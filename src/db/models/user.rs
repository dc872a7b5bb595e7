//! User and session models.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// Account role. Fixed when the account is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Manages catalog, staff, and every order
    Admin,
    /// Creates orders and manages their own pending ones
    Staff,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Staff => "staff",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "staff" => Ok(UserRole::Staff),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    /// Unknown role strings fall back to the least privileged role
    pub fn role_enum(&self) -> UserRole {
        self.role.parse().unwrap_or(UserRole::Staff)
    }

    pub fn is_admin(&self) -> bool {
        self.role_enum() == UserRole::Admin
    }

    pub fn phone_display(&self) -> String {
        self.phone.clone().unwrap_or_else(|| "-".to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub token_hash: String,
    pub expires_at: String,
    pub created_at: String,
}

/// Fields for a new account; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub role: UserRole,
}

pub async fn get_user(db: &SqlitePool, id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn find_user_by_email(db: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ? COLLATE NOCASE")
        .bind(email)
        .fetch_optional(db)
        .await
}

pub async fn create_user(db: &SqlitePool, new_user: &NewUser) -> Result<User, sqlx::Error> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO users (id, name, email, phone, password_hash, role, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&new_user.name)
    .bind(&new_user.email)
    .bind(&new_user.phone)
    .bind(&new_user.password_hash)
    .bind(new_user.role.as_str())
    .bind(&now)
    .bind(&now)
    .execute(db)
    .await?;

    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(&id)
        .fetch_one(db)
        .await
}

pub async fn list_users_by_role(db: &SqlitePool, role: UserRole) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE role = ? ORDER BY name")
        .bind(role.as_str())
        .fetch_all(db)
        .await
}

/// Flip the active flag and return the updated user
pub async fn toggle_user_active(db: &SqlitePool, id: &str) -> Result<Option<User>, sqlx::Error> {
    let now = chrono::Utc::now().to_rfc3339();
    let result = sqlx::query(
        "UPDATE users SET is_active = NOT is_active, updated_at = ? WHERE id = ?",
    )
    .bind(&now)
    .bind(id)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    // Deactivated accounts lose their open sessions
    sqlx::query(
        "DELETE FROM sessions WHERE user_id = ? AND user_id IN (SELECT id FROM users WHERE is_active = 0)",
    )
    .bind(id)
    .execute(db)
    .await?;

    get_user(db, id).await
}

pub async fn create_session(
    db: &SqlitePool,
    user_id: &str,
    token_hash: &str,
    expires_at: &str,
) -> Result<(), sqlx::Error> {
    let session_id = uuid::Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO sessions (id, user_id, token_hash, expires_at, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&session_id)
    .bind(user_id)
    .bind(token_hash)
    .bind(expires_at)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(db)
    .await?;
    Ok(())
}

/// Resolve a session token hash to its active user, ignoring expired sessions
pub async fn find_session_user(db: &SqlitePool, token_hash: &str) -> Result<Option<User>, sqlx::Error> {
    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query_as::<_, User>(
        r#"
        SELECT u.* FROM sessions s
        JOIN users u ON u.id = s.user_id
        WHERE s.token_hash = ? AND s.expires_at > ? AND u.is_active = 1
        "#,
    )
    .bind(token_hash)
    .bind(&now)
    .fetch_optional(db)
    .await
}

pub async fn delete_session(db: &SqlitePool, token_hash: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
        .bind(token_hash)
        .execute(db)
        .await?;
    Ok(())
}

/// Remove sessions past their expiry, returning how many were dropped
pub async fn delete_expired_sessions(db: &SqlitePool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_in_memory;

    fn staff(email: &str) -> NewUser {
        NewUser {
            name: "Riya".to_string(),
            email: email.to_string(),
            phone: Some("9000000001".to_string()),
            password_hash: "hash".to_string(),
            role: UserRole::Staff,
        }
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!("STAFF".parse::<UserRole>().unwrap(), UserRole::Staff);
        assert!("owner".parse::<UserRole>().is_err());
        assert_eq!(UserRole::Admin.to_string(), "admin");
    }

    #[tokio::test]
    async fn test_email_is_unique() {
        let db = init_in_memory().await.unwrap();
        create_user(&db, &staff("riya@rental.com")).await.unwrap();
        let err = create_user(&db, &staff("riya@rental.com")).await.unwrap_err();
        assert!(err.to_string().contains("UNIQUE"));
    }

    #[tokio::test]
    async fn test_deactivation_drops_sessions() {
        let db = init_in_memory().await.unwrap();
        let user = create_user(&db, &staff("riya@rental.com")).await.unwrap();
        let expires = (chrono::Utc::now() + chrono::Duration::days(1)).to_rfc3339();
        create_session(&db, &user.id, "abc", &expires).await.unwrap();
        assert!(find_session_user(&db, "abc").await.unwrap().is_some());

        let toggled = toggle_user_active(&db, &user.id).await.unwrap().unwrap();
        assert!(!toggled.is_active);
        assert!(find_session_user(&db, "abc").await.unwrap().is_none());

        let toggled = toggle_user_active(&db, &user.id).await.unwrap().unwrap();
        assert!(toggled.is_active);
    }

    #[tokio::test]
    async fn test_expired_session_is_ignored() {
        let db = init_in_memory().await.unwrap();
        let user = create_user(&db, &staff("riya@rental.com")).await.unwrap();
        let expired = (chrono::Utc::now() - chrono::Duration::hours(1)).to_rfc3339();
        create_session(&db, &user.id, "old", &expired).await.unwrap();
        assert!(find_session_user(&db, "old").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_sessions_are_purged() {
        let db = init_in_memory().await.unwrap();
        let user = create_user(&db, &staff("riya@rental.com")).await.unwrap();
        let expired = (chrono::Utc::now() - chrono::Duration::hours(1)).to_rfc3339();
        let live = (chrono::Utc::now() + chrono::Duration::days(1)).to_rfc3339();
        create_session(&db, &user.id, "old", &expired).await.unwrap();
        create_session(&db, &user.id, "new", &live).await.unwrap();

        assert_eq!(delete_expired_sessions(&db).await.unwrap(), 1);
        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions").fetch_one(&db).await.unwrap();
        assert_eq!(remaining, 1);
        assert!(find_session_user(&db, "new").await.unwrap().is_some());
        assert_eq!(delete_expired_sessions(&db).await.unwrap(), 0);
    }
}
