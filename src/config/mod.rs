use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub uploads: UploadConfig,
    #[serde(default)]
    pub business: BusinessConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
        }
    }
}

impl ServerConfig {
    /// Directory holding uploaded product images
    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Name of the bootstrap admin account
    #[serde(default = "default_admin_name")]
    pub admin_name: String,
    /// Email of the bootstrap admin account, created on first start
    #[serde(default = "default_admin_email")]
    pub admin_email: String,
    /// Initial password of the bootstrap admin account
    #[serde(default = "default_admin_password")]
    pub admin_password: String,
    /// Lifetime of a login session in days
    #[serde(default = "default_session_ttl_days")]
    pub session_ttl_days: i64,
    /// Mark the session cookie `Secure` (enable behind HTTPS)
    #[serde(default)]
    pub secure_cookies: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_name: default_admin_name(),
            admin_email: default_admin_email(),
            admin_password: default_admin_password(),
            session_ttl_days: default_session_ttl_days(),
            secure_cookies: false,
        }
    }
}

fn default_admin_name() -> String {
    "Admin".to_string()
}

fn default_admin_email() -> String {
    "admin@rental.com".to_string()
}

fn default_admin_password() -> String {
    "admin123".to_string()
}

fn default_session_ttl_days() -> i64 {
    7
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Maximum request body size in bytes (multipart uploads included)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_max_body_bytes() -> usize {
    16 * 1024 * 1024
}

/// Shop details printed on invoices and packing slips
#[derive(Debug, Clone, Deserialize)]
pub struct BusinessConfig {
    #[serde(default = "default_shop_name")]
    pub name: String,
    #[serde(default = "default_contact")]
    pub contact: String,
    #[serde(default = "default_address")]
    pub address: Vec<String>,
    #[serde(default)]
    pub gstin: Option<String>,
    #[serde(default = "default_footer")]
    pub footer: String,
}

impl Default for BusinessConfig {
    fn default() -> Self {
        Self {
            name: default_shop_name(),
            contact: default_contact(),
            address: default_address(),
            gstin: None,
            footer: default_footer(),
        }
    }
}

fn default_shop_name() -> String {
    "NERAA RENTAL HOUSE".to_string()
}

fn default_contact() -> String {
    "Contact: +91 95588 25555, +91 94294 29228".to_string()
}

fn default_address() -> Vec<String> {
    vec![
        "First Floor, Shivalay Complex, Near Vrajbhusan School,".to_string(),
        "Ranjitsagar Road, Jamnagar-361005, Gujarat".to_string(),
    ]
}

fn default_footer() -> String {
    "Thank you for choosing NERAA RENTAL HOUSE!".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_rate_limit_enabled")]
    pub enabled: bool,
    /// Login attempts allowed per client IP per window
    #[serde(default = "default_login_attempts")]
    pub login_attempts_per_window: u32,
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
    /// Seconds between sweeps of stale limiter entries
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_rate_limit_enabled(),
            login_attempts_per_window: default_login_attempts(),
            window_seconds: default_window_seconds(),
            cleanup_interval: default_cleanup_interval(),
        }
    }
}

fn default_rate_limit_enabled() -> bool {
    true
}

fn default_login_attempts() -> u32 {
    20
}

fn default_window_seconds() -> u64 {
    60
}

fn default_cleanup_interval() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| "Failed to parse configuration file")?;
            Ok(config)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            uploads: UploadConfig::default(),
            business: BusinessConfig::default(),
            rate_limit: RateLimitConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
