//! Command-line interface.
//!
//! Without a subcommand (or with `serve`) the binary runs the web server.
//! The remaining subcommands work directly on the configured data directory:
//! - `create-user` - Provision an admin or staff account
//! - `config check` - Validate the configuration file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::api::auth::hash_password;
use crate::api::validation::{validate_email, validate_password, validate_phone, validate_required};
use crate::config::Config;
use crate::db::{self, create_user, find_user_by_email, NewUser, UserRole};

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "rental-house")]
#[command(author, version, about = "Orders, catalog and invoices for a clothing rental shop", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "RENTAL_HOUSE_CONFIG", default_value = "rental-house.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Subcommand to run (if none, starts the server)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the web server (default)
    Serve,

    /// Create a user account
    CreateUser {
        /// Display name
        #[arg(long)]
        name: String,
        /// Login email
        #[arg(long)]
        email: String,
        /// Initial password (at least 6 characters)
        #[arg(long)]
        password: String,
        /// Account role
        #[arg(long, value_enum, default_value = "staff")]
        role: RoleArg,
        /// Contact phone number
        #[arg(long)]
        phone: Option<String>,
    },

    /// Configuration management commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    Admin,
    Staff,
}

impl From<RoleArg> for UserRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Admin => UserRole::Admin,
            RoleArg::Staff => UserRole::Staff,
        }
    }
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate configuration file
    Check,
}

impl Cli {
    /// Whether this invocation should start the server
    pub fn runs_server(&self) -> bool {
        matches!(self.command, None | Some(Commands::Serve))
    }
}

/// Run a non-server command
pub async fn run_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Some(Commands::CreateUser {
            name,
            email,
            password,
            role,
            phone,
        }) => {
            let config = Config::load(&cli.config)?;
            let pool = db::init(&config.server.data_dir).await?;
            let result = cmd_create_user(&pool, name, email, password, (*role).into(), phone.as_deref()).await;
            pool.close().await;
            result
        }
        Some(Commands::Config(ConfigCommands::Check)) => cmd_config_check(cli),
        // The server itself is started from main.rs
        Some(Commands::Serve) | None => Ok(()),
    }
}

/// Create an account after validating its fields
pub async fn cmd_create_user(
    pool: &db::DbPool,
    name: &str,
    email: &str,
    password: &str,
    role: UserRole,
    phone: Option<&str>,
) -> Result<()> {
    let phone = phone.map(str::trim).filter(|p| !p.is_empty());
    let problems: Vec<String> = [
        validate_required(name, "Name"),
        validate_email(email),
        validate_password(password),
        phone.map(validate_phone).unwrap_or(Ok(())),
    ]
    .into_iter()
    .filter_map(Result::err)
    .collect();
    if !problems.is_empty() {
        anyhow::bail!("Invalid user: {}", problems.join("; "));
    }

    let email = email.trim().to_lowercase();
    if find_user_by_email(pool, &email).await?.is_some() {
        anyhow::bail!("A user with email {} already exists", email);
    }

    let password_hash =
        hash_password(password).map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;

    let user = create_user(
        pool,
        &NewUser {
            name: name.trim().to_string(),
            email,
            phone: phone.map(str::to_string),
            password_hash,
            role,
        },
    )
    .await
    .context("Failed to create user")?;

    println!("[OK] Created {} account {} ({})", user.role, user.email, user.id);
    Ok(())
}

fn enabled(flag: bool) -> &'static str {
    if flag {
        "Enabled"
    } else {
        "Disabled"
    }
}

/// Validate and summarize the configuration file
fn cmd_config_check(cli: &Cli) -> Result<()> {
    let config_path = &cli.config;

    println!("Checking configuration file: {}", config_path.display());
    println!();

    if !config_path.exists() {
        println!("[!!] Configuration file not found: {}", config_path.display());
        println!();
        println!("A default configuration will be used when starting the server.");
        println!("To customize it, copy rental-house.example.toml to rental-house.toml");
        return Ok(());
    }

    match Config::load(config_path) {
        Ok(config) => {
            println!("[OK] Configuration file is valid!");
            println!();
            println!("=== Configuration Summary ===");
            println!();
            println!("Server:");
            println!("  Address:      {}:{}", config.server.host, config.server.port);
            println!("  Data Dir:     {}", config.server.data_dir.display());
            println!("  Uploads:      {}", config.server.uploads_dir().display());
            println!("  Body Limit:   {} bytes", config.uploads.max_body_bytes);
            println!();
            println!("Business:");
            println!("  Name:         {}", config.business.name);
            println!("  GSTIN:        {}", config.business.gstin.as_deref().unwrap_or("-"));
            println!();
            println!("Security:");
            println!("  Rate Limiting: {}", enabled(config.rate_limit.enabled));
            println!("  Secure Cookies: {}", enabled(config.auth.secure_cookies));
            println!("  Session TTL:  {} days", config.auth.session_ttl_days);
            println!();

            let mut warnings = Vec::new();
            if config.auth.admin_password == "admin123" {
                warnings.push("Bootstrap admin password is the default - change it after first login");
            }
            if !config.auth.secure_cookies {
                warnings.push("Session cookies are not marked Secure - enable behind HTTPS");
            }

            if !warnings.is_empty() {
                println!("Warnings:");
                for warning in warnings {
                    println!("  [!] {}", warning);
                }
                println!();
            }

            Ok(())
        }
        Err(e) => {
            println!("[!!] Configuration file is invalid!");
            println!();
            println!("Error: {:#}", e);
            println!();
            println!("Please check the configuration file syntax and try again.");
            anyhow::bail!("Invalid configuration file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::verify_password;
    use crate::db::init_in_memory;

    #[test]
    fn test_parse_create_user() {
        let cli = Cli::try_parse_from([
            "rental-house",
            "create-user",
            "--name",
            "Riya",
            "--email",
            "riya@rental.com",
            "--password",
            "secret1",
        ])
        .unwrap();

        assert!(!cli.runs_server());
        match cli.command {
            Some(Commands::CreateUser { role, phone, .. }) => {
                assert_eq!(role, RoleArg::Staff);
                assert!(phone.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_no_subcommand_runs_server() {
        let cli = Cli::try_parse_from(["rental-house", "--log-level", "debug"]).unwrap();
        assert!(cli.runs_server());
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[tokio::test]
    async fn test_create_user_command() {
        let pool = init_in_memory().await.unwrap();

        cmd_create_user(&pool, "Owner", "Owner@Rental.com", "secret1", UserRole::Admin, None)
            .await
            .unwrap();
        let user = find_user_by_email(&pool, "owner@rental.com").await.unwrap().unwrap();
        assert!(user.is_admin());
        assert!(verify_password("secret1", &user.password_hash));

        let duplicate =
            cmd_create_user(&pool, "Owner", "owner@rental.com", "secret1", UserRole::Staff, None).await;
        assert!(duplicate.is_err());

        let invalid = cmd_create_user(&pool, "", "nope", "123", UserRole::Staff, Some("12")).await;
        assert!(invalid.unwrap_err().to_string().starts_with("Invalid user:"));
    }
}
