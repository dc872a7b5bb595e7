pub mod api;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod db;
pub mod invoice;
pub mod orders;
pub mod ui;
pub mod utils;

pub use db::DbPool;

use config::Config;
use std::sync::Arc;

use crate::api::rate_limit::RateLimiter;
use crate::catalog::ImageStore;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub rate_limiter: Arc<RateLimiter>,
    pub images: ImageStore,
}

impl AppState {
    pub fn new(config: Config, db: DbPool) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
        let images = ImageStore::new(config.server.uploads_dir());
        Self {
            config,
            db,
            rate_limiter,
            images,
        }
    }
}
