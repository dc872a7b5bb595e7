//! Database models split into domain-specific modules.
//!
//! Each module holds the row types for one table family together with the
//! queries that read and write them.

pub mod customer;
pub mod invoice;
pub mod order;
pub mod product;
pub mod stats;
pub mod user;

pub use customer::*;
pub use invoice::*;
pub use order::*;
pub use product::*;
pub use stats::*;
pub use user::*;
