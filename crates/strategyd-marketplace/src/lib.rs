//! The Marketplace Service (C9): publish, browse, and adopt strategies
//! across principals, layered thinly over the Strategy Store.

pub mod error;
pub mod service;

pub use error::{MarketplaceError, Result};
pub use service::MarketplaceService;
