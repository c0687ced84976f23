//! # Storefront
//!
//! REST backend for a single-page storefront: a product catalog, an
//! append-only order log, and a free-text search endpoint, served over a
//! document database.
//!
//! ## Architecture
//!
//! - **Core**: domain models ([`core::product`], [`core::order`]) and the
//!   typed error taxonomy ([`core::error`]). Core code returns
//!   [`StoreError`](core::error::StoreError); only the HTTP boundary maps
//!   errors to status codes.
//! - **Storage**: the [`storage::Store`] trait is the seam between handlers
//!   and backends. [`storage::InMemoryStore`] is always compiled (development
//!   and tests); `MongoStore` is the production backend behind the
//!   `mongodb_backend` feature flag.
//! - **Server**: axum router, CORS, static assets, graceful shutdown.
//!
//! ## Order placement
//!
//! The only multi-step flow is `Store::place_order`: every line item is
//! checked against live inventory and debited inside one atomic transaction
//! scope, then the order record is inserted in the same scope. Either all
//! debits and the order commit together, or nothing persists. Inventory can
//! never go negative.

pub mod config;
pub mod core;
pub mod server;
pub mod storage;

pub use crate::config::Config;
pub use crate::core::error::{StoreError, StoreResult};
pub use crate::core::order::{Order, OrderRequest};
pub use crate::core::product::{NewProduct, Product, ProductPatch};
pub use crate::storage::{InMemoryStore, Store};

#[cfg(feature = "mongodb_backend")]
pub use crate::storage::MongoStore;
