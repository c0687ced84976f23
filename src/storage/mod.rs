//! Storage backends for the product catalog and the order log.

pub mod in_memory;
#[cfg(feature = "mongodb_backend")]
pub mod mongodb;

pub use in_memory::InMemoryStore;
#[cfg(feature = "mongodb_backend")]
pub use mongodb::MongoStore;

use async_trait::async_trait;

use crate::core::error::StoreResult;
use crate::core::order::{Order, OrderRequest};
use crate::core::product::{NewProduct, Product, ProductPatch};

/// Storage seam between the HTTP handlers and a concrete backend.
///
/// Every method is a single request-scoped operation. The one exception in
/// complexity is [`place_order`](Store::place_order), which must run its
/// read/check/write sequence inside one atomic transaction scope so that
/// concurrent orders on overlapping products are serialized or
/// conflict-detected by the store, not by application locks.
#[async_trait]
pub trait Store: Send + Sync {
    /// All products in the catalog.
    async fn list_products(&self) -> StoreResult<Vec<Product>>;

    /// Insert a product, allocating an id when the request omits one.
    ///
    /// Returns the id under which the product was stored. An explicit id
    /// that is already taken is a `ProductExists` error.
    async fn insert_product(&self, product: NewProduct) -> StoreResult<i64>;

    /// Merge the present patch fields into an existing product and return
    /// the updated record. Unknown id is a `ProductNotFound` error.
    async fn update_product(&self, id: i64, patch: ProductPatch) -> StoreResult<Product>;

    /// Free-text search over the catalog (see
    /// [`SearchQuery`](crate::core::product::SearchQuery) for the matching
    /// rules).
    async fn search_products(&self, query: &str) -> StoreResult<Vec<Product>>;

    /// All placed orders, newest first.
    async fn list_orders(&self) -> StoreResult<Vec<Order>>;

    /// Atomically validate stock and commit a sale.
    ///
    /// Line items are processed strictly in input order; the first failing
    /// item aborts the whole order. On any error (validation, unknown
    /// product, inventory shortfall, commit failure) zero state change
    /// persists: no partial debits, no order record.
    async fn place_order(&self, request: OrderRequest) -> StoreResult<Order>;
}
