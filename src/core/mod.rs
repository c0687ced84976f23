//! Domain core: models, validation, and the error taxonomy.

pub mod error;
pub mod order;
pub mod product;

pub use error::{StoreError, StoreResult};
pub use order::{LineItem, Order, OrderRequest};
pub use product::{NewProduct, Product, ProductPatch, SearchQuery};
