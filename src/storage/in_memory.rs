//! In-memory implementation of `Store` for testing and development.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use anyhow::anyhow;
use async_trait::async_trait;

use crate::core::error::{StoreError, StoreResult};
use crate::core::order::{Order, OrderRequest};
use crate::core::product::{NewProduct, Product, ProductPatch, SearchQuery};

use super::Store;

#[derive(Default)]
struct StoreState {
    products: BTreeMap<i64, Product>,
    orders: Vec<Order>,
}

/// In-memory store implementation.
///
/// Uses a single `RwLock` for thread-safe access; `place_order` runs its
/// whole read/check/write sequence under one write guard, which gives it
/// serializable semantics without a real transaction.
#[derive(Clone)]
pub struct InMemoryStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
        }
    }

    /// Create a store pre-populated with a catalog.
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let state = StoreState {
            products: products.into_iter().map(|p| (p.id, p)).collect(),
            orders: Vec::new(),
        };
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let state = self
            .state
            .read()
            .map_err(|e| anyhow!("failed to acquire read lock: {e}"))?;

        Ok(state.products.values().cloned().collect())
    }

    async fn insert_product(&self, product: NewProduct) -> StoreResult<i64> {
        let mut state = self
            .state
            .write()
            .map_err(|e| anyhow!("failed to acquire write lock: {e}"))?;

        let id = match product.id {
            Some(id) => {
                if state.products.contains_key(&id) {
                    return Err(StoreError::ProductExists { id });
                }
                id
            }
            // Next free id after the current maximum
            None => state.products.keys().next_back().map_or(1, |max| max + 1),
        };

        state.products.insert(id, product.into_product(id));
        Ok(id)
    }

    async fn update_product(&self, id: i64, patch: ProductPatch) -> StoreResult<Product> {
        let mut state = self
            .state
            .write()
            .map_err(|e| anyhow!("failed to acquire write lock: {e}"))?;

        let product = state
            .products
            .get_mut(&id)
            .ok_or(StoreError::ProductNotFound { id })?;

        patch.apply(product);
        Ok(product.clone())
    }

    async fn search_products(&self, query: &str) -> StoreResult<Vec<Product>> {
        let query = SearchQuery::new(query);
        let state = self
            .state
            .read()
            .map_err(|e| anyhow!("failed to acquire read lock: {e}"))?;

        Ok(state
            .products
            .values()
            .filter(|p| query.matches(p))
            .cloned()
            .collect())
    }

    async fn list_orders(&self) -> StoreResult<Vec<Order>> {
        let state = self
            .state
            .read()
            .map_err(|e| anyhow!("failed to acquire read lock: {e}"))?;

        // Newest first, matching the MongoDB backend's sort
        Ok(state.orders.iter().rev().cloned().collect())
    }

    async fn place_order(&self, request: OrderRequest) -> StoreResult<Order> {
        request.validate()?;
        let order = Order::from_request(request);

        let mut state = self
            .state
            .write()
            .map_err(|e| anyhow!("failed to acquire write lock: {e}"))?;

        // Stage the debits first so that a failure partway through leaves the
        // catalog untouched. The staging map also makes repeated line items
        // for the same product debit cumulatively instead of against a stale
        // read.
        let mut staged: HashMap<i64, u32> = HashMap::new();
        for item in order.line_items() {
            let product = state
                .products
                .get(&item.product_id)
                .ok_or(StoreError::ProductNotFound {
                    id: item.product_id,
                })?;

            let available = staged
                .get(&item.product_id)
                .copied()
                .unwrap_or(product.available_inventory);

            if item.quantity > available {
                return Err(StoreError::InsufficientInventory {
                    id: item.product_id,
                    requested: item.quantity,
                    available,
                });
            }
            staged.insert(item.product_id, available - item.quantity);
        }

        for (id, remaining) in staged {
            if let Some(product) = state.products.get_mut(&id) {
                product.available_inventory = remaining;
            }
        }
        state.orders.push(order.clone());

        Ok(order)
    }
}
