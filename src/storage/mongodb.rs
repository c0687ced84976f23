//! MongoDB storage backend using the official MongoDB async driver.
//!
//! # Feature flag
//!
//! Gated behind `mongodb_backend` (enabled by default):
//! ```toml
//! [dependencies]
//! storefront = { version = "0.1", features = ["mongodb_backend"] }
//! ```
//!
//! # Storage model
//!
//! Two collections: `products` keyed by the external integer product id, and
//! `orders` keyed by a generated UUID. Entities are serialized via
//! `serde_json::Value` as an intermediate format, then converted to BSON
//! documents, with the `id` field mapped to MongoDB's `_id` convention.
//!
//! # Order placement
//!
//! `place_order` runs inside a `ClientSession` transaction, so it requires a
//! replica set (or a sharded cluster); a standalone `mongod` rejects
//! `startTransaction`. Each inventory decrement is additionally guarded by an
//! `availableInventory >= quantity` filter, so a conflicting concurrent debit
//! that slipped past the read is detected as a shortfall instead of driving
//! inventory negative. Transient write-write conflicts rerun the transaction
//! body against committed state, so a losing order reports a shortfall
//! rather than a backend fault.

use anyhow::anyhow;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{Bson, Document, doc};
use mongodb::error::{
    ErrorKind, TRANSIENT_TRANSACTION_ERROR, UNKNOWN_TRANSACTION_COMMIT_RESULT, WriteFailure,
};
use mongodb::options::ReturnDocument;
use mongodb::{Client, ClientSession, Collection, Database};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::core::error::{StoreError, StoreResult};
use crate::core::order::{Order, OrderRequest};
use crate::core::product::{NewProduct, Product, ProductPatch, SearchQuery};

use super::Store;

const PRODUCTS: &str = "products";
const ORDERS: &str = "orders";

/// Upper bound on transaction retries when racing orders keep conflicting.
const MAX_TRANSACTION_ATTEMPTS: u32 = 8;

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

/// Serialize an entity into a BSON document, renaming `id` → `_id`.
fn to_document<T: Serialize>(value: &T) -> StoreResult<Document> {
    let json =
        serde_json::to_value(value).map_err(|e| anyhow!("failed to serialize entity: {e}"))?;
    let bson = mongodb::bson::to_bson(&json)
        .map_err(|e| anyhow!("failed to convert JSON to BSON: {e}"))?;

    let mut document = match bson {
        Bson::Document(d) => d,
        _ => return Err(anyhow!("expected a JSON object, got a non-object value").into()),
    };

    if let Some(id) = document.remove("id") {
        document.insert("_id", id);
    }

    Ok(document)
}

/// Deserialize a BSON document back into an entity, renaming `_id` → `id`.
fn from_document<T: DeserializeOwned>(mut document: Document) -> StoreResult<T> {
    if let Some(id) = document.remove("_id") {
        document.insert("id", id);
    }

    let json = Bson::Document(document).into_relaxed_extjson();
    serde_json::from_value(json)
        .map_err(|e| anyhow!("failed to deserialize entity from document: {e}").into())
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_err)) if write_err.code == 11000
    )
}

/// True when a backend fault carries the driver's transient-transaction
/// label, meaning the whole transaction body may be retried.
fn is_transient_transaction_error(err: &StoreError) -> bool {
    match err {
        StoreError::Backend(source) => source
            .downcast_ref::<mongodb::error::Error>()
            .is_some_and(|e| e.contains_label(TRANSIENT_TRANSACTION_ERROR)),
        _ => false,
    }
}

/// Serialize an order, storing `created_at` as a BSON `DateTime` so the
/// newest-first sort compares chronologically rather than lexicographically.
fn order_to_document(order: &Order) -> StoreResult<Document> {
    let mut document = to_document(order)?;
    document.insert(
        "created_at",
        mongodb::bson::DateTime::from_millis(order.created_at.timestamp_millis()),
    );
    Ok(document)
}

/// Commit, retrying while the outcome is unknown. A transient error is
/// returned so the caller can rerun the whole transaction body.
async fn commit_with_retry(session: &mut ClientSession) -> Result<(), mongodb::error::Error> {
    loop {
        match session.commit_transaction().await {
            Ok(()) => return Ok(()),
            Err(e) if e.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT) => {
                tracing::warn!(error = %e, "commit outcome unknown, retrying commit");
            }
            Err(e) => return Err(e),
        }
    }
}

fn order_from_document(mut document: Document) -> StoreResult<Order> {
    let millis = match document.get("created_at") {
        Some(Bson::DateTime(dt)) => Some(dt.timestamp_millis()),
        _ => None,
    };
    if let Some(millis) = millis {
        let created_at = chrono::DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| anyhow!("order timestamp out of range: {millis}"))?;
        document.insert("created_at", created_at.to_rfc3339());
    }
    from_document(document)
}

// ---------------------------------------------------------------------------
// MongoStore
// ---------------------------------------------------------------------------

/// Production store backed by MongoDB.
///
/// Holds the `Client` (needed to open sessions for order transactions) next
/// to the `Database` handle. Constructed once at startup via
/// [`MongoStore::connect`] and passed to the router explicitly; request
/// handling never starts before the connection has been verified.
#[derive(Clone, Debug)]
pub struct MongoStore {
    client: Client,
    database: Database,
}

impl MongoStore {
    /// Connect to MongoDB and verify the connection with a ping.
    pub async fn connect(url: &str, database_name: &str) -> StoreResult<Self> {
        let client = Client::with_uri_str(url)
            .await
            .map_err(|e| anyhow!("failed to connect to MongoDB at {url}: {e}"))?;
        let database = client.database(database_name);

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| anyhow!("MongoDB ping failed: {e}"))?;

        tracing::info!(database = database_name, "connected to MongoDB");
        Ok(Self { client, database })
    }

    /// Get a reference to the underlying database.
    pub fn database(&self) -> &Database {
        &self.database
    }

    fn products(&self) -> Collection<Document> {
        self.database.collection(PRODUCTS)
    }

    fn orders(&self) -> Collection<Document> {
        self.database.collection(ORDERS)
    }

    /// Next free product id: one past the current maximum `_id`.
    async fn next_product_id(&self) -> StoreResult<i64> {
        let newest = self
            .products()
            .find_one(doc! {})
            .sort(doc! { "_id": -1 })
            .projection(doc! { "_id": 1 })
            .await
            .map_err(|e| anyhow!("failed to query max product id: {e}"))?;

        Ok(newest
            .and_then(|d| d.get("_id").and_then(Bson::as_i64))
            .map_or(1, |max| max + 1))
    }

    /// Debit every line item and insert the order, all inside the given
    /// session's transaction. Any error here must be followed by an abort.
    /// Driver errors keep their source so the caller can inspect transaction
    /// labels.
    async fn debit_and_insert(
        &self,
        session: &mut ClientSession,
        order: &Order,
    ) -> StoreResult<()> {
        for item in order.line_items() {
            let document = self
                .products()
                .find_one(doc! { "_id": item.product_id })
                .session(&mut *session)
                .await
                .map_err(|e| {
                    anyhow::Error::new(e)
                        .context(format!("failed to look up product {}", item.product_id))
                })?
                .ok_or(StoreError::ProductNotFound {
                    id: item.product_id,
                })?;
            let product: Product = from_document(document)?;

            if item.quantity > product.available_inventory {
                return Err(StoreError::InsufficientInventory {
                    id: item.product_id,
                    requested: item.quantity,
                    available: product.available_inventory,
                });
            }

            // Guarded decrement: the filter re-checks the stock level at
            // write time, so a conflicting debit that raced past the read
            // above surfaces as a shortfall rather than an oversell.
            let result = self
                .products()
                .update_one(
                    doc! {
                        "_id": item.product_id,
                        "availableInventory": { "$gte": i64::from(item.quantity) },
                    },
                    doc! { "$inc": { "availableInventory": -i64::from(item.quantity) } },
                )
                .session(&mut *session)
                .await
                .map_err(|e| {
                    anyhow::Error::new(e)
                        .context(format!("failed to debit product {}", item.product_id))
                })?;

            if result.modified_count == 0 {
                return Err(StoreError::InsufficientInventory {
                    id: item.product_id,
                    requested: item.quantity,
                    available: product.available_inventory,
                });
            }
        }

        self.orders()
            .insert_one(order_to_document(order)?)
            .session(session)
            .await
            .map_err(|e| anyhow::Error::new(e).context("failed to insert order"))?;

        Ok(())
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let cursor = self
            .products()
            .find(doc! {})
            .sort(doc! { "_id": 1 })
            .await
            .map_err(|e| anyhow!("failed to list products: {e}"))?;

        let documents: Vec<Document> = cursor
            .try_collect()
            .await
            .map_err(|e| anyhow!("failed to collect products: {e}"))?;

        documents.into_iter().map(from_document).collect()
    }

    async fn insert_product(&self, product: NewProduct) -> StoreResult<i64> {
        if let Some(id) = product.id {
            let document = to_document(&product.into_product(id))?;
            self.products().insert_one(document).await.map_err(|e| {
                if is_duplicate_key(&e) {
                    StoreError::ProductExists { id }
                } else {
                    anyhow!("failed to insert product: {e}").into()
                }
            })?;
            return Ok(id);
        }

        // Allocation races with concurrent omitted-id inserts; a duplicate
        // key here means another insert claimed the id first, so allocate
        // again instead of reporting a conflict the caller never caused.
        loop {
            let id = self.next_product_id().await?;
            let document = to_document(&product.clone().into_product(id))?;
            match self.products().insert_one(document).await {
                Ok(_) => return Ok(id),
                Err(e) if is_duplicate_key(&e) => {
                    tracing::debug!(id, "allocated product id taken, retrying");
                }
                Err(e) => return Err(anyhow!("failed to insert product: {e}").into()),
            }
        }
    }

    async fn update_product(&self, id: i64, patch: ProductPatch) -> StoreResult<Product> {
        let document = if patch.is_empty() {
            self.products()
                .find_one(doc! { "_id": id })
                .await
                .map_err(|e| anyhow!("failed to look up product {id}: {e}"))?
        } else {
            let set = to_document(&patch)?;
            self.products()
                .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
                .return_document(ReturnDocument::After)
                .await
                .map_err(|e| anyhow!("failed to update product {id}: {e}"))?
        };

        let document = document.ok_or(StoreError::ProductNotFound { id })?;
        from_document(document)
    }

    async fn search_products(&self, query: &str) -> StoreResult<Vec<Product>> {
        let query = SearchQuery::new(query);
        let pattern = regex::escape(query.raw());

        let mut clauses = vec![
            doc! { "title": { "$regex": &pattern, "$options": "i" } },
            doc! { "description": { "$regex": &pattern, "$options": "i" } },
            doc! { "location": { "$regex": &pattern, "$options": "i" } },
            // Price matches as a string, mirroring the text fields
            doc! { "$expr": { "$regexMatch": {
                "input": { "$toString": "$price" },
                "regex": &pattern,
            } } },
        ];
        if let Some(n) = query.numeric() {
            clauses.push(doc! { "availableInventory": n });
        }

        let cursor = self
            .products()
            .find(doc! { "$or": clauses })
            .sort(doc! { "_id": 1 })
            .await
            .map_err(|e| anyhow!("failed to search products: {e}"))?;

        let documents: Vec<Document> = cursor
            .try_collect()
            .await
            .map_err(|e| anyhow!("failed to collect search results: {e}"))?;

        documents.into_iter().map(from_document).collect()
    }

    async fn list_orders(&self) -> StoreResult<Vec<Order>> {
        let cursor = self
            .orders()
            .find(doc! {})
            .sort(doc! { "created_at": -1 })
            .await
            .map_err(|e| anyhow!("failed to list orders: {e}"))?;

        let documents: Vec<Document> = cursor
            .try_collect()
            .await
            .map_err(|e| anyhow!("failed to collect orders: {e}"))?;

        documents.into_iter().map(order_from_document).collect()
    }

    async fn place_order(&self, request: OrderRequest) -> StoreResult<Order> {
        request.validate()?;
        let order = Order::from_request(request);

        let mut session = self
            .client
            .start_session()
            .await
            .map_err(|e| anyhow!("failed to start session: {e}"))?;

        // A write-write conflict between racing transactions carries the
        // transient label. Retrying the whole body re-reads committed state,
        // so a lost inventory race reports a shortfall instead of a backend
        // fault. Business errors are returned as-is, never retried.
        for attempt in 1..=MAX_TRANSACTION_ATTEMPTS {
            session
                .start_transaction()
                .await
                .map_err(|e| anyhow!("failed to start transaction: {e}"))?;

            match self.debit_and_insert(&mut session, &order).await {
                Ok(()) => match commit_with_retry(&mut session).await {
                    Ok(()) => {
                        tracing::debug!(order_id = %order.id, "order committed");
                        return Ok(order);
                    }
                    Err(e) if e.contains_label(TRANSIENT_TRANSACTION_ERROR) => {
                        tracing::debug!(attempt, error = %e, "transient commit failure, retrying transaction");
                    }
                    Err(e) => {
                        return Err(anyhow!("failed to commit order transaction: {e}").into());
                    }
                },
                Err(err) => {
                    // Best-effort abort; the server also times the transaction out
                    if let Err(abort_err) = session.abort_transaction().await {
                        tracing::warn!(error = %abort_err, "failed to abort order transaction");
                    }
                    if !is_transient_transaction_error(&err) {
                        return Err(err);
                    }
                    tracing::debug!(attempt, order_id = %order.id, "transaction conflict, retrying");
                }
            }
        }

        Err(anyhow!("order transaction still conflicting after {MAX_TRANSACTION_ATTEMPTS} attempts").into())
    }
}
