//! Shared contract tests for `Store` implementations.
//!
//! The `store_contract_tests!` macro generates the full suite against any
//! backend; `in_memory_tests.rs` and `mongodb_tests.rs` invoke it with their
//! respective factories. The order-placement tests are the heart of the
//! suite: they pin down the all-or-nothing commit semantics and the
//! never-negative inventory invariant.

use storefront::core::order::OrderRequest;
use storefront::core::product::{NewProduct, Product};
// Re-exported so `use storage_harness::*;` brings the trait methods into
// scope for the generated tests.
pub use storefront::storage::Store;

/// Catalog fixture: ids 1..=3, inventories 5, 3, 5.
///
/// Titles, descriptions, locations, and prices deliberately contain neither
/// "5" nor "3" so the search tests can tell exact-inventory matches apart
/// from textual ones.
pub fn catalog_fixture() -> Vec<NewProduct> {
    vec![
        NewProduct {
            id: Some(1),
            title: "Alpha".to_string(),
            description: "first".to_string(),
            location: "north".to_string(),
            price: 11.0,
            available_inventory: 5,
        },
        NewProduct {
            id: Some(2),
            title: "Bravo".to_string(),
            description: "second".to_string(),
            location: "south".to_string(),
            price: 22.0,
            available_inventory: 3,
        },
        NewProduct {
            id: Some(3),
            title: "Charlie".to_string(),
            description: "third".to_string(),
            location: "east".to_string(),
            price: 44.0,
            available_inventory: 5,
        },
    ]
}

pub async fn seed_catalog<S: Store>(store: &S) {
    for product in catalog_fixture() {
        store.insert_product(product).await.expect("seed catalog");
    }
}

pub fn order_request(ids: &[i64], quantities: &[u32]) -> OrderRequest {
    OrderRequest {
        product_ids: ids.to_vec(),
        quantities: quantities.to_vec(),
        name: "Ada Lovelace".to_string(),
        phone: "555-0100".to_string(),
    }
}

pub async fn find_product<S: Store>(store: &S, id: i64) -> Product {
    store
        .list_products()
        .await
        .expect("list products")
        .into_iter()
        .find(|p| p.id == id)
        .unwrap_or_else(|| panic!("product {id} missing"))
}

pub async fn inventory_of<S: Store>(store: &S, id: i64) -> u32 {
    find_product(store, id).await.available_inventory
}

/// Generate the `Store` contract test suite for one backend.
///
/// `$factory` must produce an `impl Store` (awaited factories are fine,
/// e.g. `store_contract_tests!(clean_mongo_store().await)`).
#[macro_export]
macro_rules! store_contract_tests {
    ($factory:expr) => {
        mod store_contract {
            use super::*;
            use storefront::core::error::StoreError;

            // ==============================================================
            // Order placement: success path
            // ==============================================================

            #[tokio::test]
            async fn place_order_debits_each_product_and_records_one_order() {
                let store = $factory;
                seed_catalog(&store).await;

                let order = store
                    .place_order(order_request(&[1, 2], &[2, 3]))
                    .await
                    .unwrap();

                assert_eq!(order.product_ids, vec![1, 2]);
                assert_eq!(order.quantities, vec![2, 3]);
                assert_eq!(order.name, "Ada Lovelace");

                assert_eq!(inventory_of(&store, 1).await, 3);
                assert_eq!(inventory_of(&store, 2).await, 0);
                assert_eq!(inventory_of(&store, 3).await, 5);

                let orders = store.list_orders().await.unwrap();
                assert_eq!(orders.len(), 1);
                assert_eq!(orders[0].id, order.id);
            }

            #[tokio::test]
            async fn order_exhausting_stock_succeeds_then_next_is_rejected() {
                let store = $factory;
                seed_catalog(&store).await;

                store
                    .place_order(order_request(&[1], &[5]))
                    .await
                    .unwrap();
                assert_eq!(inventory_of(&store, 1).await, 0);

                let err = store
                    .place_order(order_request(&[1], &[1]))
                    .await
                    .unwrap_err();
                assert!(matches!(
                    err,
                    StoreError::InsufficientInventory { id: 1, .. }
                ));
                assert_eq!(inventory_of(&store, 1).await, 0);
                assert_eq!(store.list_orders().await.unwrap().len(), 1);
            }

            // ==============================================================
            // Order placement: rollback
            // ==============================================================

            #[tokio::test]
            async fn unknown_product_aborts_with_no_partial_debits() {
                let store = $factory;
                seed_catalog(&store).await;

                let err = store
                    .place_order(order_request(&[1, 99], &[2, 1]))
                    .await
                    .unwrap_err();

                assert!(matches!(err, StoreError::ProductNotFound { id: 99 }));
                assert_eq!(inventory_of(&store, 1).await, 5);
                assert!(store.list_orders().await.unwrap().is_empty());
            }

            #[tokio::test]
            async fn inventory_shortfall_aborts_with_no_partial_debits() {
                let store = $factory;
                seed_catalog(&store).await;

                // The first line item is valid on its own; the second exceeds
                // stock and must unwind everything.
                let err = store
                    .place_order(order_request(&[2, 1], &[1, 99]))
                    .await
                    .unwrap_err();

                assert!(matches!(
                    err,
                    StoreError::InsufficientInventory {
                        id: 1,
                        requested: 99,
                        available: 5,
                    }
                ));
                assert_eq!(inventory_of(&store, 1).await, 5);
                assert_eq!(inventory_of(&store, 2).await, 3);
                assert!(store.list_orders().await.unwrap().is_empty());
            }

            #[tokio::test]
            async fn validation_failures_have_no_side_effects() {
                let store = $factory;
                seed_catalog(&store).await;

                let mismatched = order_request(&[1, 2], &[1]);
                assert!(matches!(
                    store.place_order(mismatched).await.unwrap_err(),
                    StoreError::Validation { .. }
                ));

                let mut blank_name = order_request(&[1], &[1]);
                blank_name.name = String::new();
                assert!(store.place_order(blank_name).await.is_err());

                assert_eq!(inventory_of(&store, 1).await, 5);
                assert!(store.list_orders().await.unwrap().is_empty());
            }

            // ==============================================================
            // Order placement: concurrency
            // ==============================================================

            #[tokio::test]
            async fn concurrent_orders_on_same_product_never_oversell() {
                let store = $factory;
                seed_catalog(&store).await;

                // Product 1 has 5 in stock; two orders of 3 cannot both fit.
                let results = tokio::join!(
                    store.place_order(order_request(&[1], &[3])),
                    store.place_order(order_request(&[1], &[3])),
                );
                let results = [results.0, results.1];

                let successes = results.iter().filter(|r| r.is_ok()).count();
                assert_eq!(successes, 1, "exactly one racing order must win");

                // The loser must see the post-commit stock level, not a
                // backend fault from the write conflict.
                let loser = results
                    .into_iter()
                    .find(|r| r.is_err())
                    .unwrap()
                    .unwrap_err();
                assert!(matches!(
                    loser,
                    StoreError::InsufficientInventory { id: 1, .. }
                ));

                assert_eq!(inventory_of(&store, 1).await, 2);
                assert_eq!(store.list_orders().await.unwrap().len(), 1);
            }

            // ==============================================================
            // Product catalog
            // ==============================================================

            #[tokio::test]
            async fn insert_allocates_ids_past_the_maximum() {
                let store = $factory;
                seed_catalog(&store).await;

                let mut product = catalog_fixture().remove(0);
                product.id = None;
                product.title = "Delta".to_string();

                let id = store.insert_product(product).await.unwrap();
                assert_eq!(id, 4);
                assert_eq!(find_product(&store, 4).await.title, "Delta");
            }

            #[tokio::test]
            async fn concurrent_inserts_without_ids_get_distinct_ids() {
                let store = $factory;
                seed_catalog(&store).await;

                let mut first = catalog_fixture().remove(0);
                first.id = None;
                first.title = "Delta".to_string();
                let mut second = catalog_fixture().remove(0);
                second.id = None;
                second.title = "Echo".to_string();

                // Both must succeed even when the allocations collide.
                let (a, b) = tokio::join!(
                    store.insert_product(first),
                    store.insert_product(second),
                );
                let (a, b) = (a.unwrap(), b.unwrap());
                assert_ne!(a, b);
                assert!(a > 3 && b > 3);
            }

            #[tokio::test]
            async fn insert_rejects_duplicate_explicit_id() {
                let store = $factory;
                seed_catalog(&store).await;

                let duplicate = catalog_fixture().remove(0);
                let err = store.insert_product(duplicate).await.unwrap_err();
                assert!(matches!(err, StoreError::ProductExists { id: 1 }));
            }

            #[tokio::test]
            async fn update_merges_partial_fields() {
                let store = $factory;
                seed_catalog(&store).await;

                let updated = store
                    .update_product(
                        2,
                        storefront::core::product::ProductPatch {
                            price: Some(19.25),
                            available_inventory: Some(7),
                            ..Default::default()
                        },
                    )
                    .await
                    .unwrap();

                assert_eq!(updated.price, 19.25);
                assert_eq!(updated.available_inventory, 7);
                assert_eq!(updated.title, "Bravo");
                assert_eq!(updated.location, "south");
            }

            #[tokio::test]
            async fn update_unknown_id_is_not_found() {
                let store = $factory;
                seed_catalog(&store).await;

                let err = store
                    .update_product(99, Default::default())
                    .await
                    .unwrap_err();
                assert!(matches!(err, StoreError::ProductNotFound { id: 99 }));
            }

            // ==============================================================
            // Search
            // ==============================================================

            #[tokio::test]
            async fn integer_query_exact_matches_inventory() {
                let store = $factory;
                seed_catalog(&store).await;

                // Inventories are [5, 3, 5] and no text field contains "5"
                let mut ids: Vec<i64> = store
                    .search_products("5")
                    .await
                    .unwrap()
                    .into_iter()
                    .map(|p| p.id)
                    .collect();
                ids.sort();
                assert_eq!(ids, vec![1, 3]);
            }

            #[tokio::test]
            async fn text_query_matches_fields_case_insensitively() {
                let store = $factory;
                seed_catalog(&store).await;

                let hits = store.search_products("BRAVO").await.unwrap();
                assert_eq!(hits.len(), 1);
                assert_eq!(hits[0].id, 2);

                let hits = store.search_products("north").await.unwrap();
                assert_eq!(hits.len(), 1);
                assert_eq!(hits[0].id, 1);

                assert!(store.search_products("zebra").await.unwrap().is_empty());
            }

            #[tokio::test]
            async fn query_matches_price_as_string() {
                let store = $factory;
                seed_catalog(&store).await;

                let hits = store.search_products("22").await.unwrap();
                assert_eq!(hits.len(), 1);
                assert_eq!(hits[0].id, 2);
            }
        }
    };
}
