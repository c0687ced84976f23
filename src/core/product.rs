//! Product catalog model and the free-text search predicate.

use serde::{Deserialize, Serialize};

/// A catalog entry.
///
/// `id` is an integer assigned externally (or allocated by the store when a
/// create request omits it). `available_inventory` is the only field the
/// order processor mutates; the `u32` representation keeps it non-negative
/// by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub location: String,
    pub price: f64,
    #[serde(rename = "availableInventory")]
    pub available_inventory: u32,
}

/// Request body for `POST /products`.
///
/// Identical to [`Product`] except that the id may be omitted, in which case
/// the store allocates the next free one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    pub description: String,
    pub location: String,
    pub price: f64,
    #[serde(rename = "availableInventory")]
    pub available_inventory: u32,
}

impl NewProduct {
    /// Materialize into a stored product under the given id.
    pub fn into_product(self, id: i64) -> Product {
        Product {
            id,
            title: self.title,
            description: self.description,
            location: self.location,
            price: self.price,
            available_inventory: self.available_inventory,
        }
    }
}

/// Partial update for `PUT /products/{id}`: absent fields keep their value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(
        rename = "availableInventory",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub available_inventory: Option<u32>,
}

impl ProductPatch {
    /// Merge the present fields into an existing product.
    pub fn apply(self, product: &mut Product) {
        if let Some(title) = self.title {
            product.title = title;
        }
        if let Some(description) = self.description {
            product.description = description;
        }
        if let Some(location) = self.location {
            product.location = location;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(inventory) = self.available_inventory {
            product.available_inventory = inventory;
        }
    }

    /// True when no field is present (merging would be a no-op).
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.location.is_none()
            && self.price.is_none()
            && self.available_inventory.is_none()
    }
}

/// A parsed free-text search query.
///
/// Matching rules, applied per product with `$or` semantics:
/// - case-insensitive substring against title, description, and location
/// - substring against the price rendered as a string
/// - exact match against `available_inventory` when the query parses as an
///   integer
#[derive(Debug, Clone)]
pub struct SearchQuery {
    raw: String,
    lowered: String,
    numeric: Option<i64>,
}

impl SearchQuery {
    pub fn new(query: &str) -> Self {
        Self {
            raw: query.to_string(),
            lowered: query.to_lowercase(),
            numeric: query.trim().parse::<i64>().ok(),
        }
    }

    /// The query text as received.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The query as an integer, when it parses as one.
    pub fn numeric(&self) -> Option<i64> {
        self.numeric
    }

    pub fn matches(&self, product: &Product) -> bool {
        product.title.to_lowercase().contains(&self.lowered)
            || product.description.to_lowercase().contains(&self.lowered)
            || product.location.to_lowercase().contains(&self.lowered)
            || product.price.to_string().contains(&self.raw)
            || self
                .numeric
                .is_some_and(|n| i64::from(product.available_inventory) == n)
    }
}
