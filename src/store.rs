use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::OpError;
use crate::models::Product;

/// One page of a range scan
///
/// `last_evaluated_key` is set only when more rows remain past this page.
/// Its internal shape belongs to the store; callers pass it back untouched.
#[derive(Debug, Clone)]
pub struct ScanPage {
    pub items: Vec<Product>,
    pub last_evaluated_key: Option<JsonValue>,
}

/// Key-value table interface for product records
///
/// The dispatcher is written against this trait so the production Spanner
/// store and the in-memory store are interchangeable. Every method is a
/// single remote call; there is no retry or batching at this layer.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Range scan in key order, resuming from `start_key` when present
    async fn scan(&self, limit: i64, start_key: Option<JsonValue>) -> Result<ScanPage, OpError>;

    /// Point lookup by id
    async fn get(&self, id: &str) -> Result<Option<Product>, OpError>;

    /// Unconditional write of a full record
    async fn put(&self, product: &Product) -> Result<(), OpError>;

    /// Overwrite category and title only if a record with this id exists
    ///
    /// Never an upsert: a missing id is `OpError::ConditionFailed`.
    async fn update_existing(&self, id: &str, category: &str, title: &str)
        -> Result<(), OpError>;

    /// Delete by id; succeeds whether or not the id existed
    async fn delete(&self, id: &str) -> Result<(), OpError>;
}

/// Pull the record id out of a continuation token
///
/// Both store implementations use the `{"id": "<last id>"}` token shape.
pub(crate) fn token_start_id(token: &JsonValue) -> Result<String, OpError> {
    token
        .get("id")
        .and_then(JsonValue::as_str)
        .map(str::to_owned)
        .ok_or_else(|| {
            OpError::InvalidInput("LastEvaluatedKey must be an object with an 'id' string".into())
        })
}
