use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::OpError;
use crate::models::{
    CreateProductRequest, Event, ListOutput, Product, ResponseEnvelope, UpdateProductRequest,
};
use crate::store::ProductStore;

// Route keys, matched in priority order
pub const ROUTE_LIST: &str = "GET /products";
pub const ROUTE_GET: &str = "GET /products/{id}";
pub const ROUTE_CREATE: &str = "POST /products";
pub const ROUTE_UPDATE: &str = "PUT /products";
pub const ROUTE_DELETE: &str = "DELETE /products/{id}";

const DEFAULT_PAGE_SIZE: i64 = 100;
const GREETING: &str = "Hello from the product service - no routeKey found";

/// Map an inbound event to one of the five product operations
///
/// Events without a routeKey get the fixed greeting, and an unrecognized
/// routeKey gets a descriptive 200 body rather than an error. Every
/// operation failure is converted to an error envelope here and nowhere
/// else; nothing is retried.
pub async fn dispatch<S: ProductStore>(store: &S, event: Event) -> ResponseEnvelope {
    let Some(route_key) = event.route_key.clone() else {
        tracing::debug!("No routeKey attribute on event");
        return ResponseEnvelope::ok(encode_json(&GREETING));
    };

    tracing::info!("Dispatching routeKey: {}", route_key);

    let result = match route_key.as_str() {
        ROUTE_LIST => list_products(store, &event).await,
        ROUTE_GET => get_product(store, &event).await,
        ROUTE_CREATE => create_product(store, &event).await,
        ROUTE_UPDATE => update_product(store, &event).await,
        ROUTE_DELETE => delete_product(store, &event).await,
        _ => Ok(encode_json(&format!("NO ACTION for routeKey {}", route_key))),
    };

    match result {
        Ok(body) => ResponseEnvelope::ok(body),
        Err(err) => {
            tracing::warn!("Operation failed ({}): {}", err.kind(), err);
            ResponseEnvelope::from_error(&err)
        }
    }
}

/// List a page of products, resuming from a continuation token if given
async fn list_products<S: ProductStore>(store: &S, event: &Event) -> Result<String, OpError> {
    let mut limit = DEFAULT_PAGE_SIZE;
    let mut start_key: Option<JsonValue> = None;

    if let Some(query) = &event.query_string_parameters {
        if let Some(raw) = &query.limit {
            limit = raw.trim().parse::<i64>().map_err(|_| {
                OpError::InvalidInput(format!("limit must be an integer, got '{}'", raw))
            })?;
            if limit < 1 {
                return Err(OpError::InvalidInput(format!(
                    "limit must be positive, got {}",
                    limit
                )));
            }
        }

        // The token is opaque here: decoded to a JSON value and handed to
        // the store untouched
        if let Some(raw) = &query.last_evaluated_key {
            let token: JsonValue = serde_json::from_str(raw).map_err(|e| {
                OpError::InvalidInput(format!("LastEvaluatedKey is not valid JSON: {}", e))
            })?;
            start_key = Some(token);
        }
    }

    tracing::info!(
        "Listing products (limit: {}, resumed: {})",
        limit,
        start_key.is_some()
    );

    let page = store.scan(limit, start_key).await?;
    let output = ListOutput {
        items: page.items,
        last_evaluated_key: page.last_evaluated_key,
    };
    Ok(encode_json(&output))
}

/// Point lookup; an absent record is NotFound, not a crash
async fn get_product<S: ProductStore>(store: &S, event: &Event) -> Result<String, OpError> {
    let id = path_id(event)?;
    tracing::info!("Reading product with id: {}", id);

    match store.get(&id).await? {
        Some(product) => Ok(encode_json(&product)),
        None => Err(OpError::NotFound(id)),
    }
}

/// Mint a fresh id and write a new record with zeroed counters
async fn create_product<S: ProductStore>(store: &S, event: &Event) -> Result<String, OpError> {
    let request: CreateProductRequest = parse_body(event)?;
    require_non_empty("category", &request.category)?;
    require_non_empty("title", &request.title)?;

    // A random id keeps records evenly distributed across partitions and
    // makes existence checks on create unnecessary
    let id = Uuid::new_v4().to_string();
    tracing::info!("Adding product with id: {}", id);

    let product = Product::new(id.clone(), request.category, request.title);
    store.put(&product).await?;

    Ok(encode_json(&format!("POST item {}", id)))
}

/// Conditionally overwrite category and title, never an upsert
async fn update_product<S: ProductStore>(store: &S, event: &Event) -> Result<String, OpError> {
    let request: UpdateProductRequest = parse_body(event)?;
    require_non_empty("id", &request.id)?;
    require_non_empty("category", &request.category)?;
    require_non_empty("title", &request.title)?;

    tracing::info!("Updating product with id: {}", request.id);
    store
        .update_existing(&request.id, &request.category, &request.title)
        .await?;

    Ok(encode_json(&format!("PUT item {}", request.id)))
}

/// Delete by id; deleting an absent id is still success
async fn delete_product<S: ProductStore>(store: &S, event: &Event) -> Result<String, OpError> {
    let id = path_id(event)?;
    tracing::info!("Deleting product with id: {}", id);

    store.delete(&id).await?;
    Ok(encode_json(&format!("DELETE item {}", id)))
}

fn path_id(event: &Event) -> Result<String, OpError> {
    event
        .path_parameters
        .as_ref()
        .and_then(|params| params.id.clone())
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| OpError::InvalidInput("missing required path parameter 'id'".into()))
}

fn parse_body<T: DeserializeOwned>(event: &Event) -> Result<T, OpError> {
    let body = event
        .body
        .as_deref()
        .ok_or_else(|| OpError::InvalidInput("missing request body".into()))?;
    serde_json::from_str(body)
        .map_err(|e| OpError::InvalidInput(format!("invalid request body: {}", e)))
}

fn require_non_empty(name: &str, value: &str) -> Result<(), OpError> {
    if value.trim().is_empty() {
        Err(OpError::InvalidInput(format!(
            "field '{}' must be a non-empty string",
            name
        )))
    } else {
        Ok(())
    }
}

// Serialization of the response types cannot fail
fn encode_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}
