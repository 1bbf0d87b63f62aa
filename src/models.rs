use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use crate::error::OpError;

/// Rating accumulator with store-style numeric output
///
/// The store holds the accumulator as a float column. On JSON output an
/// integral value must come out as a JSON integer and a fractional value
/// as a JSON float, so serialization demotes based on the actual value.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct RatingSum(pub f64);

impl Serialize for RatingSum {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.is_finite() && self.0.fract() == 0.0 && self.0.abs() <= i64::MAX as f64 {
            serializer.serialize_i64(self.0 as i64)
        } else {
            serializer.serialize_f64(self.0)
        }
    }
}

impl From<f64> for RatingSum {
    fn from(value: f64) -> Self {
        RatingSum(value)
    }
}

/// The product record stored and served by this service
///
/// `id` is minted server-side on create and never supplied by the caller;
/// the rating counters start at zero and are not touched by any of the
/// five operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Product {
    pub id: String,
    pub category: String,
    pub title: String,
    #[schema(value_type = f64)]
    pub rating_sum: RatingSum,
    pub rating_count: i64,
}

impl Product {
    /// Build a fresh record with zeroed counters
    pub fn new(id: String, category: String, title: String) -> Self {
        Product {
            id,
            category,
            title,
            rating_sum: RatingSum(0.0),
            rating_count: 0,
        }
    }
}

/// Request body for the create operation
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CreateProductRequest {
    pub category: String,
    pub title: String,
}

/// Request body for the update operation
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct UpdateProductRequest {
    pub id: String,
    pub category: String,
    pub title: String,
}

/// Body of a successful list operation
///
/// `LastEvaluatedKey` is present only when the store reports more rows
/// beyond this page; the caller echoes it back verbatim to resume.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ListOutput {
    #[serde(rename = "Items")]
    pub items: Vec<Product>,
    #[serde(
        rename = "LastEvaluatedKey",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub last_evaluated_key: Option<JsonValue>,
}

/// Path parameters of an inbound event
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PathParameters {
    pub id: Option<String>,
}

/// Query string parameters of an inbound event
///
/// API-gateway-style events carry query values as strings; parsing is the
/// dispatcher's job.
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct QueryParameters {
    pub limit: Option<String>,
    #[serde(rename = "LastEvaluatedKey")]
    pub last_evaluated_key: Option<String>,
}

/// Inbound event: a verb+path route key plus optional parameters and body
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Event {
    pub route_key: Option<String>,
    pub path_parameters: Option<PathParameters>,
    pub query_string_parameters: Option<QueryParameters>,
    pub body: Option<String>,
}

/// HTTP-shaped response envelope returned for every event
///
/// `body` is always a JSON-encoded string. Error envelopes additionally
/// carry a Content-Type header.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ResponseEnvelope {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub headers: Option<HashMap<String, String>>,
}

impl ResponseEnvelope {
    /// Status-200 envelope around an already JSON-encoded body
    pub fn ok(body: String) -> Self {
        ResponseEnvelope {
            status_code: 200,
            body,
            headers: None,
        }
    }

    /// Error envelope: the body is the JSON-encoded "<kind> <message>" text
    pub fn from_error(err: &OpError) -> Self {
        let text = format!("{} {}", err.kind(), err);
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        ResponseEnvelope {
            status_code: err.status_code(),
            // Encoding a plain string cannot fail
            body: serde_json::to_string(&text).unwrap_or_default(),
            headers: Some(headers),
        }
    }
}
