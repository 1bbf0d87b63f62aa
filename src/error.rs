use serde::{Deserialize, Serialize};
use std::fmt;

/// Response type for health check endpoint
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Response type for unhealthy status
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct UnhealthyResponse {
    pub status: String,
    pub error: String,
}

/// Tagged error for the five product operations
///
/// Every failure inside an operation is one of these four kinds, and each
/// kind maps to exactly one envelope status code. The dispatcher is the
/// single place where an `OpError` becomes a response.
#[derive(Debug)]
pub enum OpError {
    /// Missing or malformed required input (path param, query param, body field)
    InvalidInput(String),
    /// Point lookup found no record for the id
    NotFound(String),
    /// Conditional write failed because the record does not exist
    ConditionFailed(String),
    /// Store connectivity or query failure
    StoreFault(anyhow::Error),
}

impl OpError {
    /// Error kind tag carried in the response body
    pub fn kind(&self) -> &'static str {
        match self {
            OpError::InvalidInput(_) => "InvalidInput",
            OpError::NotFound(_) => "NotFound",
            OpError::ConditionFailed(_) => "ConditionFailed",
            OpError::StoreFault(_) => "StoreFault",
        }
    }

    /// Envelope status code for this kind
    ///
    /// NotFound and ConditionFailed are surfaced as 404 rather than folded
    /// into the generic 400 bucket; store faults keep 400.
    pub fn status_code(&self) -> u16 {
        match self {
            OpError::InvalidInput(_) => 400,
            OpError::NotFound(_) => 404,
            OpError::ConditionFailed(_) => 404,
            OpError::StoreFault(_) => 400,
        }
    }
}

impl fmt::Display for OpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpError::InvalidInput(msg) => write!(f, "{}", msg),
            OpError::NotFound(id) => write!(f, "no product with id {}", id),
            OpError::ConditionFailed(id) => write!(f, "product {} does not exist", id),
            OpError::StoreFault(err) => write!(f, "store operation failed: {}", err),
        }
    }
}

impl From<anyhow::Error> for OpError {
    fn from(err: anyhow::Error) -> Self {
        OpError::StoreFault(err)
    }
}

impl From<serde_json::Error> for OpError {
    fn from(err: serde_json::Error) -> Self {
        OpError::InvalidInput(format!("invalid JSON: {}", err))
    }
}
