use utoipa::OpenApi;

use crate::error::{HealthResponse, UnhealthyResponse};
use crate::handlers;
use crate::models::{
    CreateProductRequest, Event, ListOutput, PathParameters, Product, QueryParameters,
    ResponseEnvelope, UpdateProductRequest,
};

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "rust-product-crud API",
        version = "1.0.0",
        description = "A routeKey-dispatched product CRUD service backed by Google Cloud Spanner"
    ),
    paths(
        handlers::health::health_handler,
        handlers::invoke::invoke_handler
    ),
    components(
        schemas(
            Event,
            PathParameters,
            QueryParameters,
            ResponseEnvelope,
            Product,
            ListOutput,
            CreateProductRequest,
            UpdateProductRequest,
            HealthResponse,
            UnhealthyResponse
        )
    ),
    tags(
        (name = "health", description = "Health check operations"),
        (name = "products", description = "Product CRUD dispatch operations")
    )
)]
pub struct ApiDoc;
