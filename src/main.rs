mod api_doc;
mod config;
mod dispatcher;
mod error;
mod handlers;
mod memory;
mod models;
mod routes;
mod spanner;
mod state;
mod store;

use api_doc::ApiDoc;
use axum::routing::{get, post};
use axum::Router;
use config::Config;
use handlers::{health_handler, invoke_handler};
use spanner::SpannerStore;
use state::AppState;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    tracing::info!("rust-product-crud starting");

    let config = Config::from_env()?;
    config.log_startup();

    let store = SpannerStore::from_config(&config).await?;

    let addr = format!("{}:{}", config.service_host, config.service_port);
    let state = AppState {
        store,
        config: Arc::new(config),
    };

    let app = Router::new()
        .route(routes::INVOKE, post(invoke_handler))
        .route(routes::HEALTH, get(health_handler))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
