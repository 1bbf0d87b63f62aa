use crate::config::Config;
use crate::spanner::SpannerStore;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: SpannerStore,
    pub config: Arc<Config>,
}
