//! Shared, process-wide state handed to every route handler.

use std::sync::Arc;

use tx_core::ResourceCache;
use tx_operations::WorkerConfig;

use crate::catalog::DirectoryCatalog;
use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<DirectoryCatalog>,
    pub worker_config: Arc<WorkerConfig>,
    pub cache: Arc<ResourceCache>,
}

impl AppState {
    pub fn new(config: &AppConfig, catalog: DirectoryCatalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
            worker_config: Arc::new(WorkerConfig {
                default_timeout: config.operation_timeout(),
                max_results: config.operation.max_results,
                default_language: config.language.default.clone(),
            }),
            cache: Arc::new(ResourceCache::with_limits(
                config.operation.max_resources_per_cache_id,
                config.operation.max_cache_ids,
            )),
        }
    }
}
