//! V1 of the API. This is subject to change until we commit to stability, after
//! which point any breaking changes will go in a V2 api.

pub mod did;

use std::sync::Arc;

use axum::Router;
use did_registry::Registry;

/// Configuration for the V1 router.
#[derive(Debug, Default)]
pub struct RouterConfig {
	/// Shared with whoever else needs to read the registry, e.g. tests.
	pub registry: Arc<Registry>,
}

impl RouterConfig {
	pub fn build(self) -> Router {
		Router::new().nest("/did", did::router(self.registry))
	}
}
