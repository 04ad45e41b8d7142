pub mod v1;

use axum::{
	extract::OriginalUri,
	http::{header, HeaderValue, Method, StatusCode},
	routing::get,
	Json,
};
use chrono::{DateTime, Utc};
use color_eyre::eyre::Context as _;
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub const DEFAULT_CLIENT_URL: &str = "http://localhost:5173";
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Main router of API
#[derive(Debug)]
pub struct RouterConfig {
	pub v1: crate::v1::RouterConfig,
	/// Origin of the browser client that is allowed to make CORS requests.
	pub client_url: String,
}

impl Default for RouterConfig {
	fn default() -> Self {
		Self {
			v1: Default::default(),
			client_url: DEFAULT_CLIENT_URL.to_owned(),
		}
	}
}

impl RouterConfig {
	pub fn build(self) -> color_eyre::Result<axum::Router<()>> {
		let origin: HeaderValue = self
			.client_url
			.parse()
			.wrap_err_with(|| format!("invalid client url {:?}", self.client_url))?;
		let cors = CorsLayer::new()
			.allow_origin(origin)
			.allow_methods([Method::GET, Method::POST])
			.allow_headers([header::CONTENT_TYPE])
			.allow_credentials(true);

		Ok(axum::Router::new()
			.route("/api", get(api_info))
			.route("/api/health", get(health))
			.nest("/api/v1", self.v1.build())
			.fallback(not_found)
			.layer(cors)
			.layer(TraceLayer::new_for_http()))
	}
}

#[derive(Debug, Serialize)]
struct Health {
	success: bool,
	message: &'static str,
	timestamp: DateTime<Utc>,
	version: &'static str,
}

async fn health() -> Json<Health> {
	Json(Health {
		success: true,
		message: "DID registry is running",
		timestamp: Utc::now(),
		version: VERSION,
	})
}

#[derive(Debug, Serialize)]
struct NotFound {
	success: bool,
	error: String,
}

/// Nested routers inherit this, hence [`OriginalUri`] to report the full path.
async fn not_found(
	method: Method,
	OriginalUri(uri): OriginalUri,
) -> (StatusCode, Json<NotFound>) {
	(
		StatusCode::NOT_FOUND,
		Json(NotFound {
			success: false,
			error: format!("Route {method} {} not found", uri.path()),
		}),
	)
}

async fn api_info() -> Json<serde_json::Value> {
	Json(serde_json::json!({
		"success": true,
		"message": "DigiLocker DID registry API",
		"version": VERSION,
		"endpoints": {
			"health": "GET /api/health",
			"did": {
				"generate": "POST /api/v1/did/generate",
				"verify": "GET /api/v1/did/verify/:did",
				"getByWallet": "GET /api/v1/did/wallet/:walletAddress",
				"revoke": "POST /api/v1/did/revoke",
				"all": "GET /api/v1/did/all",
				"stats": "GET /api/v1/did/stats",
			},
		},
	}))
}
