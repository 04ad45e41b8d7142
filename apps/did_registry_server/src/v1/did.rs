//! Routes for minting, verifying, resolving and revoking DIDs.

use std::sync::Arc;

use axum::{
	extract::{rejection::JsonRejection, Path, State},
	http::StatusCode,
	response::IntoResponse,
	routing::{get, post},
	Json, Router,
};
use chrono::{DateTime, Utc};
use axum_macros::FromRequest;
use did_registry::{
	Did, DidRecord, InvalidAddress, MintError, Registry, RegistryStats,
	RevokeError, WalletAddress,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone)]
struct RouterState {
	registry: Arc<Registry>,
}

pub fn router(registry: Arc<Registry>) -> Router {
	Router::new()
		.route("/generate", post(generate))
		.route("/verify/:did", get(verify))
		.route("/wallet/:wallet_address", get(by_wallet))
		.route("/revoke", post(revoke))
		.route("/all", get(all))
		.route("/stats", get(stats))
		.with_state(RouterState { registry })
}

/// [`Json`] extractor whose rejections use the same body as every other error.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(DidErr))]
struct JsonBody<T>(T);

#[derive(thiserror::Error, Debug)]
enum DidErr {
	#[error(transparent)]
	InvalidAddress(#[from] InvalidAddress),
	#[error("wallet already has an active DID {0}")]
	AlreadyHasDid(Did),
	#[error("DID not found for this wallet address")]
	NotFound,
	#[error("failed to revoke DID: {0}")]
	Revoke(#[from] RevokeError),
	#[error(transparent)]
	BadBody(#[from] JsonRejection),
}

impl From<MintError> for DidErr {
	fn from(err: MintError) -> Self {
		match err {
			MintError::InvalidAddress(err) => Self::InvalidAddress(err),
			MintError::AlreadyActive(did) => Self::AlreadyHasDid(did),
		}
	}
}

#[derive(Debug, Serialize)]
struct ErrBody {
	success: bool,
	error: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	reason: Option<RevokeError>,
}

impl IntoResponse for DidErr {
	fn into_response(self) -> axum::response::Response {
		warn!("{self}");
		let (status, reason) = match &self {
			Self::InvalidAddress(_) | Self::AlreadyHasDid(_) => {
				(StatusCode::BAD_REQUEST, None)
			}
			Self::BadBody(rejection) => (rejection.status(), None),
			Self::NotFound => (StatusCode::NOT_FOUND, None),
			Self::Revoke(reason) => (StatusCode::BAD_REQUEST, Some(*reason)),
		};
		let body = ErrBody {
			success: false,
			error: self.to_string(),
			reason,
		};
		(status, Json(body)).into_response()
	}
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateReq {
	wallet_address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResp {
	success: bool,
	did: Did,
	created_at: DateTime<Utc>,
	message: &'static str,
}

#[tracing::instrument(skip_all)]
#[axum_macros::debug_handler]
async fn generate(
	State(state): State<RouterState>,
	JsonBody(req): JsonBody<GenerateReq>,
) -> Result<(StatusCode, Json<GenerateResp>), DidErr> {
	// A wallet may hold at most one active DID, it has to revoke it first.
	let minted = state.registry.mint_exclusive(&req.wallet_address)?;
	Ok((
		StatusCode::CREATED,
		Json(GenerateResp {
			success: true,
			did: minted.id,
			created_at: minted.created_at,
			message: "DID generated successfully",
		}),
	))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyResp {
	success: bool,
	verified: bool,
	did: String,
	/// Only present when verified, so the caller can look up the owner's profile.
	wallet_address: Option<WalletAddress>,
}

#[tracing::instrument(skip(state))]
async fn verify(
	State(state): State<RouterState>,
	Path(did): Path<String>,
) -> Json<VerifyResp> {
	let verified = state.registry.verify(&did);
	// Owners are immutable, so a revocation racing in between can't hand out
	// the wrong address.
	let wallet_address = if verified {
		state.registry.owner_of(&did)
	} else {
		None
	};
	Json(VerifyResp {
		success: true,
		verified,
		did,
		wallet_address,
	})
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ByWalletResp {
	success: bool,
	did: Did,
	wallet_address: WalletAddress,
	active: bool,
	created_at: DateTime<Utc>,
}

impl From<DidRecord> for ByWalletResp {
	fn from(record: DidRecord) -> Self {
		Self {
			success: true,
			did: record.id,
			wallet_address: record.owner,
			active: record.active,
			created_at: record.created_at,
		}
	}
}

#[tracing::instrument(skip(state))]
async fn by_wallet(
	State(state): State<RouterState>,
	Path(wallet_address): Path<String>,
) -> Result<Json<ByWalletResp>, DidErr> {
	state
		.registry
		.lookup_by_owner(&wallet_address)
		.map(|record| Json(record.into()))
		.ok_or(DidErr::NotFound)
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RevokeReq {
	did: String,
	wallet_address: String,
}

#[derive(Debug, Serialize)]
struct RevokeResp {
	success: bool,
	message: &'static str,
}

#[tracing::instrument(skip_all)]
#[axum_macros::debug_handler]
async fn revoke(
	State(state): State<RouterState>,
	JsonBody(req): JsonBody<RevokeReq>,
) -> Result<Json<RevokeResp>, DidErr> {
	state.registry.try_revoke(&req.did, &req.wallet_address)?;
	Ok(Json(RevokeResp {
		success: true,
		message: "DID revoked successfully",
	}))
}

#[derive(Debug, Serialize)]
struct AllResp {
	success: bool,
	count: usize,
	dids: Vec<DidRecord>,
}

async fn all(State(state): State<RouterState>) -> Json<AllResp> {
	let dids = state.registry.list_all();
	info!(count = dids.len(), "listing all DIDs");
	Json(AllResp {
		success: true,
		count: dids.len(),
		dids,
	})
}

#[derive(Debug, Serialize)]
struct StatsResp {
	success: bool,
	stats: RegistryStats,
}

async fn stats(State(state): State<RouterState>) -> Json<StatsResp> {
	Json(StatsResp {
		success: true,
		stats: state.registry.stats(),
	})
}
