//! The `did:digilocker` identifier and the record the registry keeps for it.

use std::borrow::Borrow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::address::WalletAddress;

/// A minted `did:digilocker:<uuid>` identifier.
///
/// Only the registry creates these, so holding one does not mean it is still
/// active. Ask the registry with [`crate::Registry::verify`].
#[derive(
	Debug, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, derive_more::Display,
)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct Did(String);

impl Did {
	pub const PREFIX: &'static str = "did:digilocker:";

	pub fn from_uuid(uuid: Uuid) -> Self {
		Self(format!("{}{uuid}", Self::PREFIX))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// The uuid portion, if this is well formed.
	pub fn uuid(&self) -> Option<Uuid> {
		self.0
			.strip_prefix(Self::PREFIX)
			.and_then(|s| Uuid::parse_str(s).ok())
	}
}

impl AsRef<str> for Did {
	fn as_ref(&self) -> &str {
		self.as_str()
	}
}

impl Borrow<str> for Did {
	fn borrow(&self) -> &str {
		self.as_str()
	}
}

/// Everything the registry knows about one identifier.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidRecord {
	pub id: Did,
	pub owner: WalletAddress,
	pub created_at: DateTime<Utc>,
	/// Starts `true`, and flips to `false` exactly once on revocation.
	pub active: bool,
}

/// Result of a successful mint.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Minted {
	pub id: Did,
	pub created_at: DateTime<Utc>,
}
