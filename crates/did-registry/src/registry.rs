//! The identifier registry itself.

use std::{
	collections::HashMap,
	sync::{Mutex, MutexGuard},
};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
	address::{normalize, InvalidAddress, WalletAddress},
	did::{Did, DidRecord, Minted},
	uuid::UuidProvider,
};

/// Mints, verifies, resolves and revokes identifiers.
///
/// Construct one per service and share it by reference (typically behind an
/// `Arc`). All state lives behind a single lock, so the record store and the
/// owner index are never observed out of sync.
#[derive(Debug, Default)]
pub struct Registry {
	uuids: UuidProvider,
	inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
	/// Every record ever minted, in mint order. Never shrinks.
	records: Vec<DidRecord>,
	/// Identifier -> position in `records`.
	by_id: HashMap<Did, usize>,
	/// Owner -> most recently minted identifier, whether active or not.
	by_owner: HashMap<WalletAddress, Did>,
}

impl Inner {
	fn get(&self, id: &str) -> Option<&DidRecord> {
		self.by_id.get(id).map(|&idx| &self.records[idx])
	}
}

/// Why a revocation was refused.
#[derive(
	thiserror::Error, Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RevokeError {
	#[error("DID not found")]
	NotFound,
	#[error("DID is not owned by this wallet address")]
	NotAuthorized,
	#[error("DID was already revoked")]
	AlreadyRevoked,
}

/// Why an exclusive mint was refused.
#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum MintError {
	#[error(transparent)]
	InvalidAddress(#[from] InvalidAddress),
	#[error("wallet already has an active DID {0}")]
	AlreadyActive(Did),
}

/// Aggregate counts over the registry.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct RegistryStats {
	/// Number of identifiers ever minted.
	#[serde(rename = "totalDIDs")]
	pub total_count: usize,
	/// Number of identifiers that are not revoked.
	#[serde(rename = "activeDIDs")]
	pub active_count: usize,
	/// Raw entry count across the identifier map and the owner index.
	#[serde(rename = "registrySize")]
	pub registry_size: usize,
}

impl Registry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Uses `uuids` to generate identifiers, instead of the thread local RNG.
	pub fn with_uuid_provider(uuids: UuidProvider) -> Self {
		Self {
			uuids,
			inner: Mutex::default(),
		}
	}

	fn lock(&self) -> MutexGuard<'_, Inner> {
		self.inner.lock().expect("poisoned")
	}

	/// Mints a brand new active identifier for `owner`.
	///
	/// There is no duplicate check by owner: minting again for the same owner
	/// creates another record and repoints the owner index at it.
	pub fn mint(&self, owner: &str) -> Result<Minted, InvalidAddress> {
		let owner = parse_owner(owner)?;
		let minted = Self::insert(&self.uuids, &mut self.lock(), &owner);
		info!(did = %minted.id, wallet = %owner, "minted DID");
		Ok(minted)
	}

	/// Mints for `owner` only if it holds no active identifier yet.
	///
	/// The check and the insert happen under the same lock, so two concurrent
	/// calls for one owner can't both succeed. Owners whose latest identifier
	/// was revoked may mint again.
	pub fn mint_exclusive(&self, owner: &str) -> Result<Minted, MintError> {
		let owner = parse_owner(owner)?;
		let mut inner = self.lock();
		if let Some(active) = inner
			.by_owner
			.get(&owner)
			.filter(|id| inner.get(id.as_str()).is_some_and(|r| r.active))
		{
			return Err(MintError::AlreadyActive(active.clone()));
		}
		let minted = Self::insert(&self.uuids, &mut inner, &owner);
		drop(inner);

		info!(did = %minted.id, wallet = %owner, "minted DID");
		Ok(minted)
	}

	fn insert(uuids: &UuidProvider, inner: &mut Inner, owner: &WalletAddress) -> Minted {
		// Terminates: an injected sequence is only replayed once before the
		// provider falls back to random UUIDs.
		let id = loop {
			let candidate = Did::from_uuid(uuids.next_v4());
			if !inner.by_id.contains_key(&candidate) {
				break candidate;
			}
			warn!(did = %candidate, "generated an identifier that already exists, retrying");
		};
		let created_at = Utc::now();

		inner.by_id.insert(id.clone(), inner.records.len());
		inner.records.push(DidRecord {
			id: id.clone(),
			owner: owner.clone(),
			created_at,
			active: true,
		});
		inner.by_owner.insert(owner.clone(), id.clone());
		Minted { id, created_at }
	}

	/// Whether `id` was minted here and has not been revoked.
	pub fn verify(&self, id: &str) -> bool {
		let valid = self.lock().get(id).is_some_and(|r| r.active);
		debug!(did = id, valid, "verified DID");
		valid
	}

	/// The owner that `id` was minted for, regardless of revocation.
	pub fn owner_of(&self, id: &str) -> Option<WalletAddress> {
		self.lock().get(id).map(|r| r.owner.clone())
	}

	/// The most recently minted record for `owner`, active or revoked.
	///
	/// The address is compared case insensitively. A malformed address is not an
	/// error, it just never matches.
	pub fn lookup_by_owner(&self, owner: &str) -> Option<DidRecord> {
		let owner = normalize(owner);
		let inner = self.lock();
		let record = inner
			.by_owner
			.get(owner.as_str())
			.and_then(|id| inner.get(id.as_str()))
			.cloned();
		debug!(wallet = %owner, found = record.is_some(), "looked up DID by owner");
		record
	}

	/// Revokes `id` on behalf of `owner`, reporting why it failed if it did.
	///
	/// Ownership is checked before revocation status, so a caller that doesn't
	/// own `id` can't learn whether it was already revoked.
	pub fn try_revoke(&self, id: &str, owner: &str) -> Result<(), RevokeError> {
		let owner = normalize(owner);
		let mut inner = self.lock();
		let Some(&idx) = inner.by_id.get(id) else {
			return Err(RevokeError::NotFound);
		};
		let record = &mut inner.records[idx];
		if record.owner.as_str() != owner {
			return Err(RevokeError::NotAuthorized);
		}
		if !record.active {
			return Err(RevokeError::AlreadyRevoked);
		}
		record.active = false;
		drop(inner);

		info!(did = id, wallet = %owner, "revoked DID");
		Ok(())
	}

	/// Revokes `id` on behalf of `owner`.
	///
	/// Returns `false` if the identifier is unknown, owned by someone else, or
	/// already revoked, without saying which. Use [`Self::try_revoke`] for that.
	pub fn revoke(&self, id: &str, owner: &str) -> bool {
		match self.try_revoke(id, owner) {
			Ok(()) => true,
			Err(err) => {
				debug!(did = id, "revocation refused: {err}");
				false
			}
		}
	}

	/// Snapshot of every record, active and revoked, in mint order.
	pub fn list_all(&self) -> Vec<DidRecord> {
		self.lock().records.clone()
	}

	pub fn stats(&self) -> RegistryStats {
		let inner = self.lock();
		RegistryStats {
			total_count: inner.records.len(),
			active_count: inner.records.iter().filter(|r| r.active).count(),
			registry_size: inner.by_id.len() + inner.by_owner.len(),
		}
	}
}

fn parse_owner(owner: &str) -> Result<WalletAddress, InvalidAddress> {
	WalletAddress::parse(owner).inspect_err(|err| {
		warn!("refusing to mint: {err}");
	})
}

fn _assert_bounds(r: Registry) {
	fn helper(_r: impl std::fmt::Debug + Send + Sync + 'static) {}
	helper(r)
}

#[cfg(test)]
mod test {
	use std::sync::Arc;

	use ::uuid::Uuid;

	use super::*;

	const OWNER: &str = "0x1111111111111111111111111111111111111111";
	const OTHER: &str = "0x2222222222222222222222222222222222222222";

	#[test]
	fn test_mint_then_verify() {
		let registry = Registry::new();
		let minted = registry.mint(OWNER).unwrap();
		assert!(minted.id.as_str().starts_with(Did::PREFIX));
		assert!(minted.id.uuid().is_some(), "expected a uuid after the prefix");
		assert!(registry.verify(minted.id.as_str()));
		assert_eq!(
			registry.owner_of(minted.id.as_str()),
			Some(WalletAddress::parse(OWNER).unwrap())
		);
	}

	#[test]
	fn test_mint_uses_provider() {
		let uuid = Uuid::from_u128(42);
		let registry =
			Registry::with_uuid_provider(UuidProvider::new_from_sequence(vec![uuid]));
		let minted = registry.mint(OWNER).unwrap();
		assert_eq!(minted.id, Did::from_uuid(uuid));
	}

	#[test]
	fn test_mint_never_reuses_id() {
		let (a, b) = (Uuid::from_u128(1), Uuid::from_u128(2));
		// Provider hands out `a` twice before `b`.
		let registry =
			Registry::with_uuid_provider(UuidProvider::new_from_sequence(vec![a, a, b]));
		let first = registry.mint(OWNER).unwrap();
		let second = registry.mint(OTHER).unwrap();
		assert_eq!(first.id, Did::from_uuid(a));
		assert_eq!(second.id, Did::from_uuid(b));
		assert_eq!(registry.stats().total_count, 2);
	}

	#[test]
	fn test_mint_past_end_of_sequence() {
		let uuids: Vec<Uuid> = (1..=2).map(Uuid::from_u128).collect();
		let registry =
			Registry::with_uuid_provider(UuidProvider::new_from_sequence(uuids.clone()));
		let ids: Vec<Did> = (0..=uuids.len())
			.map(|_| registry.mint(OWNER).unwrap().id)
			.collect();
		assert_eq!(ids[0], Did::from_uuid(uuids[0]));
		assert_eq!(ids[1], Did::from_uuid(uuids[1]));
		assert!(!ids[..2].contains(&ids[2]));
		assert_eq!(registry.stats().total_count, uuids.len() + 1);
	}

	#[test]
	fn test_mint_exclusive_refuses_active_owner() {
		let upper = "0xABCDEF0123456789ABCDEF0123456789ABCDEF01";
		let lower = upper.to_ascii_lowercase();
		let registry = Registry::new();
		let first = registry.mint_exclusive(upper).unwrap().id;
		// Different casing is still the same owner.
		assert_eq!(
			registry.mint_exclusive(&lower),
			Err(MintError::AlreadyActive(first.clone()))
		);
		assert_eq!(registry.stats().active_count, 1);
		assert!(registry.mint_exclusive(OTHER).is_ok());

		assert!(registry.revoke(first.as_str(), &lower));
		let second = registry.mint_exclusive(&lower).unwrap().id;
		assert_ne!(first, second);
		assert_eq!(registry.lookup_by_owner(upper).unwrap().id, second);
		assert_eq!(registry.stats().active_count, 2);
	}

	#[test]
	fn test_mint_exclusive_rejects_bad_address() {
		let registry = Registry::new();
		assert_eq!(
			registry.mint_exclusive("nope"),
			Err(MintError::InvalidAddress(InvalidAddress("nope".to_owned())))
		);
		assert_eq!(registry.stats().total_count, 0);
	}

	#[test]
	fn test_concurrent_mint_exclusive_one_winner() {
		let registry = Registry::new();
		let successes = std::thread::scope(|s| {
			let handles: Vec<_> = (0..8)
				.map(|_| s.spawn(|| registry.mint_exclusive(OWNER).is_ok()))
				.collect();
			handles
				.into_iter()
				.map(|h| h.join().unwrap())
				.filter(|ok| *ok)
				.count()
		});
		assert_eq!(successes, 1);
		assert_eq!(registry.stats().active_count, 1);
	}

	#[test]
	fn test_invalid_mint_leaves_state_untouched() {
		let registry = Registry::new();
		registry.mint(OWNER).unwrap();
		let before = registry.stats();
		for bad in ["not-an-address", "", "0x1234", "0xZZZZ111111111111111111111111111111111111"]
		{
			assert_eq!(
				registry.mint(bad),
				Err(InvalidAddress(bad.to_owned())),
				"{bad:?} should be rejected"
			);
		}
		assert_eq!(registry.stats(), before);
		assert_eq!(registry.list_all().len(), 1);
	}

	#[test]
	fn test_verify_unknown_is_false() {
		let registry = Registry::new();
		assert!(!registry.verify("did:digilocker:00000000-0000-0000-0000-000000000000"));
		assert!(!registry.verify(""));
		assert!(!registry.verify(OWNER), "owner keys must not verify as DIDs");
		assert_eq!(registry.owner_of("did:digilocker:nope"), None);
	}

	#[test]
	fn test_revoke_lifecycle_scenario() {
		let registry = Registry::new();
		let i1 = registry.mint(OWNER).unwrap().id;
		assert!(registry.verify(i1.as_str()));
		assert!(registry.revoke(i1.as_str(), OWNER));
		assert!(!registry.verify(i1.as_str()));
		assert_eq!(
			registry.stats(),
			RegistryStats {
				total_count: 1,
				active_count: 0,
				registry_size: 2,
			}
		);
		assert!(!registry.revoke(i1.as_str(), OWNER), "cannot revoke twice");
		assert_eq!(
			registry.try_revoke(i1.as_str(), OWNER),
			Err(RevokeError::AlreadyRevoked)
		);
	}

	#[test]
	fn test_revoke_by_non_owner_fails() {
		let registry = Registry::new();
		let id = registry.mint(OWNER).unwrap().id;
		assert!(!registry.revoke(id.as_str(), OTHER));
		assert_eq!(
			registry.try_revoke(id.as_str(), OTHER),
			Err(RevokeError::NotAuthorized)
		);
		assert!(registry.verify(id.as_str()), "record should still be active");
	}

	#[test]
	fn test_revoke_unknown_fails() {
		let registry = Registry::new();
		assert_eq!(
			registry.try_revoke("did:digilocker:missing", OWNER),
			Err(RevokeError::NotFound)
		);
		assert!(!registry.revoke("did:digilocker:missing", OWNER));
	}

	#[test]
	fn test_owner_matching_is_case_insensitive() {
		let upper = "0xABCDEF0123456789ABCDEF0123456789ABCDEF01";
		let lower = upper.to_lowercase();
		let registry = Registry::new();
		let id = registry.mint(upper).unwrap().id;

		let record = registry.lookup_by_owner(&lower).unwrap();
		assert_eq!(record.id, id);
		assert_eq!(record.owner.as_str(), lower);
		assert_eq!(registry.lookup_by_owner(upper).unwrap().id, id);

		// Revoking with the other casing is still the owner.
		assert!(registry.revoke(id.as_str(), &lower));
	}

	#[test]
	fn test_lookup_returns_revoked_and_latest() {
		let registry = Registry::new();
		assert_eq!(registry.lookup_by_owner(OWNER), None);
		assert_eq!(registry.lookup_by_owner("garbage"), None);

		let first = registry.mint(OWNER).unwrap().id;
		assert!(registry.revoke(first.as_str(), OWNER));
		let record = registry.lookup_by_owner(OWNER).unwrap();
		assert_eq!(record.id, first);
		assert!(!record.active, "revoked record should still resolve");

		let second = registry.mint(OWNER).unwrap().id;
		assert_ne!(first, second);
		let record = registry.lookup_by_owner(OWNER).unwrap();
		assert_eq!(record.id, second);
		assert!(record.active);
		// The stale record is kept, not garbage collected.
		assert!(!registry.verify(first.as_str()));
		assert_eq!(registry.owner_of(first.as_str()).unwrap().as_str(), OWNER);
	}

	#[test]
	fn test_registry_size_counts_both_maps() {
		let registry = Registry::new();
		registry.mint(OWNER).unwrap();
		registry.mint(OTHER).unwrap();
		assert_eq!(registry.stats().registry_size, 4);
		// Re-minting adds a record but repoints the existing owner entry.
		registry.mint(OWNER).unwrap();
		assert_eq!(
			registry.stats(),
			RegistryStats {
				total_count: 3,
				active_count: 3,
				registry_size: 5,
			}
		);
	}

	#[test]
	fn test_list_all_is_ordered_and_stable() {
		let registry = Registry::new();
		let ids: Vec<Did> = [OWNER, OTHER, OWNER]
			.into_iter()
			.map(|o| registry.mint(o).unwrap().id)
			.collect();
		registry.revoke(ids[1].as_str(), OTHER);

		let all = registry.list_all();
		assert_eq!(all.iter().map(|r| r.id.clone()).collect::<Vec<_>>(), ids);
		assert_eq!(
			all.iter().map(|r| r.active).collect::<Vec<_>>(),
			[true, false, true]
		);
		assert_eq!(registry.list_all(), all);
		assert_eq!(registry.stats(), registry.stats());
	}

	#[test]
	fn test_stats_serialize_names() {
		let registry = Registry::new();
		registry.mint(OWNER).unwrap();
		assert_eq!(
			serde_json::to_value(registry.stats()).unwrap(),
			serde_json::json!({"totalDIDs": 1, "activeDIDs": 1, "registrySize": 2})
		);
	}

	#[test]
	fn test_concurrent_mints_stay_consistent() {
		const THREADS: usize = 8;
		const PER_THREAD: usize = 50;
		let registry = Arc::new(Registry::new());
		std::thread::scope(|s| {
			for t in 0..THREADS {
				let registry = Arc::clone(&registry);
				s.spawn(move || {
					let owner = format!("0x{t:040x}");
					for _ in 0..PER_THREAD {
						let id = registry.mint(&owner).unwrap().id;
						assert!(registry.verify(id.as_str()));
						let latest = registry.lookup_by_owner(&owner).unwrap();
						assert_eq!(latest.owner.as_str(), owner);
					}
				});
			}
		});

		let stats = registry.stats();
		assert_eq!(stats.total_count, THREADS * PER_THREAD);
		assert_eq!(stats.active_count, THREADS * PER_THREAD);
		assert_eq!(stats.registry_size, THREADS * PER_THREAD + THREADS);
		// Each owner's index entry points at their last mint.
		let all = registry.list_all();
		for t in 0..THREADS {
			let owner = format!("0x{t:040x}");
			let last = all.iter().rev().find(|r| r.owner.as_str() == owner).unwrap();
			assert_eq!(registry.lookup_by_owner(&owner).unwrap().id, last.id);
		}
	}
}
