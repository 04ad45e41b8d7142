//! A registry of `did:digilocker` identifiers bound to wallet addresses.
//!
//! The registry mints identifiers for an owner, verifies them, resolves the
//! most recent identifier of an owner, and lets the owner revoke it. It is a
//! single-process, in-memory authority: nothing is persisted, replicated, or
//! cryptographically signed. Ownership is proven only by the caller presenting
//! the same wallet address the identifier was minted for.
//!
//! ```
//! use did_registry::Registry;
//!
//! let registry = Registry::new();
//! let owner = "0x1111111111111111111111111111111111111111";
//! let minted = registry.mint(owner).unwrap();
//! assert!(registry.verify(minted.id.as_str()));
//! assert!(registry.revoke(minted.id.as_str(), owner));
//! assert!(!registry.verify(minted.id.as_str()));
//! ```

#![forbid(unsafe_code)]

pub mod address;
pub mod did;
pub mod registry;
pub mod uuid;

pub use crate::address::{is_valid_address, InvalidAddress, WalletAddress};
pub use crate::did::{Did, DidRecord, Minted};
pub use crate::registry::{MintError, Registry, RegistryStats, RevokeError};
