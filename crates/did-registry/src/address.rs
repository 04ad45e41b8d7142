//! Wallet addresses, the owner keys of the registry.

use std::{borrow::Borrow, str::FromStr};

use serde::{Deserialize, Serialize};

/// Number of hex digits following the `0x` prefix.
const HEX_LEN: usize = 40;
const PREFIX: &str = "0x";

/// A wallet address in its normalized (lower case) form.
///
/// Two addresses that differ only in the case of their hex digits are the same
/// owner, so only the normalized form is ever stored or compared.
#[derive(
	Debug, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, derive_more::Display,
)]
#[derive(Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress(String);

impl WalletAddress {
	/// Validates `s` as `0x` followed by exactly 40 hex digits, and normalizes it.
	pub fn parse(s: &str) -> Result<Self, InvalidAddress> {
		if !is_valid_address(s) {
			return Err(InvalidAddress(s.to_owned()));
		}
		Ok(Self(s.to_ascii_lowercase()))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

/// Checks whether `s` is formatted like a wallet address, without allocating.
pub fn is_valid_address(s: &str) -> bool {
	let Some(digits) = s.strip_prefix(PREFIX) else {
		return false;
	};
	digits.len() == HEX_LEN && digits.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Lower cases an untrusted address so it can be compared against stored
/// owners. Unlike [`WalletAddress::parse`], this never fails: a malformed
/// input simply won't match anything.
pub fn normalize(s: &str) -> String {
	s.to_ascii_lowercase()
}

#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
#[error(
	"invalid wallet address format {0:?}, must be 0x followed by 40 hex characters"
)]
pub struct InvalidAddress(pub String);

impl FromStr for WalletAddress {
	type Err = InvalidAddress;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl TryFrom<String> for WalletAddress {
	type Error = InvalidAddress;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::parse(&value)
	}
}

impl From<WalletAddress> for String {
	fn from(value: WalletAddress) -> Self {
		value.0
	}
}

impl AsRef<str> for WalletAddress {
	fn as_ref(&self) -> &str {
		self.as_str()
	}
}

impl Borrow<str> for WalletAddress {
	fn borrow(&self) -> &str {
		self.as_str()
	}
}
