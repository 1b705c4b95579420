//! Identifier types used throughout the cluster
use std::fmt;

use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// A unique identifier for a datanode or a pipeline: 128 random bits,
/// rendered as hexadecimal
#[derive(Default, PartialOrd, Ord, Clone, Hash, PartialEq, Copy, Eq, Serialize, Deserialize)]
pub struct Uuid([u8; 16]);

impl Uuid {
	pub fn as_slice(&self) -> &[u8] {
		&self.0
	}
}

impl From<[u8; 16]> for Uuid {
	fn from(bytes: [u8; 16]) -> Uuid {
		Uuid(bytes)
	}
}

impl fmt::Display for Uuid {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", hex::encode(self.0))
	}
}

impl fmt::Debug for Uuid {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", hex::encode(self.0))
	}
}

/// Generate a random identifier
pub fn gen_uuid() -> Uuid {
	rand::thread_rng().gen::<[u8; 16]>().into()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_uuid_display() {
		let id = Uuid::from([0xab; 16]);
		assert_eq!(id.to_string(), "ab".repeat(16));
	}

	#[test]
	fn test_gen_uuid_unique() {
		assert_ne!(gen_uuid(), gen_uuid());
	}
}
