use serde::{Deserialize, Serialize};

use crate::{Hit, Metadata, Result};

/// The decoded content of one image: its metadata and every hit, in scan order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
	pub metadata: Metadata,
	pub hits: Vec<Hit>,
}

impl Snapshot {
	/// Parse a snapshot from a slice of bytes.
	pub fn from_slice(v: &[u8]) -> Result<Self> {
		Ok(serde_json::from_slice(v)?)
	}

	/// Serialize the snapshot to a string.
	pub fn to_string(&self) -> Result<String> {
		Ok(serde_json::to_string(self)?)
	}

	/// Serialize the snapshot to a pretty vector of bytes.
	///
	/// The output only depends on the content, so identical frames produce identical bytes.
	pub fn to_vec_pretty(&self) -> Result<Vec<u8>> {
		Ok(serde_json::to_vec_pretty(self)?)
	}
}
