use std::sync::Arc;

use crate::Bounds;

/// Error types for the skev decoder.
///
/// Every failure of a snapshot, from the network fetch to the final write, maps onto one of these.
/// The enum is `Clone` so a single failure can be logged and returned to a caller.
#[derive(Debug, thiserror::Error, Clone)]
pub enum Error {
	/// The remote image could not be retrieved.
	#[error("fetch error: {0}")]
	Fetch(String),

	/// The image bytes could not be decoded.
	#[error("image decode error: {0}")]
	ImageDecode(Arc<image::ImageError>),

	/// A configured region does not fit inside the decoded frame.
	#[error("region {region:?} with bounds {bounds} does not fit a {width}x{height} frame")]
	Geometry {
		region: String,
		bounds: Bounds,
		width: u32,
		height: u32,
	},

	/// The text-recognition engine is unavailable or failed.
	#[error("ocr error: {0}")]
	Ocr(String),

	/// Reading or writing a persisted artifact failed.
	#[error("storage error: {0}")]
	Storage(Arc<std::io::Error>),

	/// A persisted snapshot could not be (de)serialized.
	#[error("json error: {0}")]
	Json(Arc<serde_json::Error>),

	/// The region layout itself is malformed.
	#[error("invalid layout: {0}")]
	Layout(String),
}

impl Error {
	/// A stable, machine-readable name for the error kind.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Fetch(_) => "FetchError",
			Self::ImageDecode(_) => "ImageDecodeError",
			Self::Geometry { .. } => "ImageGeometryError",
			Self::Ocr(_) => "OcrEngineError",
			Self::Storage(_) | Self::Json(_) => "StorageError",
			Self::Layout(_) => "LayoutError",
		}
	}
}

/// A Result type alias for skev operations.
pub type Result<T> = std::result::Result<T, Error>;

// Wrap in an Arc so it is Clone
impl From<image::ImageError> for Error {
	fn from(err: image::ImageError) -> Self {
		Error::ImageDecode(Arc::new(err))
	}
}

impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		Error::Storage(Arc::new(err))
	}
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Error::Json(Arc::new(err))
	}
}
