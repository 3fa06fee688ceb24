//! The metadata decoder: recognizes the text block and splits it into labels and values.
use std::collections::BTreeMap;
use std::future::Future;

use image::RgbImage;

use crate::{Frame, Layout, Result};

/// Recognized labels mapped to their values, ex. "Run" -> "12345".
pub type Metadata = BTreeMap<String, String>;

/// A text-recognition engine.
///
/// Implementations must report an unusable engine as [crate::Error::Ocr].
/// Recognizing no text at all is not an error.
pub trait Recognize: Send + Sync {
	fn recognize(&self, image: &RgbImage) -> impl Future<Output = Result<String>> + Send;
}

/// Split recognized text into a mapping.
///
/// Each line is split on its first colon and both halves are trimmed.
/// Lines without a colon are dropped and later duplicates replace earlier ones.
pub fn parse(text: &str) -> Metadata {
	text.lines()
		.filter_map(|line| line.split_once(':'))
		.map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
		.collect()
}

/// Crop the text block out of the frame, recognize it and parse the result.
pub async fn decode<R: Recognize>(frame: &Frame, layout: &Layout, recognizer: &R) -> Result<Metadata> {
	let crop = layout.metadata_crop(frame.width(), frame.height())?;

	let image = frame.crop_owned(crop);
	let text = recognizer.recognize(&image).await?;
	let metadata = parse(&text);

	tracing::debug!(lines = text.lines().count(), entries = metadata.len(), "decoded metadata");

	Ok(metadata)
}
