use crate::{metadata, region, Frame, Layout, Recognize, Result, Snapshot};

/// Runs both stages over a frame and merges them into a [Snapshot].
///
/// Decoding is all-or-nothing: if either stage fails no snapshot is produced.
pub struct Decoder<R> {
	layout: Layout,
	recognizer: R,
}

impl<R: Recognize> Decoder<R> {
	pub fn new(layout: Layout, recognizer: R) -> Result<Self> {
		layout.validate()?;
		Ok(Self { layout, recognizer })
	}

	pub fn layout(&self) -> &Layout {
		&self.layout
	}

	pub async fn decode(&self, frame: &Frame) -> Result<Snapshot> {
		let (width, height) = frame.dimensions();

		// Reject a drifted upstream layout before doing any work.
		self.layout.check(width, height)?;

		let hits = region::extract(frame, &self.layout)?;
		let metadata = metadata::decode(frame, &self.layout, &self.recognizer).await?;

		tracing::info!(width, height, hits = hits.len(), metadata = metadata.len(), "decoded frame");

		Ok(Snapshot { metadata, hits })
	}
}
