use image::{DynamicImage, GenericImageView, RgbImage, SubImage};

use crate::{Crop, Result};

/// One decoded still image, normalized to 8-bit RGB.
///
/// A frame is created once per snapshot and never mutated afterwards,
/// so it can be shared between the region extractor and the metadata decoder.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
	image: RgbImage,
}

impl Frame {
	/// Decode the first frame of an encoded, possibly animated, image.
	///
	/// The format is sniffed from the bytes rather than trusted from a file name or header.
	pub fn decode(bytes: &[u8]) -> Result<Self> {
		// For animated GIFs the still-image decoder only composites the first frame.
		let image = image::load_from_memory(bytes)?;
		Ok(Self::from(image))
	}

	pub fn width(&self) -> u32 {
		self.image.width()
	}

	pub fn height(&self) -> u32 {
		self.image.height()
	}

	pub fn dimensions(&self) -> (u32, u32) {
		self.image.dimensions()
	}

	/// Borrow a rectangular view of the frame.
	///
	/// The crop must already be resolved against this frame; see [crate::Bounds::resolve].
	pub fn crop(&self, crop: Crop) -> SubImage<&RgbImage> {
		self.image.view(crop.x, crop.y, crop.width, crop.height)
	}

	/// Copy a rectangular region into its own image.
	pub fn crop_owned(&self, crop: Crop) -> RgbImage {
		self.crop(crop).to_image()
	}

	pub fn as_image(&self) -> &RgbImage {
		&self.image
	}
}

/// Sniff the MIME type of encoded image bytes, ex. "image/gif".
pub fn mime_type(bytes: &[u8]) -> Option<&'static str> {
	image::guess_format(bytes).ok().map(|format| format.to_mime_type())
}

impl From<DynamicImage> for Frame {
	// Grayscale and paletted inputs are broadcast to (v, v, v) here, once.
	fn from(image: DynamicImage) -> Self {
		Self {
			image: image.into_rgb8(),
		}
	}
}

impl From<RgbImage> for Frame {
	fn from(image: RgbImage) -> Self {
		Self { image }
	}
}
