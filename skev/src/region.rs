//! The region extractor: turns frame pixels into a flat list of hits.
use image::{GenericImageView, Rgb};
use serde::{Deserialize, Serialize};

use crate::{Frame, Layout, Region, Result, Shape};

/// A single illuminated pixel inside a region.
///
/// The coordinates are relative to the region's own crop, not the full frame.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Hit {
	pub region: String,
	pub x: u32,
	pub y: u32,
	pub color: [u8; 3],
}

/// The ellipse inscribed in a `width` x `height` box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipse {
	cx: f64,
	cy: f64,
	a: f64,
	b: f64,
}

impl Ellipse {
	pub fn inscribed(width: u32, height: u32) -> Self {
		let a = width as f64 / 2.0;
		let b = height as f64 / 2.0;
		Self { cx: a, cy: b, a, b }
	}

	/// Returns true if the pixel index lies on or inside the ellipse.
	pub fn contains(&self, x: u32, y: u32) -> bool {
		let nx = (x as f64 - self.cx) / self.a;
		let ny = (y as f64 - self.cy) / self.b;
		nx * nx + ny * ny <= 1.0
	}
}

/// Scan a single region in row-major order.
pub fn scan(frame: &Frame, region: &Region, background: [u8; 3]) -> Result<Vec<Hit>> {
	let crop = region.resolve(frame.width(), frame.height())?;
	let view = frame.crop(crop);
	let ellipse = Ellipse::inscribed(crop.width, crop.height);
	let background = Rgb(background);

	let mut hits = Vec::new();

	for y in 0..crop.height {
		for x in 0..crop.width {
			if region.shape == Shape::Ellipse && !ellipse.contains(x, y) {
				continue;
			}

			let pixel = view.get_pixel(x, y);
			if pixel == background {
				continue;
			}

			hits.push(Hit {
				region: region.name.clone(),
				x,
				y,
				color: pixel.0,
			});
		}
	}

	tracing::trace!(region = %region.name, ?crop, hits = hits.len(), "scanned region");

	Ok(hits)
}

/// Scan every region of the layout, in layout order.
pub fn extract(frame: &Frame, layout: &Layout) -> Result<Vec<Hit>> {
	let mut hits = Vec::new();
	for region in &layout.regions {
		hits.extend(scan(frame, region, layout.background)?);
	}

	Ok(hits)
}
