//! Where each detector surface lives inside the frame.
//!
//! The positions are tied to one specific layout of the upstream image.
//! They are loaded from the `[layout]` TOML table, defaulting to the current 939x849 display.
use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A rectangle given by its edges, with `right` and `bottom` exclusive.
///
/// Non-negative values are absolute pixel positions.
/// Negative values count back from the far edge of the frame, so `right = -60` means `width - 60`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
	pub left: i32,
	pub top: i32,
	pub right: i32,
	pub bottom: i32,
}

impl Bounds {
	pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
		Self {
			left,
			top,
			right,
			bottom,
		}
	}

	/// Resolve against a frame of the given size.
	///
	/// Returns None if the rectangle is empty or does not fit.
	pub fn resolve(&self, width: u32, height: u32) -> Option<Crop> {
		let left = edge(self.left, width)?;
		let top = edge(self.top, height)?;
		let right = edge(self.right, width)?;
		let bottom = edge(self.bottom, height)?;

		if left >= right || top >= bottom || right > width || bottom > height {
			return None;
		}

		Some(Crop {
			x: left,
			y: top,
			width: right - left,
			height: bottom - top,
		})
	}
}

fn edge(value: i32, extent: u32) -> Option<u32> {
	match u32::try_from(value) {
		Ok(value) => Some(value),
		Err(_) => extent.checked_sub(value.unsigned_abs()),
	}
}

impl fmt::Display for Bounds {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "({}, {}, {}, {})", self.left, self.top, self.right, self.bottom)
	}
}

/// A rectangle resolved against an actual frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crop {
	pub x: u32,
	pub y: u32,
	pub width: u32,
	pub height: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
	/// Every pixel of the bounds is scanned.
	Rectangle,

	/// Only pixels inside the ellipse inscribed in the bounds are scanned.
	Ellipse,
}

/// One detector surface.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Region {
	/// The name reported on every hit, ex. "barrel".
	pub name: String,
	pub shape: Shape,

	#[serde(flatten)]
	pub bounds: Bounds,
}

impl Region {
	pub fn new(name: impl Into<String>, shape: Shape, bounds: Bounds) -> Self {
		Self {
			name: name.into(),
			shape,
			bounds,
		}
	}

	/// Resolve the bounds against a frame, failing if the region falls outside of it.
	pub fn resolve(&self, width: u32, height: u32) -> Result<Crop> {
		resolve(&self.name, &self.bounds, width, height)
	}
}

fn resolve(name: &str, bounds: &Bounds, width: u32, height: u32) -> Result<Crop> {
	bounds.resolve(width, height).ok_or_else(|| Error::Geometry {
		region: name.to_string(),
		bounds: *bounds,
		width,
		height,
	})
}

/// The full geometry table for one upstream image layout.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Layout {
	/// Pixels of exactly this color are background and never reported as hits.
	pub background: [u8; 3],

	/// The text block decoded into metadata.
	pub metadata: Bounds,

	/// The scanned surfaces, in scan order.
	pub regions: Vec<Region>,
}

impl Layout {
	/// The name used in errors about the metadata rectangle.
	pub const METADATA: &'static str = "metadata";

	/// Sanity check the table itself, independent of any frame.
	pub fn validate(&self) -> Result<()> {
		if self.regions.is_empty() {
			return Err(Error::Layout("no regions configured".to_string()));
		}

		let mut names = HashSet::new();
		for region in &self.regions {
			if region.name.is_empty() {
				return Err(Error::Layout("region with an empty name".to_string()));
			}

			if !names.insert(region.name.as_str()) {
				return Err(Error::Layout(format!("duplicate region: {}", region.name)));
			}
		}

		Ok(())
	}

	/// Make sure every rectangle fits inside a frame of the given size.
	pub fn check(&self, width: u32, height: u32) -> Result<()> {
		self.metadata_crop(width, height)?;
		for region in &self.regions {
			region.resolve(width, height)?;
		}

		Ok(())
	}

	pub fn metadata_crop(&self, width: u32, height: u32) -> Result<Crop> {
		resolve(Self::METADATA, &self.metadata, width, height)
	}
}

impl Default for Layout {
	/// The layout of the 939x849 Super-Kamiokande realtime event display.
	fn default() -> Self {
		Self {
			background: [0, 0, 0],
			metadata: Bounds::new(0, 0, 400, 200),
			regions: vec![
				Region::new("barrel", Shape::Rectangle, Bounds::new(30, 291, -60, 579)),
				Region::new("ceiling", Shape::Ellipse, Bounds::new(453, 21, 863, 291)),
				Region::new("floor", Shape::Ellipse, Bounds::new(453, 579, 863, 849)),
			],
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_layout_resolves() {
		let layout = Layout::default();
		layout.validate().unwrap();
		layout.check(939, 849).unwrap();

		let crops: Vec<_> = layout.regions.iter().map(|r| r.resolve(939, 849).unwrap()).collect();
		assert_eq!(
			crops[0],
			Crop {
				x: 30,
				y: 291,
				width: 849,
				height: 288
			}
		);
		assert_eq!(
			crops[1],
			Crop {
				x: 453,
				y: 21,
				width: 410,
				height: 270
			}
		);
		assert_eq!(
			crops[2],
			Crop {
				x: 453,
				y: 579,
				width: 410,
				height: 270
			}
		);

		assert_eq!(
			layout.metadata_crop(939, 849).unwrap(),
			Crop {
				x: 0,
				y: 0,
				width: 400,
				height: 200
			}
		);
	}

	#[test]
	fn test_negative_edges_follow_the_frame() {
		let bounds = Bounds::new(-20, 0, -10, -1);
		assert_eq!(
			bounds.resolve(100, 50),
			Some(Crop {
				x: 80,
				y: 0,
				width: 10,
				height: 49
			})
		);

		// Counting back past the origin.
		assert_eq!(Bounds::new(-200, 0, 10, 10).resolve(100, 50), None);
	}

	#[test]
	fn test_bounds_rejects_empty_and_oversized() {
		assert_eq!(Bounds::new(10, 10, 10, 20).resolve(100, 100), None);
		assert_eq!(Bounds::new(20, 10, 10, 20).resolve(100, 100), None);
		assert_eq!(Bounds::new(0, 0, 101, 20).resolve(100, 100), None);
		assert_eq!(Bounds::new(0, 0, 100, 100).resolve(100, 100).map(|c| c.width), Some(100));
	}

	#[test]
	fn test_check_small_frame() {
		let layout = Layout::default();
		let err = layout.check(800, 600).unwrap_err();
		assert_eq!(err.kind(), "ImageGeometryError");

		match err {
			Error::Geometry {
				region, width, height, ..
			} => {
				assert_eq!(region, "ceiling");
				assert_eq!((width, height), (800, 600));
			}
			other => panic!("unexpected error: {other}"),
		}
	}

	#[test]
	fn test_check_metadata_first() {
		let layout = Layout::default();
		let err = layout.check(300, 849).unwrap_err();
		assert!(err.to_string().contains("\"metadata\""));
	}

	#[test]
	fn test_validate_duplicate_names() {
		let mut layout = Layout::default();
		layout.regions[2].name = "ceiling".to_string();
		let err = layout.validate().unwrap_err();
		assert!(err.to_string().contains("duplicate region: ceiling"));
	}

	#[test]
	fn test_validate_empty() {
		let layout = Layout {
			regions: Vec::new(),
			..Default::default()
		};
		assert!(layout.validate().is_err());
	}

	#[test]
	fn test_region_json() {
		let region: Region = serde_json::from_str(
			r#"{"name": "barrel", "shape": "rectangle", "left": 30, "top": 291, "right": -60, "bottom": 579}"#,
		)
		.unwrap();
		assert_eq!(region, Layout::default().regions[0]);
	}
}
