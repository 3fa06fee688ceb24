//! # skev: Super-Kamiokande event display decoder
//!
//! `skev` turns one frame of the detector's realtime event display into structured data.
//!
//! ## Overview
//!
//! Two independent stages run over the same immutable [Frame]:
//! - **Region extraction**: every non-background pixel inside the barrel rectangle and the
//!   ceiling/floor ellipses becomes a [Hit], in a stable row-major order.
//! - **Metadata decoding**: the text block in the top-left corner is recognized by a
//!   [Recognize] engine and split into `label: value` pairs.
//!
//! Where those surfaces live is described by a [Layout], which is configuration, not code.
//! The [Decoder] runs both stages and merges them into a [Snapshot].
mod decoder;
mod error;
mod frame;
mod geometry;
mod snapshot;

pub mod metadata;
pub mod region;

pub use decoder::*;
pub use error::*;
pub use frame::*;
pub use geometry::*;
pub use metadata::{Metadata, Recognize};
pub use region::{Ellipse, Hit};
pub use snapshot::*;
