//! # skev-native: native collaborators for the skev decoder
//!
//! The pieces of a deployment that touch the outside world:
//! - [Fetcher]: downloads the event display image over HTTP.
//! - [Tesseract]: a [skev::Recognize] engine backed by the `tesseract` executable.
//! - [Log]: installs the global tracing subscriber.
//!
//! Each one is configured with a struct usable from both clap and serde, and built with `init()`.
mod fetch;
mod log;
mod tesseract;

pub use fetch::*;
pub use log::*;
pub use tesseract::*;

// export the skev version in use
pub use skev;

use anyhow::Context;
use std::time::Duration;

// A simple seconds parser for clap.
pub fn parse_seconds(s: &str) -> anyhow::Result<Duration> {
	let seconds = s.parse::<u64>().context("expected a number of seconds")?;
	Ok(Duration::from_secs(seconds))
}
