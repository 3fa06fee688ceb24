use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{CommandFactory, FromArgMatches, Parser};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};

#[derive(Parser, Clone, Debug, Serialize, Deserialize, Default)]
#[command(name = "skev-server")]
#[command(about = "Decode the Super-Kamiokande event display and serve it over HTTP", long_about = None)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
	/// Load the configuration from this TOML file.
	/// Flags and environment variables that are set explicitly override the file.
	#[serde(skip)]
	#[arg(value_name = "FILE")]
	pub file: Option<PathBuf>,

	/// The HTTP server configuration.
	#[command(flatten)]
	pub web: WebConfig,

	/// Where the latest snapshot is persisted.
	#[command(flatten)]
	pub storage: StorageConfig,

	/// Periodic refresh, disabled unless an interval is given.
	#[command(flatten)]
	pub refresh: RefreshConfig,

	/// The remote image source.
	#[command(flatten)]
	pub fetch: skev_native::FetchConfig,

	/// The text-recognition engine.
	#[command(flatten)]
	pub tesseract: skev_native::TesseractConfig,

	/// The log configuration.
	#[command(flatten)]
	pub log: skev_native::Log,

	/// The region layout of the event display.
	#[arg(skip)] // It's too difficult to handle this in clap; use TOML.
	pub layout: skev::Layout,
}

impl Config {
	pub fn load() -> anyhow::Result<Self> {
		// Parse just the CLI arguments initially.
		let mut config = Config::parse();

		// If a file is provided, load it and apply the CLI arguments on top.
		if let Some(file) = config.file.take() {
			let contents = std::fs::read_to_string(&file).with_context(|| format!("failed to read {}", file.display()))?;
			config = Config::from_toml(&contents).with_context(|| format!("failed to parse {}", file.display()))?;
			config.file = Some(file);

			// Re-parse without defaults so only values that were actually provided win over the file.
			let matches = Config::command().mut_args(|arg| arg.default_value(None)).get_matches();
			config.update_from_arg_matches(&matches)?;
		}

		Ok(config)
	}

	pub fn from_toml(s: &str) -> anyhow::Result<Self> {
		Ok(toml::from_str(s)?)
	}
}

#[derive(clap::Args, Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebConfig {
	/// Listen for HTTP requests on the given address.
	#[arg(long = "listen", id = "listen", default_value = "[::]:8000", env = "SKEV_LISTEN")]
	pub listen: SocketAddr,

	/// Serve the landing page and static assets from this directory.
	#[arg(long = "public", id = "public", default_value = "public", env = "SKEV_PUBLIC")]
	pub public: PathBuf,
}

impl Default for WebConfig {
	fn default() -> Self {
		Self {
			listen: SocketAddr::from(([0u16; 8], 8000)),
			public: PathBuf::from("public"),
		}
	}
}

#[derive(clap::Args, Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
	/// Persist the latest image and snapshot in this directory.
	#[arg(long = "data-dir", id = "data-dir", default_value = "data", env = "SKEV_DATA_DIR")]
	pub dir: PathBuf,
}

impl Default for StorageConfig {
	fn default() -> Self {
		Self {
			dir: PathBuf::from("data"),
		}
	}
}

#[serde_as]
#[derive(clap::Args, Clone, Debug, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct RefreshConfig {
	/// Fetch and decode a new snapshot every this many seconds.
	#[arg(
		long = "refresh-interval",
		id = "refresh-interval",
		value_parser = skev_native::parse_seconds,
		env = "SKEV_REFRESH_INTERVAL"
	)]
	#[serde_as(as = "Option<DurationSeconds<u64>>")]
	pub interval: Option<Duration>,
}
