use std::time::Duration;

use anyhow::Context;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use skev::Error;
use url::Url;

/// The realtime event display published by the Super-Kamiokande collaboration.
pub const DEFAULT_URL: &str = "https://www-sk.icrr.u-tokyo.ac.jp/realtimemonitor/skev.gif";

#[serde_as]
#[derive(clap::Args, Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
	/// Download the event display image from this URL.
	#[arg(id = "fetch-url", long = "fetch-url", default_value = DEFAULT_URL, env = "SKEV_FETCH_URL")]
	pub url: Url,

	/// Give up on a download after this many seconds.
	#[arg(
		id = "fetch-timeout",
		long = "fetch-timeout",
		default_value = "10",
		value_parser = crate::parse_seconds,
		env = "SKEV_FETCH_TIMEOUT"
	)]
	#[serde_as(as = "DurationSeconds<u64>")]
	pub timeout: Duration,
}

impl Default for FetchConfig {
	fn default() -> Self {
		Self {
			url: DEFAULT_URL.parse().expect("default URL is valid"),
			timeout: Duration::from_secs(10),
		}
	}
}

impl FetchConfig {
	pub fn init(self) -> anyhow::Result<Fetcher> {
		Fetcher::new(self)
	}
}

/// The raw bytes of one download.
#[derive(Debug, Clone)]
pub struct Fetched {
	pub bytes: Bytes,

	/// Sniffed from the bytes, falling back to the Content-Type header.
	pub content_type: String,
}

#[derive(Clone)]
pub struct Fetcher {
	client: reqwest::Client,
	url: Url,
}

impl Fetcher {
	pub fn new(config: FetchConfig) -> anyhow::Result<Self> {
		let client = reqwest::Client::builder()
			.timeout(config.timeout)
			.user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
			.build()
			.context("failed to build HTTP client")?;

		Ok(Self {
			client,
			url: config.url,
		})
	}

	pub fn url(&self) -> &Url {
		&self.url
	}

	/// Download the image once.
	///
	/// Network errors, timeouts and non-2xx responses are all [Error::Fetch].
	pub async fn fetch(&self) -> skev::Result<Fetched> {
		let response = self.client.get(self.url.clone()).send().await.map_err(fetch_error)?;

		let status = response.status();
		if !status.is_success() {
			return Err(Error::Fetch(format!("{} responded with {}", self.url, status)));
		}

		let header = response
			.headers()
			.get(CONTENT_TYPE)
			.and_then(|value| value.to_str().ok())
			.map(str::to_string);

		let bytes = response.bytes().await.map_err(fetch_error)?;

		let content_type = skev::mime_type(&bytes)
			.map(str::to_string)
			.or(header)
			.unwrap_or_else(|| "application/octet-stream".to_string());

		tracing::debug!(url = %self.url, size = bytes.len(), %content_type, "fetched image");

		Ok(Fetched { bytes, content_type })
	}
}

// reqwest hides the interesting part (ex. connection refused) in the source chain.
fn fetch_error(err: reqwest::Error) -> Error {
	let mut message = err.to_string();

	let mut source = std::error::Error::source(&err);
	while let Some(cause) = source {
		message.push_str(": ");
		message.push_str(&cause.to_string());
		source = cause.source();
	}

	Error::Fetch(message)
}
