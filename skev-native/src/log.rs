use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[serde_as]
#[derive(clap::Args, Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Log {
	/// The default level filter, overridden by RUST_LOG if set.
	#[arg(id = "log-level", long = "log-level", default_value = "info", env = "SKEV_LOG_LEVEL")]
	#[serde_as(as = "DisplayFromStr")]
	pub level: tracing::Level,
}

impl Default for Log {
	fn default() -> Self {
		Self {
			level: tracing::Level::INFO,
		}
	}
}

impl Log {
	/// Install the global subscriber; call once, early in main.
	pub fn init(&self) -> anyhow::Result<()> {
		let filter = EnvFilter::builder()
			.with_default_directive(LevelFilter::from_level(self.level).into())
			.from_env_lossy() // Allow overriding with RUST_LOG
			.add_directive("h2=warn".parse()?)
			.add_directive("hyper_util=warn".parse()?)
			.add_directive("rustls=warn".parse()?)
			.add_directive("tracing::span=off".parse()?)
			.add_directive("tracing::span::active=off".parse()?);

		let logger = tracing_subscriber::FmtSubscriber::builder()
			.with_writer(std::io::stderr)
			.with_env_filter(filter)
			.finish();

		tracing::subscriber::set_global_default(logger)?;

		Ok(())
	}
}
