mod app;
mod config;
mod store;
mod web;

use std::sync::Arc;

use anyhow::Context;
use skev::Decoder;

use app::App;
use config::*;
use store::Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let config = Config::load()?;
	config.log.init()?;

	tracing::trace!(?config, "loaded config");

	let layout = config.layout;
	layout.validate().context("invalid layout")?;

	let regions: Vec<_> = layout.regions.iter().map(|r| r.name.as_str()).collect();
	tracing::info!(background = ?layout.background, ?regions, metadata = %layout.metadata, "using layout");

	let tesseract = config.tesseract.init().await?;
	let fetcher = config.fetch.init()?;
	let decoder = Decoder::new(layout, tesseract)?;
	let store = Store::open(config.storage).await?;

	let app = Arc::new(App::new(fetcher, decoder, store));

	let refresh = app.clone().refresh(config.refresh.interval);

	tokio::select! {
		res = web::serve(app, config.web) => res,
		res = refresh => res,
	}
}
