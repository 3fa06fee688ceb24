use std::sync::Arc;
use std::time::Duration;

use skev::{Decoder, Frame, Layout, Recognize};
use skev_native::Fetcher;

use crate::store::{Latest, Store};

/// Ties the fetcher, the decoder and the store together.
pub struct App<R> {
	fetcher: Fetcher,
	decoder: Decoder<R>,
	store: Store,

	// Only one update runs at a time, so the persisted pair always comes from the same download.
	update: tokio::sync::Mutex<()>,
}

impl<R: Recognize> App<R> {
	pub fn new(fetcher: Fetcher, decoder: Decoder<R>, store: Store) -> Self {
		Self {
			fetcher,
			decoder,
			store,
			update: Default::default(),
		}
	}

	pub fn store(&self) -> &Store {
		&self.store
	}

	pub fn layout(&self) -> &Layout {
		self.decoder.layout()
	}

	/// Fetch, decode and persist a new snapshot.
	///
	/// Nothing is persisted unless every step succeeds.
	#[tracing::instrument("update", skip_all, fields(url = %self.fetcher.url()))]
	pub async fn update(&self) -> skev::Result<Arc<Latest>> {
		let _guard = self.update.lock().await;

		let fetched = self.fetcher.fetch().await?;
		let frame = Frame::decode(&fetched.bytes)?;
		let snapshot = self.decoder.decode(&frame).await?;

		let latest = self.store.save(fetched.bytes, fetched.content_type, snapshot).await?;
		tracing::info!(hits = latest.snapshot.hits.len(), "updated snapshot");

		Ok(latest)
	}

	/// Run an update every `interval`, forever.
	///
	/// Without an interval this never returns.
	pub async fn refresh(self: Arc<Self>, interval: Option<Duration>) -> anyhow::Result<()> {
		let Some(interval) = interval else {
			return std::future::pending().await;
		};

		tracing::info!(?interval, "refreshing periodically");

		let mut ticker = tokio::time::interval(interval);
		ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

		loop {
			ticker.tick().await;

			if let Err(err) = self.update().await {
				tracing::warn!(kind = err.kind(), %err, "refresh failed");
			}
		}
	}
}
