use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use skev::Snapshot;
use tokio::sync::RwLock;

use crate::StorageConfig;

/// The most recent successful update.
#[derive(Debug)]
pub struct Latest {
	/// The raw image exactly as it was downloaded.
	pub image: Bytes,
	pub content_type: String,
	pub snapshot: Snapshot,

	/// The persisted JSON, served as is.
	pub json: Bytes,
}

/// A single slot holding the latest snapshot, mirrored to disk.
///
/// The slot starts empty until the first successful update, or until a previously persisted pair is restored.
pub struct Store {
	dir: PathBuf,
	latest: RwLock<Option<Arc<Latest>>>,
}

impl Store {
	pub const IMAGE: &'static str = "latest_event.img";
	pub const DATA: &'static str = "latest_event.json";

	pub async fn open(config: StorageConfig) -> anyhow::Result<Self> {
		tokio::fs::create_dir_all(&config.dir)
			.await
			.with_context(|| format!("failed to create {}", config.dir.display()))?;

		let store = Self {
			dir: config.dir,
			latest: Default::default(),
		};

		match store.restore().await {
			Ok(Some(latest)) => {
				tracing::info!(dir = %store.dir.display(), hits = latest.snapshot.hits.len(), "restored snapshot");
				*store.latest.write().await = Some(Arc::new(latest));
			}
			Ok(None) => tracing::info!(dir = %store.dir.display(), "no snapshot yet"),
			Err(err) => tracing::warn!(dir = %store.dir.display(), %err, "ignoring unreadable snapshot"),
		}

		Ok(store)
	}

	async fn restore(&self) -> skev::Result<Option<Latest>> {
		let Some(image) = read_optional(&self.dir.join(Self::IMAGE)).await? else {
			return Ok(None);
		};

		let Some(json) = read_optional(&self.dir.join(Self::DATA)).await? else {
			return Ok(None);
		};

		let snapshot = Snapshot::from_slice(&json)?;
		let content_type = skev::mime_type(&image).unwrap_or("application/octet-stream");

		Ok(Some(Latest {
			image: image.into(),
			content_type: content_type.to_string(),
			snapshot,
			json: json.into(),
		}))
	}

	pub async fn latest(&self) -> Option<Arc<Latest>> {
		self.latest.read().await.clone()
	}

	/// Persist a new snapshot and make it the latest one.
	///
	/// On failure the previous snapshot stays in the slot.
	pub async fn save(&self, image: Bytes, content_type: String, snapshot: Snapshot) -> skev::Result<Arc<Latest>> {
		let json = Bytes::from(snapshot.to_vec_pretty()?);

		self.persist(&image, &json).await?;

		let latest = Arc::new(Latest {
			image,
			content_type,
			snapshot,
			json,
		});

		*self.latest.write().await = Some(latest.clone());

		Ok(latest)
	}

	// The data file marks a complete pair on disk: it is removed before the image is replaced
	// and renamed into place last. An interrupted save restores as an empty slot.
	async fn persist(&self, image: &[u8], json: &[u8]) -> skev::Result<()> {
		let image_path = self.dir.join(Self::IMAGE);
		let data_path = self.dir.join(Self::DATA);
		let image_tmp = temporary(&image_path);
		let data_tmp = temporary(&data_path);

		let res = swap(image, json, &image_path, &data_path, &image_tmp, &data_tmp).await;

		if res.is_err() {
			for tmp in [&image_tmp, &data_tmp] {
				if let Err(err) = tokio::fs::remove_file(tmp).await {
					if err.kind() != std::io::ErrorKind::NotFound {
						tracing::warn!(path = %tmp.display(), %err, "failed to remove staged file");
					}
				}
			}
		}

		res
	}
}

async fn swap(
	image: &[u8],
	json: &[u8],
	image_path: &Path,
	data_path: &Path,
	image_tmp: &Path,
	data_tmp: &Path,
) -> skev::Result<()> {
	tokio::fs::write(image_tmp, image).await?;
	tokio::fs::write(data_tmp, json).await?;

	match tokio::fs::remove_file(data_path).await {
		Err(err) if err.kind() != std::io::ErrorKind::NotFound => return Err(err.into()),
		_ => {}
	}

	tokio::fs::rename(image_tmp, image_path).await?;
	tokio::fs::rename(data_tmp, data_path).await?;

	Ok(())
}

fn temporary(path: &Path) -> PathBuf {
	let mut tmp = OsString::from(path.as_os_str());
	tmp.push(".tmp");
	PathBuf::from(tmp)
}

async fn read_optional(path: &Path) -> skev::Result<Option<Vec<u8>>> {
	match tokio::fs::read(path).await {
		Ok(bytes) => Ok(Some(bytes)),
		Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
		Err(err) => Err(err.into()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use skev::Hit;

	fn create_test_snapshot() -> Snapshot {
		Snapshot {
			metadata: [("Run".to_string(), "12345".to_string())].into(),
			hits: vec![Hit {
				region: "barrel".to_string(),
				x: 1,
				y: 2,
				color: [3, 4, 5],
			}],
		}
	}

	async fn open(dir: &Path) -> Store {
		Store::open(StorageConfig { dir: dir.to_path_buf() }).await.unwrap()
	}

	#[tokio::test]
	async fn test_store_starts_empty() {
		let dir = tempfile::tempdir().unwrap();
		let store = open(dir.path()).await;
		assert!(store.latest().await.is_none());
	}

	#[tokio::test]
	async fn test_store_creates_dir() {
		let dir = tempfile::tempdir().unwrap();
		let nested = dir.path().join("a/b");
		let store = open(&nested).await;

		assert!(nested.is_dir());
		assert!(store.latest().await.is_none());
	}

	#[tokio::test]
	async fn test_store_save_and_restore() {
		let dir = tempfile::tempdir().unwrap();
		let store = open(dir.path()).await;

		let image = Bytes::from_static(b"GIF89a not really");
		let latest = store
			.save(image.clone(), "image/gif".to_string(), create_test_snapshot())
			.await
			.unwrap();

		assert_eq!(latest.snapshot, create_test_snapshot());
		assert_eq!(std::fs::read(dir.path().join(Store::IMAGE)).unwrap(), image.as_ref());
		assert_eq!(std::fs::read(dir.path().join(Store::DATA)).unwrap(), latest.json.as_ref());
		assert!(!dir.path().join("latest_event.json.tmp").exists());

		let reopened = open(dir.path()).await;
		let restored = reopened.latest().await.unwrap();
		assert_eq!(restored.snapshot, create_test_snapshot());
		assert_eq!(restored.image, image);
		assert_eq!(restored.content_type, "image/gif");
		assert_eq!(restored.json, latest.json);
	}

	#[tokio::test]
	async fn test_store_overwrites() {
		let dir = tempfile::tempdir().unwrap();
		let store = open(dir.path()).await;

		store
			.save(Bytes::from_static(b"one"), "image/gif".to_string(), Snapshot::default())
			.await
			.unwrap();
		store
			.save(Bytes::from_static(b"two"), "image/gif".to_string(), create_test_snapshot())
			.await
			.unwrap();

		let latest = store.latest().await.unwrap();
		assert_eq!(latest.image.as_ref(), b"two");
		assert_eq!(latest.snapshot, create_test_snapshot());
	}

	#[cfg(unix)]
	#[tokio::test]
	async fn test_store_interrupted_save() {
		let dir = tempfile::tempdir().unwrap();
		let store = open(dir.path()).await;

		store
			.save(Bytes::from_static(b"one"), "image/gif".to_string(), create_test_snapshot())
			.await
			.unwrap();

		// Renaming a file over a directory fails, so the image swap never happens.
		let image_path = dir.path().join(Store::IMAGE);
		std::fs::remove_file(&image_path).unwrap();
		std::fs::create_dir(&image_path).unwrap();

		let err = store
			.save(Bytes::from_static(b"two"), "image/gif".to_string(), Snapshot::default())
			.await
			.unwrap_err();
		assert_eq!(err.kind(), "StorageError");

		// The staged files are cleaned up and no half-written pair is left behind.
		assert!(!dir.path().join("latest_event.img.tmp").exists());
		assert!(!dir.path().join("latest_event.json.tmp").exists());
		assert!(!dir.path().join(Store::DATA).exists());

		// The previous snapshot is still served.
		let latest = store.latest().await.unwrap();
		assert_eq!(latest.image.as_ref(), b"one");
		assert_eq!(latest.snapshot, create_test_snapshot());

		let reopened = open(dir.path()).await;
		assert!(reopened.latest().await.is_none());
	}

	#[tokio::test]
	async fn test_store_ignores_corrupt_data() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(dir.path().join(Store::IMAGE), b"GIF89a").unwrap();
		std::fs::write(dir.path().join(Store::DATA), b"{ not json").unwrap();

		let store = open(dir.path()).await;
		assert!(store.latest().await.is_none());
	}

	#[tokio::test]
	async fn test_store_needs_both_files() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(dir.path().join(Store::DATA), b"{\"metadata\": {}, \"hits\": []}").unwrap();

		let store = open(dir.path()).await;
		assert!(store.latest().await.is_none());
	}
}
