use std::io::Cursor;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use image::{ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use skev::{Error, Recognize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[serde_as]
#[derive(clap::Args, Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TesseractConfig {
	/// The tesseract executable.
	/// A bare name is looked up on the PATH.
	#[arg(id = "tesseract", long = "tesseract", default_value = "tesseract", env = "TESSERACT_CMD")]
	pub binary: PathBuf,

	/// The recognition language(s), ex. "eng" or "eng+jpn".
	#[arg(
		id = "tesseract-lang",
		long = "tesseract-lang",
		default_value = "eng",
		env = "SKEV_TESSERACT_LANG"
	)]
	pub lang: String,

	/// Kill the engine if a single recognition takes longer than this many seconds.
	#[arg(
		id = "tesseract-timeout",
		long = "tesseract-timeout",
		default_value = "30",
		value_parser = crate::parse_seconds,
		env = "SKEV_TESSERACT_TIMEOUT"
	)]
	#[serde_as(as = "DurationSeconds<u64>")]
	pub timeout: Duration,
}

impl Default for TesseractConfig {
	fn default() -> Self {
		Self {
			binary: PathBuf::from("tesseract"),
			lang: "eng".to_string(),
			timeout: Duration::from_secs(30),
		}
	}
}

impl TesseractConfig {
	/// Probe the engine once so a missing install fails at startup instead of on the first request.
	pub async fn init(self) -> anyhow::Result<Tesseract> {
		let probe = Command::new(&self.binary).arg("--version").kill_on_drop(true).output();

		let output = tokio::time::timeout(self.timeout, probe)
			.await
			.context("timed out probing tesseract")?
			.with_context(|| format!("failed to run {}", self.binary.display()))?;

		anyhow::ensure!(
			output.status.success(),
			"{} --version exited with {}",
			self.binary.display(),
			output.status
		);

		// Older releases print the version to stderr.
		let version = match output.stdout.is_empty() {
			true => String::from_utf8_lossy(&output.stderr),
			false => String::from_utf8_lossy(&output.stdout),
		};
		let version = version.lines().next().unwrap_or_default().trim().to_string();

		tracing::info!(binary = %self.binary.display(), %version, lang = %self.lang, "found tesseract");

		Ok(Tesseract { config: self })
	}
}

/// Runs `tesseract stdin stdout` once per recognition.
pub struct Tesseract {
	config: TesseractConfig,
}

impl Tesseract {
	async fn run(&self, png: &[u8]) -> skev::Result<String> {
		let binary = self.config.binary.display();

		let mut child = Command::new(&self.config.binary)
			.args(["stdin", "stdout", "-l"])
			.arg(&self.config.lang)
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.kill_on_drop(true)
			.spawn()
			.map_err(|err| Error::Ocr(format!("failed to start {binary}: {err}")))?;

		let mut stdin = child
			.stdin
			.take()
			.ok_or_else(|| Error::Ocr(format!("no stdin for {binary}")))?;

		stdin
			.write_all(png)
			.await
			.map_err(|err| Error::Ocr(format!("failed to write to {binary}: {err}")))?;

		// Close stdin so the engine sees the end of the image.
		drop(stdin);

		let output = child
			.wait_with_output()
			.await
			.map_err(|err| Error::Ocr(format!("failed to wait for {binary}: {err}")))?;

		if !output.status.success() {
			let stderr = String::from_utf8_lossy(&output.stderr);
			return Err(Error::Ocr(format!(
				"{binary} exited with {}: {}",
				output.status,
				stderr.trim()
			)));
		}

		Ok(String::from_utf8_lossy(&output.stdout).into_owned())
	}
}

impl Recognize for Tesseract {
	async fn recognize(&self, image: &RgbImage) -> skev::Result<String> {
		let mut png = Vec::new();
		image
			.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
			.map_err(|err| Error::Ocr(format!("failed to encode crop: {err}")))?;

		match tokio::time::timeout(self.config.timeout, self.run(&png)).await {
			Ok(res) => res,
			Err(_) => Err(Error::Ocr(format!(
				"recognition timed out after {}s",
				self.config.timeout.as_secs()
			))),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn create_test_config(binary: &str) -> TesseractConfig {
		TesseractConfig {
			binary: PathBuf::from(binary),
			timeout: Duration::from_secs(5),
			..Default::default()
		}
	}

	#[tokio::test]
	async fn test_init_missing_binary() {
		let err = create_test_config("/nonexistent/skev/tesseract").init().await.err().unwrap();
		assert!(err.to_string().contains("failed to run /nonexistent/skev/tesseract"));
	}

	#[cfg(unix)]
	#[tokio::test]
	async fn test_init_failing_binary() {
		// `false` exits non-zero even for --version.
		let err = create_test_config("false").init().await.err().unwrap();
		assert!(err.to_string().contains("--version exited with"));
	}

	#[tokio::test]
	async fn test_recognize_missing_binary() {
		let tesseract = Tesseract {
			config: create_test_config("/nonexistent/skev/tesseract"),
		};

		let err = tesseract.recognize(&RgbImage::new(40, 20)).await.unwrap_err();
		assert_eq!(err.kind(), "OcrEngineError");
		assert!(err.to_string().contains("failed to start"));
	}

	#[cfg(unix)]
	#[tokio::test]
	async fn test_recognize_failing_binary() {
		let tesseract = Tesseract {
			config: create_test_config("false"),
		};

		let err = tesseract.recognize(&RgbImage::new(40, 20)).await.unwrap_err();
		assert_eq!(err.kind(), "OcrEngineError");
	}
}
