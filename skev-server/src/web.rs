use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use skev::Recognize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};

use crate::app::App;
use crate::WebConfig;

/// An error returned to an HTTP client.
#[derive(Debug)]
pub enum WebError {
	Skev(skev::Error),

	/// No update has succeeded yet.
	NotAvailable,
}

impl From<skev::Error> for WebError {
	fn from(err: skev::Error) -> Self {
		Self::Skev(err)
	}
}

impl WebError {
	fn status(&self) -> StatusCode {
		match self {
			Self::NotAvailable => StatusCode::NOT_FOUND,
			Self::Skev(err) => match err {
				skev::Error::Fetch(_) | skev::Error::ImageDecode(_) | skev::Error::Geometry { .. } => {
					StatusCode::BAD_GATEWAY
				}
				skev::Error::Ocr(_) => StatusCode::SERVICE_UNAVAILABLE,
				skev::Error::Storage(_) | skev::Error::Json(_) | skev::Error::Layout(_) => {
					StatusCode::INTERNAL_SERVER_ERROR
				}
			},
		}
	}

	fn kind(&self) -> &'static str {
		match self {
			Self::NotAvailable => "NotAvailable",
			Self::Skev(err) => err.kind(),
		}
	}
}

impl IntoResponse for WebError {
	fn into_response(self) -> Response {
		let message = match &self {
			Self::NotAvailable => "no snapshot is available yet".to_string(),
			Self::Skev(err) => err.to_string(),
		};

		error_response(self.status(), self.kind(), message)
	}
}

fn error_response(status: StatusCode, kind: &str, message: String) -> Response {
	let body = json!({
		"status": "error",
		"kind": kind,
		"message": message,
	});

	(status, Json(body)).into_response()
}

async fn handle_404() -> Response {
	error_response(StatusCode::NOT_FOUND, "NotFound", "not found".to_string())
}

async fn update<R: Recognize + 'static>(State(app): State<Arc<App<R>>>) -> Result<Response, WebError> {
	let latest = app.update().await.inspect_err(|err| {
		tracing::warn!(kind = err.kind(), %err, "update failed");
	})?;

	let body = json!({
		"status": "ok",
		"data": latest.snapshot,
	});

	Ok(Json(body).into_response())
}

async fn latest_image<R: Recognize + 'static>(State(app): State<Arc<App<R>>>) -> Result<Response, WebError> {
	let latest = app.store().latest().await.ok_or(WebError::NotAvailable)?;
	Ok(([(CONTENT_TYPE, latest.content_type.clone())], latest.image.clone()).into_response())
}

async fn latest_data<R: Recognize + 'static>(State(app): State<Arc<App<R>>>) -> Result<Response, WebError> {
	let latest = app.store().latest().await.ok_or(WebError::NotAvailable)?;
	Ok(([(CONTENT_TYPE, "application/json")], latest.json.clone()).into_response())
}

// The viewer needs the region bounds to undo the crops.
async fn layout<R: Recognize + 'static>(State(app): State<Arc<App<R>>>) -> Json<skev::Layout> {
	Json(app.layout().clone())
}

pub fn router<R: Recognize + 'static>(app: Arc<App<R>>, public: &Path) -> Router {
	Router::new()
		.route("/update", get(update::<R>))
		.route("/latest/image", get(latest_image::<R>))
		.route("/latest/data", get(latest_data::<R>))
		.route("/layout", get(layout::<R>))
		.route_service("/", ServeFile::new(public.join("index.html")))
		.nest_service("/static", ServeDir::new(public))
		.fallback(handle_404)
		.layer(CorsLayer::new().allow_origin(Any).allow_methods([Method::GET]))
		.with_state(app)
}

/// Serve the HTTP API until ctrl-c.
pub async fn serve<R: Recognize + 'static>(app: Arc<App<R>>, config: WebConfig) -> anyhow::Result<()> {
	let listener = tokio::net::TcpListener::bind(config.listen)
		.await
		.with_context(|| format!("failed to listen on {}", config.listen))?;

	tracing::info!(addr = %listener.local_addr()?, public = %config.public.display(), "listening");

	axum::serve(listener, router(app, &config.public))
		.with_graceful_shutdown(async {
			tokio::signal::ctrl_c().await.ok();
		})
		.await?;

	Ok(())
}
