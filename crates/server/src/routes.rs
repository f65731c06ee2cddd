use crate::{
    error::ApiError,
    state::AppState,
    storage::{self, STATIC_URL_PREFIX},
};
use anyhow::Context;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{
        DefaultBodyLimit, Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
    response::Html,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

const INDEX_HTML: &str = include_str!("../templates/index.html");
const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub message: String,
    pub image_url: String,
}

struct Upload {
    filename: String,
    bytes: Bytes,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    let static_files = ServeDir::new(state.storage.static_root());

    Router::new()
        .route("/", get(index))
        .route("/predict", post(predict))
        .nest_service(&format!("/{STATIC_URL_PREFIX}"), static_files)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn predict(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!(%rejection, "Request is not multipart");
        ApiError::MissingFilePart
    })?;

    let upload = read_file_field(&mut multipart).await?;

    let filename = storage::unique_filename(&upload.filename);
    let upload_path = state.storage.upload_path(&filename);

    tokio::fs::write(&upload_path, &upload.bytes)
        .await
        .with_context(|| format!("Failed to save upload to {}", upload_path.display()))?;

    tracing::info!(
        original = %upload.filename,
        stored = %filename,
        bytes = upload.bytes.len(),
        "Upload saved"
    );

    let save_dir = state.storage.output_dir(&filename);
    let detector = state.detector.clone();
    let prediction = tokio::task::spawn_blocking(move || detector.predict(&upload_path, &save_dir))
        .await
        .context("Inference task panicked")??;

    let Some(output) = storage::first_output_image(&prediction.save_dir).await? else {
        return Err(ApiError::NoOutputImage);
    };

    let image_url = storage::image_url(&filename, &output);
    tracing::info!(
        detections = prediction.detections.len(),
        %image_url,
        "Prediction served"
    );

    Ok(Json(PredictResponse {
        message: "Prediction successful".to_string(),
        image_url,
    }))
}

/// Take the first `file` field that carries a filename. Fields without a
/// filename parameter are plain form values, not file parts.
async fn read_file_field(multipart: &mut Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let Some(filename) = field.file_name().map(str::to_owned) else {
            continue;
        };
        if filename.is_empty() {
            return Err(ApiError::NoFileSelected);
        }

        let bytes = field.bytes().await.map_err(multipart_error)?;
        return Ok(Upload { filename, bytes });
    }

    Err(ApiError::MissingFilePart)
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::UploadTooLarge
    } else {
        tracing::debug!(error = %e, "Malformed multipart body");
        ApiError::MissingFilePart
    }
}
