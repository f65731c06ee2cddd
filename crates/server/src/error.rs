use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("No file part in the request")]
    MissingFilePart,

    #[error("No file selected")]
    NoFileSelected,

    #[error("File too large")]
    UploadTooLarge,

    #[error("No output image generated")]
    NoOutputImage,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFilePart | ApiError::NoFileSelected => StatusCode::BAD_REQUEST,
            ApiError::UploadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NoOutputImage | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::Internal(e) => {
                tracing::error!(error = ?e, "Request failed");
                status.into_response()
            }
            other => {
                tracing::warn!(status = status.as_u16(), error = %other, "Request rejected");
                (
                    status,
                    Json(ErrorBody {
                        error: other.to_string(),
                    }),
                )
                    .into_response()
            }
        }
    }
}
