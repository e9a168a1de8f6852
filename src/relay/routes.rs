//! Upload, list and delete endpoints.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Multipart, Path, State, multipart::MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use thiserror::Error;

use super::{
    naming::{public_url, upload_filename},
    store::{ObjectStore, StoreError},
    types::{DeleteResponse, ErrorBody, UploadResponse},
};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
const NO_FILE_MESSAGE: &str = "No file received";

pub type RelayState = Arc<dyn ObjectStore>;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    StoreWrite(StoreError),

    #[error(transparent)]
    Store(StoreError),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Validation(_) => StatusCode::BAD_REQUEST,
            RelayError::StoreWrite(_) | RelayError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorBody::new(self.to_string()))).into_response()
    }
}

pub fn create_router(state: RelayState) -> Router {
    Router::new()
        .route("/upload", post(upload))
        .route("/files", get(list_files))
        .route("/delete/:filename", delete(delete_file))
        .with_state(state)
}

struct ReceivedFile {
    original_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

/// First part named `file`; other parts are ignored.
async fn read_file_part(mut multipart: Multipart) -> Result<Option<ReceivedFile>, RelayError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| RelayError::Validation(err.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let original_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|err| RelayError::Validation(err.body_text()))?;
        return Ok(Some(ReceivedFile {
            original_name,
            content_type,
            bytes: bytes.to_vec(),
        }));
    }
    Ok(None)
}

async fn upload(
    State(store): State<RelayState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, RelayError> {
    let file = match multipart {
        Ok(multipart) => read_file_part(multipart).await?,
        Err(rejection) => {
            log::debug!("[UPLOAD] not a multipart request: {rejection}");
            None
        }
    };
    let Some(file) = file else {
        log::error!("[UPLOAD] {NO_FILE_MESSAGE}");
        return Err(RelayError::Validation(NO_FILE_MESSAGE.to_string()));
    };

    let name = upload_filename(
        file.original_name.as_deref(),
        chrono::Utc::now().timestamp_millis(),
    );
    log::info!("[UPLOAD] Received {} bytes, naming as: {name}", file.bytes.len());

    let content_type = file.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE);
    store
        .put(&name, file.bytes, content_type)
        .await
        .map_err(|err| {
            log::error!("[UPLOAD ERROR] store write failed: {err}");
            RelayError::StoreWrite(err)
        })?;

    let url = public_url(store.bucket(), &name);
    log::info!("[UPLOAD] File uploaded. Public URL: {url}");
    Ok(Json(UploadResponse { url }))
}

async fn list_files(State(store): State<RelayState>) -> Result<Json<Vec<String>>, RelayError> {
    let names = store.list().await.map_err(|err| {
        log::error!("[FILES ERROR] Getting files failed: {err}");
        RelayError::Store(err)
    })?;
    let urls: Vec<String> = names
        .iter()
        .map(|name| public_url(store.bucket(), name))
        .collect();
    log::info!("[FILES] Returned {} files", urls.len());
    Ok(Json(urls))
}

async fn delete_file(
    State(store): State<RelayState>,
    Path(filename): Path<String>,
) -> Result<Json<DeleteResponse>, RelayError> {
    store.delete(&filename).await.map_err(|err| {
        log::error!("[DELETE ERROR] {filename}: {err}");
        RelayError::Store(err)
    })?;
    log::info!("[DELETE] Removed {filename}");
    Ok(Json(DeleteResponse { success: true }))
}
