use axum::{extract::Multipart, extract::State, Json};
use bytes::Bytes;
use serde::Serialize;

use crate::errors::AppError;
use crate::state::AppState;

const ERR_NO_FILE: &str = "Debes adjuntar un archivo.";
const ERR_NOT_JSON_FILE: &str = "El archivo debe ser un JSON.";
const MSG_UPLOADED: &str = "Base de conocimiento actualizada exitosamente.";
const MSG_PURGED: &str = "Base de conocimiento purgada exitosamente.";

#[derive(Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    #[serde(rename = "fragmentsLoaded")]
    pub fragments_loaded: usize,
}

#[derive(Serialize)]
pub struct PurgeResponse {
    pub message: &'static str,
}

/// POST /knowledge/upload
/// Replaces the CV knowledge base with an uploaded JSON embeddings file.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut file: Option<(Option<String>, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.to_string()))?
    {
        if field.name() == Some("file") {
            let content_type = field.content_type().map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(e.to_string()))?;
            file = Some((content_type, data));
            break;
        }
    }

    let (content_type, data) =
        file.ok_or_else(|| AppError::Validation(ERR_NO_FILE.to_string()))?;

    if content_type.as_deref() != Some("application/json") {
        return Err(AppError::Validation(ERR_NOT_JSON_FILE.to_string()));
    }

    let fragments_loaded = state.knowledge.replace(&data).await?;

    Ok(Json(UploadResponse {
        message: MSG_UPLOADED,
        fragments_loaded,
    }))
}

/// DELETE /knowledge
/// Clears the knowledge base from memory and disk.
pub async fn handle_clear(State(state): State<AppState>) -> Json<PurgeResponse> {
    state.knowledge.clear().await;
    Json(PurgeResponse {
        message: MSG_PURGED,
    })
}
