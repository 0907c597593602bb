use axum::extract::{Extension, Path};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::middleware::auth::Identity;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::notes::service::{NoteService, NoteView};

#[derive(Debug, Deserialize)]
pub struct NotePayload {
    pub text: String,
    #[serde(default)]
    pub labels: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct NotePatch {
    pub text: Option<String>,
    pub labels: Option<Vec<Uuid>>,
}

/// GET /api/notes - list the caller's notes
pub async fn note_list(Extension(identity): Extension<Identity>) -> ApiResult<Vec<NoteView>> {
    let service = NoteService::from_manager()?;
    let notes = service.list(&identity).await?;
    Ok(ApiResponse::success(notes))
}

/// POST /api/notes - create a note authored by the caller
pub async fn note_create(
    Extension(identity): Extension<Identity>,
    Json(payload): Json<NotePayload>,
) -> ApiResult<NoteView> {
    let service = NoteService::from_manager()?;
    let note = service
        .create(&identity, &payload.text, &payload.labels)
        .await?;
    Ok(ApiResponse::created(note))
}

/// GET /api/notes/:id - retrieve a single owned note
pub async fn note_get(
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> ApiResult<NoteView> {
    let service = NoteService::from_manager()?;
    let note = service.retrieve(&identity, id).await?;
    Ok(ApiResponse::success(note))
}

/// PATCH /api/notes/:id - update text and/or the attached label set
pub async fn note_update(
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
    Json(payload): Json<NotePatch>,
) -> ApiResult<NoteView> {
    let service = NoteService::from_manager()?;
    let note = service
        .update(&identity, id, payload.text.as_deref(), payload.labels.as_deref())
        .await?;
    Ok(ApiResponse::success(note))
}

/// DELETE /api/notes/:id - delete an owned note
pub async fn note_delete(
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    let service = NoteService::from_manager()?;
    service.delete(&identity, id).await?;
    Ok(ApiResponse::<()>::no_content())
}
