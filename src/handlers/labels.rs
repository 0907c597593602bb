use axum::extract::{Extension, Path, Query};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::labels::service::{LabelService, LabelView};
use crate::middleware::auth::Identity;
use crate::middleware::response::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct LabelPayload {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Free-text title filter, applied within the caller's own labels only
    pub search: Option<String>,
}

/// GET /api/labels - list the caller's labels, title-ordered
pub async fn label_list(
    Extension(identity): Extension<Identity>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<LabelView>> {
    let service = LabelService::from_manager()?;
    let labels = service.list(&identity, query.search.as_deref()).await?;
    Ok(ApiResponse::success(labels))
}

/// POST /api/labels - create a label owned by the caller
pub async fn label_create(
    Extension(identity): Extension<Identity>,
    Json(payload): Json<LabelPayload>,
) -> ApiResult<LabelView> {
    let service = LabelService::from_manager()?;
    let label = service.create(&identity, &payload.title).await?;
    Ok(ApiResponse::created(label))
}

/// GET /api/labels/:id - retrieve a single owned label
pub async fn label_get(
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> ApiResult<LabelView> {
    let service = LabelService::from_manager()?;
    let label = service.retrieve(&identity, id).await?;
    Ok(ApiResponse::success(label))
}

/// PATCH /api/labels/:id - rename an owned label
pub async fn label_update(
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
    Json(payload): Json<LabelPayload>,
) -> ApiResult<LabelView> {
    let service = LabelService::from_manager()?;
    let label = service.update(&identity, id, &payload.title).await?;
    Ok(ApiResponse::success(label))
}

/// DELETE /api/labels/:id - delete an owned label, detaching it from notes
pub async fn label_delete(
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    let service = LabelService::from_manager()?;
    service.delete(&identity, id).await?;
    Ok(ApiResponse::<()>::no_content())
}
