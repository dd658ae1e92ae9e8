//! Document Routes
//!
//! - POST /api/v1/applications/:id/documents?file_name=... - Upload (raw body)
//! - GET /api/v1/applications/:id/documents - List an application's documents
//! - GET /api/v1/documents/:id - Download
//!
//! Documents are visible to the owning borrower and admins only.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::dto::{DocumentListResponse, UploadParams};
use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::AuthUser;
use crate::api::state::AppState;
use crate::auth::{policy, Principal};
use crate::documents::{sanitize_file_name, storage_key, validate_upload};
use crate::store::{now_millis, Application, Document};

fn load_for_documents(state: &AppState, principal: &Principal, id: Uuid) -> ApiResult<Application> {
    let application = state.store.get_application(id)?;
    if policy::can_access_documents(principal, &application) {
        Ok(application)
    } else if policy::can_view_application(principal, &application) {
        Err(ApiError::Forbidden(
            "Documents are only available to the borrower and staff".to_string(),
        ))
    } else {
        Err(ApiError::NotFound(format!("Application {} not found", id)))
    }
}

/// POST /api/v1/applications/:id/documents
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Document>)> {
    let principal = caller.principal();
    let application = load_for_documents(&state, &principal, id)?;

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");
    let content_type =
        validate_upload(content_type, body.len() as u64, state.config.max_upload_bytes)?;

    let file_name = sanitize_file_name(&params.file_name);
    let document_id = Uuid::new_v4();
    let key = storage_key(application.id, document_id, &file_name);

    state.documents.put(&key, &body).await?;

    let document = Document {
        id: document_id,
        application_id: application.id,
        uploaded_by: principal.user_id,
        file_name,
        content_type,
        size_bytes: body.len() as u64,
        storage_key: key,
        created_at: now_millis(),
    };

    if let Err(e) = state.store.insert_document(&document) {
        if let Err(cleanup) = state.documents.delete(&document.storage_key).await {
            tracing::warn!(
                key = %document.storage_key,
                error = %cleanup,
                "Failed to remove orphaned document"
            );
        }
        return Err(e.into());
    }

    tracing::info!(
        application_id = %application.id,
        document_id = %document.id,
        size = document.size_bytes,
        "Document uploaded"
    );
    Ok((StatusCode::CREATED, Json(document)))
}

/// GET /api/v1/applications/:id/documents
pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DocumentListResponse>> {
    let application = load_for_documents(&state, &caller.principal(), id)?;
    let documents = state.store.list_documents(application.id)?;

    Ok(Json(DocumentListResponse {
        total: documents.len(),
        documents,
    }))
}

/// GET /api/v1/documents/:id
pub async fn download_document(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let document = state.store.get_document(id)?;
    load_for_documents(&state, &caller.principal(), document.application_id)?;

    let bytes = state.documents.get(&document.storage_key).await?;
    let disposition = format!("attachment; filename=\"{}\"", document.file_name);

    Ok((
        [
            (header::CONTENT_TYPE, document.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}
