use crate::api::render::{self, StateView};
use crate::backend::FILE_FIELD;
use crate::error::AppError;
use crate::models::{ClassificationCounts, UploadFile, UploadKind};
use crate::service::CheckService;
use axum::{
    extract::{Json, Multipart, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Serialize;
use std::sync::Arc;

/// Response body
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
    pub state: Option<StateView>,
}

/// Reconciliation response body (includes counts)
#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub success: bool,
    pub message: String,
    pub counts: ClassificationCounts,
    pub state: StateView,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Busy => StatusCode::CONFLICT,
            AppError::Upload { .. } | AppError::Lookup(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let response = ApiResponse {
            success: false,
            message: self.to_string(),
            state: None,
        };
        (status, Json(response)).into_response()
    }
}

/// Health check
pub async fn health_check() -> &'static str {
    "OK"
}

/// Pull the `bestand` field out of a multipart form; `None` when no file was picked
async fn read_upload(mut multipart: Multipart) -> Result<Option<UploadFile>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("malformed upload: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("malformed upload: {}", e)))?;
        return Ok(Some(UploadFile::new(file_name, bytes.to_vec())));
    }
    Ok(None)
}

async fn upload(service: &CheckService, kind: UploadKind, multipart: Multipart) -> Result<usize, AppError> {
    let file = read_upload(multipart).await?;
    service.upload(kind, file).await
}

async fn upload_response(service: Arc<CheckService>, kind: UploadKind, multipart: Multipart) -> Response {
    match upload(&service, kind, multipart).await {
        Ok(rows) => {
            let state = service.snapshot().await;
            let response = ApiResponse {
                success: true,
                message: format!("Loaded {} {} rows", rows, kind),
                state: Some(StateView::from(&state)),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Current state as JSON
pub async fn get_state(State(service): State<Arc<CheckService>>) -> Json<StateView> {
    let state = service.snapshot().await;
    Json(StateView::from(&state))
}

/// Invoice upload (forwarded to `/upload_factuur`)
pub async fn upload_invoices(
    State(service): State<Arc<CheckService>>,
    multipart: Multipart,
) -> Response {
    upload_response(service, UploadKind::Invoices, multipart).await
}

/// Film percentage upload (forwarded to `/upload_percentages`)
pub async fn upload_references(
    State(service): State<Arc<CheckService>>,
    multipart: Multipart,
) -> Response {
    upload_response(service, UploadKind::References, multipart).await
}

/// Run a reconciliation pass
pub async fn reconcile(State(service): State<Arc<CheckService>>) -> Response {
    match service.reconcile().await {
        Ok(counts) => {
            let state = service.snapshot().await;
            let response = ReconcileResponse {
                success: true,
                message: format!("Checked {} invoices", counts.total()),
                counts,
                state: StateView::from(&state),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Invoice table as CSV download
pub async fn export_csv(State(service): State<Arc<CheckService>>) -> Response {
    let state = service.snapshot().await;
    match render::export_csv(state.invoices()) {
        Ok(body) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"invoice-check.csv\""),
            ],
            body,
        )
            .into_response(),
        Err(e) => AppError::Internal(format!("csv export failed: {}", e)).into_response(),
    }
}

/// HTML page
pub async fn page(State(service): State<Arc<CheckService>>) -> Response {
    let state = service.snapshot().await;
    match render::render_page(&state) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Page render failed: {}", e);
            AppError::Internal(format!("page render failed: {}", e)).into_response()
        }
    }
}

// Form targets: the outcome (including any error) is already in the state, so
// they always send the browser back to the page.

pub async fn form_upload_invoices(
    State(service): State<Arc<CheckService>>,
    multipart: Multipart,
) -> Redirect {
    if let Err(e) = upload(&service, UploadKind::Invoices, multipart).await {
        tracing::debug!("Form upload of invoices: {}", e);
    }
    Redirect::to("/")
}

pub async fn form_upload_references(
    State(service): State<Arc<CheckService>>,
    multipart: Multipart,
) -> Redirect {
    if let Err(e) = upload(&service, UploadKind::References, multipart).await {
        tracing::debug!("Form upload of references: {}", e);
    }
    Redirect::to("/")
}

pub async fn form_reconcile(State(service): State<Arc<CheckService>>) -> Redirect {
    if let Err(e) = service.reconcile().await {
        tracing::debug!("Form reconciliation: {}", e);
    }
    Redirect::to("/")
}
