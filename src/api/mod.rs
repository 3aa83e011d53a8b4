pub mod handlers;
pub mod render;

pub use handlers::*;

use crate::service::CheckService;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;

/// Page, form targets and JSON API on one router
pub fn router(service: Arc<CheckService>, max_upload_bytes: usize) -> Router {
    // HTML page and its form targets
    let page_routes = Router::new()
        .route("/", get(page))
        .route("/upload/invoices", post(form_upload_invoices))
        .route("/upload/percentages", post(form_upload_references))
        .route("/reconcile", post(form_reconcile));

    // JSON API
    let api_routes = Router::new()
        .route("/api/state", get(get_state))
        .route("/api/upload/invoices", post(upload_invoices))
        .route("/api/upload/percentages", post(upload_references))
        .route("/api/reconcile", post(reconcile))
        .route("/api/export.csv", get(export_csv));

    Router::new()
        .route("/health", get(health_check))
        .merge(page_routes)
        .merge(api_routes)
        .layer(ServiceBuilder::new().layer(DefaultBodyLimit::max(max_upload_bytes)))
        .with_state(service)
}
