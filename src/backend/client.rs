use crate::backend::wire::{self, LookupQuery, LookupResponse};
use crate::config::BackendConfig;
use crate::error::BackendError;
use crate::models::{InvoiceRecord, ReferenceRecord, UploadFile, UploadKind};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::time::Duration;

/// Multipart field the backend reads the uploaded file from
pub const FILE_FIELD: &str = "bestand";

/// Async client for the upstream parsing/lookup backend
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .user_agent(format!("film-invoice-check/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /upload_factuur`
    pub async fn upload_invoices(&self, file: UploadFile) -> Result<Vec<InvoiceRecord>, BackendError> {
        let body = self.post_file(UploadKind::Invoices, file).await?;
        wire::parse_invoices(body)
    }

    /// `POST /upload_percentages`
    pub async fn upload_references(&self, file: UploadFile) -> Result<Vec<ReferenceRecord>, BackendError> {
        let body = self.post_file(UploadKind::References, file).await?;
        wire::parse_references(body)
    }

    /// `POST /zoek_films`
    pub async fn search_films(&self, query: &LookupQuery) -> Result<LookupResponse, BackendError> {
        let url = format!("{}/zoek_films", self.base_url);
        let response = self.http.post(&url).json(query).send().await?;
        let body = read_json(response).await?;
        Ok(LookupResponse::from_json(&body))
    }

    async fn post_file(&self, kind: UploadKind, file: UploadFile) -> Result<Value, BackendError> {
        let url = format!("{}{}", self.base_url, kind.endpoint());
        let size = file.bytes.len();
        let part = Part::bytes(file.bytes).file_name(file.file_name.clone());
        let form = Form::new().part(FILE_FIELD, part);

        tracing::debug!("POST {} ({}, {} bytes)", url, file.file_name, size);
        let response = self.http.post(&url).multipart(form).send().await?;
        read_json(response).await
    }
}

async fn read_json(response: reqwest::Response) -> Result<Value, BackendError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(BackendError::Http {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| BackendError::Decode(e.to_string()))
}
