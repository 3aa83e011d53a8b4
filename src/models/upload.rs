use crate::service::Operation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which of the two datasets a file is meant for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadKind {
    Invoices,
    References,
}

impl UploadKind {
    /// Upstream endpoint that parses this kind of file
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::Invoices => "/upload_factuur",
            Self::References => "/upload_percentages",
        }
    }

    pub fn operation(self) -> Operation {
        match self {
            Self::Invoices => Operation::InvoiceUpload,
            Self::References => Operation::ReferenceUpload,
        }
    }

    pub fn failure_reason(self) -> &'static str {
        match self {
            Self::Invoices => "invoice upload failed",
            Self::References => "reference upload failed",
        }
    }
}

impl fmt::Display for UploadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invoices => write!(f, "invoices"),
            Self::References => write!(f, "references"),
        }
    }
}

/// A file picked by the user, forwarded as multipart field `bestand`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// File name up to the first dot, ignoring any client-side directory
    pub fn base_name(&self) -> &str {
        let name = self
            .file_name
            .rsplit(|c: char| c == '/' || c == '\\')
            .next()
            .unwrap_or(&self.file_name);
        match name.split_once('.') {
            Some((base, _)) => base,
            None => name,
        }
    }
}
