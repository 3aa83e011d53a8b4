//! Request/response shapes of the upstream parsing backend.
//!
//! The backend hands spreadsheet rows back as loosely typed JSON. Everything
//! is translated into the crate's own types here so the rest of the code never
//! sees upstream column names.

use crate::error::BackendError;
use crate::models::{parse_play_week, InvoiceRecord, ReferenceRecord, ResolvedPercentage};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Column holding the film ratio in `/zoek_films` results. The percentages
/// sheet has no header for it, so pandas names it after its position.
pub const RATIO_FIELD: &str = "Unnamed: 2";

/// Body of `POST /zoek_films`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupQuery {
    pub master_title_description: String,
    /// `DD-MM-YYYY`
    pub play_week: String,
}

impl LookupQuery {
    pub fn for_invoice(invoice: &InvoiceRecord) -> Self {
        Self {
            master_title_description: invoice.title.clone(),
            play_week: invoice.play_week_label(),
        }
    }
}

/// One candidate film row returned by a lookup
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LookupMatch {
    /// Film share in [0,1], when the row carries one
    pub ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LookupResponse {
    pub candidates: Vec<LookupMatch>,
}

impl LookupResponse {
    /// Anything but a JSON array (e.g. `{"result": "geen match"}`) means no match
    pub fn from_json(value: &Value) -> Self {
        let candidates = value
            .as_array()
            .map(|rows| {
                rows.iter()
                    .map(|row| LookupMatch {
                        ratio: row.get(RATIO_FIELD).and_then(Value::as_f64),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self { candidates }
    }

    /// Ratio of the first candidate; later candidates are ignored
    pub fn first_ratio(&self) -> Option<f64> {
        self.candidates.first().and_then(|m| m.ratio)
    }

    pub fn resolve(&self) -> ResolvedPercentage {
        match self.first_ratio() {
            Some(ratio) => ResolvedPercentage::from_ratio(ratio),
            None => ResolvedPercentage::Unresolved,
        }
    }
}

/// Invoice row as emitted by `/upload_factuur`
#[derive(Debug, Deserialize)]
struct RawInvoice {
    #[serde(default)]
    master_title_description: Value,
    #[serde(default)]
    play_week: Value,
    #[serde(default)]
    frm_perc: Value,
    #[serde(default)]
    net_rental: Value,
}

impl RawInvoice {
    fn into_record(self, row: usize) -> Result<InvoiceRecord, BackendError> {
        let title = match self.master_title_description {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            other => {
                return Err(BackendError::Decode(format!(
                    "row {}: master_title_description is {}",
                    row, other
                )))
            }
        };

        let play_week = self
            .play_week
            .as_str()
            .and_then(parse_play_week)
            .ok_or_else(|| {
                BackendError::Decode(format!("row {}: unreadable play_week {}", row, self.play_week))
            })?;

        let invoice_percentage = number(&self.frm_perc).ok_or_else(|| {
            BackendError::Decode(format!("row {}: frm_perc is not a number: {}", row, self.frm_perc))
        })?;

        Ok(InvoiceRecord {
            title,
            play_week,
            invoice_percentage,
            net_rental: number(&self.net_rental),
            resolved: ResolvedPercentage::Unresolved,
        })
    }
}

/// Finite number, or a string holding one
fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn upstream_error(value: &Value) -> Option<String> {
    value
        .get("error")
        .map(|e| e.as_str().map(str::to_owned).unwrap_or_else(|| e.to_string()))
}

/// Translate an `/upload_factuur` response into invoice records
pub fn parse_invoices(value: Value) -> Result<Vec<InvoiceRecord>, BackendError> {
    if let Some(message) = upstream_error(&value) {
        return Err(BackendError::Upstream(message));
    }

    let Value::Array(rows) = value else {
        return Err(BackendError::Decode(format!("expected a list of invoices, got {}", value)));
    };

    rows.into_iter()
        .enumerate()
        .map(|(idx, row)| {
            let raw: RawInvoice = serde_json::from_value(row)
                .map_err(|e| BackendError::Decode(format!("row {}: {}", idx + 1, e)))?;
            raw.into_record(idx + 1)
        })
        .collect()
}

/// Translate an `/upload_percentages` response into reference records
pub fn parse_references(value: Value) -> Result<Vec<ReferenceRecord>, BackendError> {
    if let Some(message) = upstream_error(&value) {
        return Err(BackendError::Upstream(message));
    }

    match value {
        Value::Array(rows) => Ok(rows.into_iter().map(ReferenceRecord).collect()),
        // the backend currently answers with a single confirmation object
        obj @ Value::Object(_) => Ok(vec![ReferenceRecord(obj)]),
        other => Err(BackendError::Decode(format!("expected reference rows, got {}", other))),
    }
}
