//! Presentation: everything here is derived from an `AppState` snapshot.

use crate::models::{Classification, ClassificationCounts, InvoiceRecord};
use crate::service::{AppState, Phase};
use minijinja::{AutoEscape, Environment};
use serde::Serialize;
use std::sync::LazyLock;

/// One table row as shown to the user
#[derive(Debug, Clone, Serialize)]
pub struct RowView {
    pub title: String,
    pub play_week: String,
    pub invoice_percentage: f64,
    pub net_rental: Option<f64>,
    /// `"50%"`, or `None` while unresolved
    pub resolved_percentage: Option<String>,
    pub classification: Classification,
    pub color: &'static str,
}

impl From<&InvoiceRecord> for RowView {
    fn from(record: &InvoiceRecord) -> Self {
        let classification = record.classification();
        Self {
            title: record.title.clone(),
            play_week: record.play_week_label(),
            invoice_percentage: record.invoice_percentage,
            net_rental: record.net_rental,
            resolved_percentage: record.resolved.is_resolved().then(|| record.resolved.to_string()),
            classification,
            color: classification.color(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StateView {
    pub phase: Phase,
    pub busy: bool,
    pub error: Option<String>,
    pub counts: ClassificationCounts,
    pub reference_rows: usize,
    pub invoices: Vec<RowView>,
}

impl From<&AppState> for StateView {
    fn from(state: &AppState) -> Self {
        Self {
            phase: state.phase(),
            busy: state.is_busy(),
            error: state.error().map(str::to_owned),
            counts: state.counts(),
            reference_rows: state.references().len(),
            invoices: state.invoices().iter().map(RowView::from).collect(),
        }
    }
}

const SUMMARY_ORDER: [Classification; 4] = [
    Classification::Matched,
    Classification::TooLow,
    Classification::TooHigh,
    Classification::Unresolved,
];

const PAGE_TEMPLATE: &str = "index.html";
const PAGE_SOURCE: &str = include_str!("../../templates/index.html");

static ENV: LazyLock<Environment<'static>> = LazyLock::new(|| {
    let mut env = Environment::new();
    env.set_auto_escape_callback(|name| {
        if name.ends_with(".html") {
            AutoEscape::Html
        } else {
            AutoEscape::None
        }
    });
    env
});

#[derive(Serialize)]
struct UploadForm {
    action: &'static str,
    label: &'static str,
}

#[derive(Serialize)]
struct SummaryLine {
    label: &'static str,
    color: &'static str,
    count: usize,
}

#[derive(Serialize)]
struct PageRow {
    title: String,
    play_week: String,
    invoice_percentage: String,
    resolved: String,
    color: &'static str,
}

#[derive(Serialize)]
struct PageContext<'a> {
    forms: [UploadForm; 2],
    busy: bool,
    error: Option<&'a str>,
    summary: Vec<SummaryLine>,
    reference_rows: usize,
    rows: Vec<PageRow>,
}

impl<'a> From<&'a AppState> for PageContext<'a> {
    fn from(state: &'a AppState) -> Self {
        let counts = state.counts();
        let summary = if counts.is_empty() {
            Vec::new()
        } else {
            SUMMARY_ORDER
                .iter()
                .map(|&c| SummaryLine {
                    label: c.label(),
                    color: c.color(),
                    count: counts.get(c),
                })
                .collect()
        };

        Self {
            forms: [
                UploadForm {
                    action: "/upload/invoices",
                    label: "Invoices",
                },
                UploadForm {
                    action: "/upload/percentages",
                    label: "Film percentages",
                },
            ],
            busy: state.is_busy(),
            error: state.error(),
            summary,
            reference_rows: state.references().len(),
            rows: state
                .invoices()
                .iter()
                .map(|record| PageRow {
                    title: record.title.clone(),
                    play_week: record.play_week_label(),
                    invoice_percentage: record.invoice_percentage.to_string(),
                    resolved: record.resolved.to_string(),
                    color: record.classification().color(),
                })
                .collect(),
        }
    }
}

/// Full HTML page: upload forms, check button, summary panel and invoice table
pub fn render_page(state: &AppState) -> Result<String, minijinja::Error> {
    ENV.template_from_named_str(PAGE_TEMPLATE, PAGE_SOURCE)?
        .render(PageContext::from(state))
}

/// Invoice table as CSV
pub fn export_csv(records: &[InvoiceRecord]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record([
        "title",
        "play_week",
        "invoice_percentage",
        "net_rental",
        "resolved_percentage",
        "classification",
    ])?;
    for record in records {
        let resolved = record
            .resolved
            .value()
            .map(crate::models::format_percentage)
            .unwrap_or_default();
        writer.write_record([
            record.title.clone(),
            record.play_week_label(),
            record.invoice_percentage.to_string(),
            record.net_rental.map(|v| v.to_string()).unwrap_or_default(),
            resolved,
            record.classification().label().to_string(),
        ])?;
    }

    writer.into_inner().map_err(|e| e.into_error().into())
}
