use crate::backend::{BackendClient, LookupQuery, LookupResponse};
use crate::error::{BackendError, LookupError};
use crate::models::{Classification, ClassificationCounts, InvoiceRecord};
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::pin;

/// Source of actual film percentages, one lookup per invoice row
pub trait FilmLookup: Sync {
    fn lookup(
        &self,
        query: &LookupQuery,
    ) -> impl Future<Output = Result<LookupResponse, BackendError>> + Send;
}

impl FilmLookup for BackendClient {
    async fn lookup(&self, query: &LookupQuery) -> Result<LookupResponse, BackendError> {
        self.search_films(query).await
    }
}

/// What to keep when a lookup fails halfway through a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Nothing from the failed pass is committed
    #[default]
    AbortAndDiscardPartial,
    /// Rows classified before the failure are committed
    AbortAndKeepPartial,
}

/// One classified invoice row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowOutcome {
    /// 0-based position in the input
    pub index: usize,
    pub record: InvoiceRecord,
    pub classification: Classification,
}

/// Result of a reconciliation pass (or its processed prefix)
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ReconcileOutcome {
    pub records: Vec<InvoiceRecord>,
    pub counts: ClassificationCounts,
}

impl ReconcileOutcome {
    fn push(&mut self, row: RowOutcome) {
        self.counts.record(row.classification);
        self.records.push(row.record);
    }
}

/// A pass aborted on its first failing lookup
#[derive(Debug)]
pub struct ReconcileFailure {
    pub error: LookupError,
    /// Processed prefix, only under `AbortAndKeepPartial`
    pub partial: Option<ReconcileOutcome>,
}

/// Lazy, strictly sequential per-row outcomes; a row's lookup starts only
/// once the previous row's lookup has completed
pub fn row_outcomes<'a, L: FilmLookup + 'a>(
    lookup: &'a L,
    invoices: &'a [InvoiceRecord],
) -> impl Stream<Item = Result<RowOutcome, LookupError>> + Send + 'a {
    stream::iter(invoices.iter().enumerate())
        .then(move |(index, invoice)| resolve_row(lookup, index, invoice))
}

async fn resolve_row<L: FilmLookup>(
    lookup: &L,
    index: usize,
    invoice: &InvoiceRecord,
) -> Result<RowOutcome, LookupError> {
    let query = LookupQuery::for_invoice(invoice);

    let response = match lookup.lookup(&query).await {
        Ok(response) => response,
        Err(source) => {
            return Err(LookupError {
                row: index + 1,
                title: invoice.title.clone(),
                play_week: query.play_week,
                source,
            })
        }
    };

    let record = invoice.clone().with_resolved(response.resolve());
    let classification = record.classification();

    Ok(RowOutcome {
        index,
        record,
        classification,
    })
}

/// Run one reconciliation pass over `invoices`, in order
pub async fn reconcile<L: FilmLookup>(
    lookup: &L,
    invoices: &[InvoiceRecord],
    policy: FailurePolicy,
) -> Result<ReconcileOutcome, ReconcileFailure> {
    tracing::info!("Reconciling {} invoices", invoices.len());

    let mut outcome = ReconcileOutcome {
        records: Vec::with_capacity(invoices.len()),
        counts: ClassificationCounts::default(),
    };
    let mut rows = pin!(row_outcomes(lookup, invoices));

    while let Some(row) = rows.next().await {
        match row {
            Ok(row) => {
                tracing::debug!(
                    "row {}/{}: {} ({}) claimed {} -> {} [{:?}]",
                    row.index + 1,
                    invoices.len(),
                    row.record.title,
                    row.record.play_week_label(),
                    row.record.invoice_percentage,
                    row.record.resolved,
                    row.classification
                );
                outcome.push(row)
            }
            Err(error) => {
                tracing::warn!(
                    "Reconciliation aborted after {}/{} rows: {}",
                    outcome.records.len(),
                    invoices.len(),
                    error
                );
                let partial = match policy {
                    FailurePolicy::AbortAndDiscardPartial => None,
                    FailurePolicy::AbortAndKeepPartial => Some(outcome),
                };
                return Err(ReconcileFailure { error, partial });
            }
        }
    }

    let counts = &outcome.counts;
    tracing::info!(
        "Reconciliation done: matched {}, too low {}, too high {}, unresolved {}",
        counts.matched,
        counts.too_low,
        counts.too_high,
        counts.unresolved
    );
    Ok(outcome)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::ResolvedPercentage;
    use chrono::NaiveDate;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Answers lookups by title from a fixed table and records every query
    #[derive(Default)]
    pub(crate) struct ScriptedLookup {
        answers: HashMap<String, Result<Value, u16>>,
        pub seen: Mutex<Vec<LookupQuery>>,
    }

    impl ScriptedLookup {
        pub fn ratio(mut self, title: &str, ratio: f64) -> Self {
            self.answers
                .insert(title.to_string(), Ok(json!([{ "Unnamed: 2": ratio }])));
            self
        }

        pub fn no_match(mut self, title: &str) -> Self {
            self.answers
                .insert(title.to_string(), Ok(json!({"result": "geen match"})));
            self
        }

        pub fn failing(mut self, title: &str, status: u16) -> Self {
            self.answers.insert(title.to_string(), Err(status));
            self
        }

        pub fn titles_seen(&self) -> Vec<String> {
            self.seen
                .lock()
                .unwrap()
                .iter()
                .map(|q| q.master_title_description.clone())
                .collect()
        }
    }

    impl FilmLookup for ScriptedLookup {
        async fn lookup(&self, query: &LookupQuery) -> Result<LookupResponse, BackendError> {
            self.seen.lock().unwrap().push(query.clone());
            match self.answers.get(&query.master_title_description) {
                Some(Ok(body)) => Ok(LookupResponse::from_json(body)),
                Some(Err(status)) => Err(BackendError::Http {
                    status: *status,
                    body: "server error".to_string(),
                }),
                None => Ok(LookupResponse::default()),
            }
        }
    }

    pub(crate) fn invoice(title: &str, day: u32, claimed: f64) -> InvoiceRecord {
        InvoiceRecord::new(title, NaiveDate::from_ymd_opt(2024, 1, day).unwrap(), claimed)
    }

    fn five_invoices() -> Vec<InvoiceRecord> {
        vec![
            invoice("A", 3, 50.0),
            invoice("B", 3, 35.0),
            invoice("C", 10, 40.0),
            invoice("D", 10, 45.0),
            invoice("E", 17, 30.0),
        ]
    }

    #[tokio::test]
    async fn empty_input_gives_zero_counts() {
        let lookup = ScriptedLookup::default();
        let outcome = reconcile(&lookup, &[], FailurePolicy::default()).await.unwrap();

        assert!(outcome.records.is_empty());
        assert_eq!(outcome.counts, ClassificationCounts::default());
        assert!(lookup.titles_seen().is_empty());
    }

    #[tokio::test]
    async fn every_row_lands_in_exactly_one_category() {
        let lookup = ScriptedLookup::default()
            .ratio("A", 0.5)
            .ratio("B", 0.4)
            .ratio("C", 0.35)
            .no_match("D");
        let invoices = five_invoices();

        let outcome = reconcile(&lookup, &invoices, FailurePolicy::default()).await.unwrap();

        assert_eq!(outcome.counts.matched, 1);
        assert_eq!(outcome.counts.too_low, 1);
        assert_eq!(outcome.counts.too_high, 1);
        assert_eq!(outcome.counts.unresolved, 2);
        assert_eq!(outcome.counts.total(), invoices.len());
        assert_eq!(outcome.counts, ClassificationCounts::from_records(&outcome.records));
    }

    #[tokio::test]
    async fn rows_are_queried_in_order_with_formatted_week() {
        let lookup = ScriptedLookup::default().ratio("A", 0.5);
        let invoices = five_invoices();

        let outcome = reconcile(&lookup, &invoices, FailurePolicy::default()).await.unwrap();

        assert_eq!(lookup.titles_seen(), vec!["A", "B", "C", "D", "E"]);
        let seen = lookup.seen.lock().unwrap();
        assert_eq!(seen[0].play_week, "03-01-2024");
        assert_eq!(seen[4].play_week, "17-01-2024");

        let titles: Vec<_> = outcome.records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C", "D", "E"]);
        assert_eq!(outcome.records[0].resolved, ResolvedPercentage::Value(50.0));
    }

    #[tokio::test]
    async fn row_outcomes_carry_their_input_position() {
        let lookup = ScriptedLookup::default().ratio("A", 0.5).failing("C", 500);
        let invoices = five_invoices();

        let rows: Vec<_> = row_outcomes(&lookup, &invoices).collect().await;

        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].as_ref().unwrap().index, 0);
        assert_eq!(rows[0].as_ref().unwrap().classification, Classification::Matched);
        assert_eq!(rows[1].as_ref().unwrap().index, 1);
        assert_eq!(rows[2].as_ref().unwrap_err().row, 3);
        assert_eq!(rows[4].as_ref().unwrap().index, 4);
        assert_eq!(rows[4].as_ref().unwrap().record.title, "E");
    }

    #[tokio::test]
    async fn failure_discards_partial_results_and_stops() {
        let lookup = ScriptedLookup::default()
            .ratio("A", 0.5)
            .ratio("B", 0.35)
            .failing("C", 500);

        let failure = reconcile(&lookup, &five_invoices(), FailurePolicy::AbortAndDiscardPartial)
            .await
            .unwrap_err();

        assert!(failure.partial.is_none());
        assert_eq!(failure.error.row, 3);
        assert_eq!(failure.error.title, "C");
        assert_eq!(failure.error.play_week, "10-01-2024");
        assert_eq!(lookup.titles_seen(), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn keep_partial_policy_returns_processed_prefix() {
        let lookup = ScriptedLookup::default()
            .ratio("A", 0.5)
            .ratio("B", 0.4)
            .failing("C", 502);

        let failure = reconcile(&lookup, &five_invoices(), FailurePolicy::AbortAndKeepPartial)
            .await
            .unwrap_err();

        let partial = failure.partial.expect("prefix kept");
        assert_eq!(partial.records.len(), 2);
        assert_eq!(partial.counts.matched, 1);
        assert_eq!(partial.counts.too_low, 1);
        assert_eq!(partial.counts.total(), 2);
        assert_eq!(partial.counts, ClassificationCounts::from_records(&partial.records));
    }

    #[tokio::test]
    async fn rerun_with_same_answers_is_identical() {
        let lookup = ScriptedLookup::default().ratio("A", 0.5).ratio("C", 0.3333);
        let invoices = five_invoices();

        let first = reconcile(&lookup, &invoices, FailurePolicy::default()).await.unwrap();
        let second = reconcile(&lookup, &first.records, FailurePolicy::default()).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn lookup_error_names_the_row() {
        let lookup = ScriptedLookup::default().failing("A", 500);
        let failure = reconcile(&lookup, &[invoice("A", 3, 50.0)], FailurePolicy::default())
            .await
            .unwrap_err();

        let message = failure.error.to_string();
        assert!(message.contains("row 1"), "{}", message);
        assert!(message.contains("\"A\""), "{}", message);
        assert!(message.contains("03-01-2024"), "{}", message);
    }
}
