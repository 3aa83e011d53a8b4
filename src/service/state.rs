//! Application state and the only way to change it.
//!
//! Every upload or reconciliation pass goes `Idle -> Busy(op) -> Idle`; a
//! local validation failure goes `Idle -> Error` without ever being busy.
//! The current error is cleared when the next operation starts.

use crate::models::{ClassificationCounts, InvoiceRecord, ReferenceRecord};
use crate::service::reconciler::ReconcileOutcome;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    InvoiceUpload,
    ReferenceUpload,
    Reconcile,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvoiceUpload => write!(f, "invoice upload"),
            Self::ReferenceUpload => write!(f, "reference upload"),
            Self::Reconcile => write!(f, "reconciliation"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "phase", content = "operation", rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Busy(Operation),
}

#[derive(Debug)]
pub enum Event {
    Started(Operation),
    /// Local validation failure; no operation was started
    Rejected(String),
    InvoicesLoaded(Vec<InvoiceRecord>),
    ReferencesLoaded(Vec<ReferenceRecord>),
    Reconciled(ReconcileOutcome),
    Failed {
        message: String,
        /// Rows to commit from an aborted reconciliation pass
        partial: Option<ReconcileOutcome>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("{0} is still running")]
    Busy(Operation),
    #[error("no operation is running")]
    NotBusy,
    #[error("event does not belong to the running {0}")]
    Mismatch(Operation),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AppState {
    invoices: Vec<InvoiceRecord>,
    references: Vec<ReferenceRecord>,
    counts: ClassificationCounts,
    phase: Phase,
    error: Option<String>,
}

impl AppState {
    pub fn invoices(&self) -> &[InvoiceRecord] {
        &self.invoices
    }

    pub fn references(&self) -> &[ReferenceRecord] {
        &self.references
    }

    pub fn counts(&self) -> ClassificationCounts {
        self.counts
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.phase, Phase::Busy(_))
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn apply(&mut self, event: Event) -> Result<(), TransitionError> {
        match (self.phase, event) {
            (Phase::Busy(op), Event::Started(_)) | (Phase::Busy(op), Event::Rejected(_)) => {
                Err(TransitionError::Busy(op))
            }
            (Phase::Idle, Event::Started(op)) => {
                self.error = None;
                self.phase = Phase::Busy(op);
                Ok(())
            }
            (Phase::Idle, Event::Rejected(message)) => {
                self.error = Some(message);
                Ok(())
            }
            (Phase::Idle, _) => Err(TransitionError::NotBusy),

            (Phase::Busy(Operation::InvoiceUpload), Event::InvoicesLoaded(records)) => {
                self.counts = ClassificationCounts::pending(records.len());
                self.invoices = records;
                self.phase = Phase::Idle;
                Ok(())
            }
            (Phase::Busy(Operation::ReferenceUpload), Event::ReferencesLoaded(records)) => {
                self.references = records;
                self.phase = Phase::Idle;
                Ok(())
            }
            (Phase::Busy(Operation::Reconcile), Event::Reconciled(outcome)) => {
                self.counts = outcome.counts;
                self.invoices = outcome.records;
                self.phase = Phase::Idle;
                Ok(())
            }
            (Phase::Busy(op), Event::Failed { message, partial }) => {
                if let (Operation::Reconcile, Some(partial)) = (op, partial) {
                    self.commit_prefix(partial);
                }
                self.error = Some(message);
                self.phase = Phase::Idle;
                Ok(())
            }
            (Phase::Busy(op), _) => Err(TransitionError::Mismatch(op)),
        }
    }

    /// Replace the processed rows; rows after the failure keep their previous value
    /// and are left out of the counts
    fn commit_prefix(&mut self, partial: ReconcileOutcome) {
        let processed = partial.records.len().min(self.invoices.len());
        let untouched = self.invoices.split_off(processed);
        self.invoices = partial.records;
        self.invoices.extend(untouched);
        self.counts = partial.counts;
    }
}
