use crate::models::{InvoiceRecord, ResolvedPercentage};
use serde::{Deserialize, Serialize};

/// Outcome of comparing a claimed percentage with the resolved one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Matched,
    TooLow,
    TooHigh,
    Unresolved,
}

impl Classification {
    /// Both sides on the 0-100 scale
    pub fn of(claimed: f64, resolved: ResolvedPercentage) -> Self {
        match resolved {
            ResolvedPercentage::Unresolved => Self::Unresolved,
            ResolvedPercentage::Value(actual) => {
                if claimed > actual {
                    Self::TooHigh
                } else if claimed == actual {
                    Self::Matched
                } else {
                    Self::TooLow
                }
            }
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Matched => "Matched",
            Self::TooLow => "Too low",
            Self::TooHigh => "Too high",
            Self::Unresolved => "Not yet checked",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Self::Matched => "green",
            Self::TooLow => "orange",
            Self::TooHigh => "red",
            Self::Unresolved => "#FF7F7F",
        }
    }
}

/// Per-category tallies of one reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClassificationCounts {
    pub matched: usize,
    pub too_low: usize,
    pub too_high: usize,
    pub unresolved: usize,
}

impl ClassificationCounts {
    /// State right after an invoice upload: every row still to be checked
    pub fn pending(rows: usize) -> Self {
        Self {
            unresolved: rows,
            ..Self::default()
        }
    }

    pub fn from_records(records: &[InvoiceRecord]) -> Self {
        let mut counts = Self::default();
        for record in records {
            counts.record(record.classification());
        }
        counts
    }

    pub fn record(&mut self, classification: Classification) {
        match classification {
            Classification::Matched => self.matched += 1,
            Classification::TooLow => self.too_low += 1,
            Classification::TooHigh => self.too_high += 1,
            Classification::Unresolved => self.unresolved += 1,
        }
    }

    pub fn get(&self, classification: Classification) -> usize {
        match classification {
            Classification::Matched => self.matched,
            Classification::TooLow => self.too_low,
            Classification::TooHigh => self.too_high,
            Classification::Unresolved => self.unresolved,
        }
    }

    pub fn total(&self) -> usize {
        self.matched + self.too_low + self.too_high + self.unresolved
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}
