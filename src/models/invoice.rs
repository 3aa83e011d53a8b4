use crate::models::Classification;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Play week format used for display and for the lookup request
pub const PLAY_WEEK_FORMAT: &str = "%d-%m-%Y";

/// Actual percentage for an invoice row, 0-100 scale
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum ResolvedPercentage {
    #[default]
    Unresolved,
    Value(f64),
}

impl ResolvedPercentage {
    /// Convert an upstream ratio in [0,1] to a percentage rounded to 2 decimals
    pub fn from_ratio(ratio: f64) -> Self {
        Self::Value(round_percentage(ratio * 100.0))
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Unresolved => None,
            Self::Value(v) => Some(*v),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Value(_))
    }
}

impl fmt::Display for ResolvedPercentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unresolved => write!(f, "Not yet checked"),
            Self::Value(v) => write!(f, "{}%", format_percentage(*v)),
        }
    }
}

/// Round to 2 decimals, halves away from zero: 28.125 -> 28.13
pub fn round_percentage(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Two decimals, with a trailing ".00" dropped: 50.0 -> "50", 33.33 -> "33.33"
pub fn format_percentage(value: f64) -> String {
    let fixed = format!("{:.2}", round_percentage(value));
    match fixed.strip_suffix(".00") {
        Some(whole) => whole.to_string(),
        None => fixed,
    }
}

/// One invoice row as loaded from the invoice upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub title: String,
    pub play_week: NaiveDate,
    /// Claimed percentage, 0-100 scale
    pub invoice_percentage: f64,
    pub net_rental: Option<f64>,
    pub resolved: ResolvedPercentage,
}

impl InvoiceRecord {
    pub fn new(title: impl Into<String>, play_week: NaiveDate, invoice_percentage: f64) -> Self {
        Self {
            title: title.into(),
            play_week,
            invoice_percentage,
            net_rental: None,
            resolved: ResolvedPercentage::Unresolved,
        }
    }

    pub fn with_resolved(mut self, resolved: ResolvedPercentage) -> Self {
        self.resolved = resolved;
        self
    }

    /// `DD-MM-YYYY`
    pub fn play_week_label(&self) -> String {
        self.play_week.format(PLAY_WEEK_FORMAT).to_string()
    }

    pub fn classification(&self) -> Classification {
        Classification::of(self.invoice_percentage, self.resolved)
    }
}

/// Parse the date strings the upload backend emits for `play_week`
pub fn parse_play_week(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    // Flask serializes pandas timestamps as HTTP dates
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.date_naive());
    }
    NaiveDate::parse_from_str(raw, PLAY_WEEK_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn ratio_is_scaled_and_trimmed() {
        assert_eq!(ResolvedPercentage::from_ratio(0.5), ResolvedPercentage::Value(50.0));
        assert_eq!(ResolvedPercentage::from_ratio(0.5).to_string(), "50%");
        assert_eq!(ResolvedPercentage::from_ratio(0.3333).to_string(), "33.33%");
        assert_eq!(ResolvedPercentage::from_ratio(0.3333), ResolvedPercentage::Value(33.33));
    }

    #[test]
    fn only_a_double_zero_suffix_is_dropped() {
        assert_eq!(format_percentage(35.0), "35");
        assert_eq!(format_percentage(35.5), "35.50");
        assert_eq!(format_percentage(12.345678), "12.35");
        assert_eq!(format_percentage(0.0), "0");
    }

    #[test]
    fn exact_halves_round_up() {
        assert_eq!(round_percentage(28.125), 28.13);
        assert_eq!(format_percentage(28.125), "28.13");
        assert_eq!(format_percentage(0.375), "0.38");
        assert_eq!(ResolvedPercentage::from_ratio(0.28125), ResolvedPercentage::Value(28.13));
        assert_eq!(ResolvedPercentage::from_ratio(0.28125).to_string(), "28.13%");
    }

    #[test]
    fn claim_at_rounded_half_is_matched() {
        let record = InvoiceRecord::new("Dune", date(2024, 1, 3), 28.13)
            .with_resolved(ResolvedPercentage::from_ratio(0.28125));
        assert_eq!(record.classification(), Classification::Matched);
    }

    #[test]
    fn unresolved_renders_as_pending() {
        assert_eq!(ResolvedPercentage::Unresolved.to_string(), "Not yet checked");
        assert_eq!(ResolvedPercentage::Unresolved.value(), None);
        assert!(!ResolvedPercentage::Unresolved.is_resolved());
    }

    #[test]
    fn play_week_label_is_zero_padded() {
        let record = InvoiceRecord::new("Dune", date(2024, 1, 3), 50.0);
        assert_eq!(record.play_week_label(), "03-01-2024");
    }

    #[test]
    fn play_week_accepts_backend_date_shapes() {
        let expected = Some(date(2024, 1, 3));
        assert_eq!(parse_play_week("2024-01-03"), expected);
        assert_eq!(parse_play_week("2024-01-03T00:00:00"), expected);
        assert_eq!(parse_play_week("2024-01-03 00:00:00"), expected);
        assert_eq!(parse_play_week("2024-01-03T00:00:00Z"), expected);
        assert_eq!(parse_play_week("Wed, 03 Jan 2024 00:00:00 GMT"), expected);
        assert_eq!(parse_play_week("03-01-2024"), expected);
        assert_eq!(parse_play_week("next week"), None);
    }
}
