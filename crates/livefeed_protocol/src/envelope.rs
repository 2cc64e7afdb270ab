//! The backend's JSON response envelope.
//!
//! The same envelope is carried by both transports: the poll endpoint returns
//! one per request, the stream endpoint one per frame. Field names follow the
//! backend's camelCase wire shape.

use crate::period::PeriodKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The per-slot result payload.
///
/// LiveFeed treats result bodies as opaque backend JSON; only the envelope
/// structure around them is interpreted.
pub type PeriodResult = serde_json::Value;

/// Top-level response envelope for the results feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsEnvelope {
    /// Application-level success flag.
    pub success: bool,
    /// Optional server message, usually present when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// The results body; absent on some failure responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<ResultsBody>,
}

/// The results body inside a successful envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsBody {
    /// The period this payload describes, as a raw server date string.
    pub date: String,
    /// Current-period results keyed by slot name; `null` means not yet drawn.
    #[serde(rename = "todayResults", default)]
    pub today_results: BTreeMap<String, Option<PeriodResult>>,
    /// Historical periods, newest first. May redundantly include the current
    /// period; normalization filters it out.
    #[serde(rename = "previousResults", default)]
    pub previous_results: Vec<HistoricalPeriod>,
}

/// One historical period entry.
///
/// Only `date` is interpreted; all other fields are carried through opaquely
/// for the consuming UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalPeriod {
    /// Raw server date string identifying the period.
    pub date: String,
    /// Remaining backend fields, preserved verbatim.
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl HistoricalPeriod {
    /// Returns the canonical period key for this entry.
    pub fn period_key(&self) -> PeriodKey {
        PeriodKey::new(&self.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_full_envelope() {
        let json = r#"{
            "success": true,
            "results": {
                "date": "10/10/2025",
                "todayResults": {
                    "morning": {"number": "42"},
                    "evening": null
                },
                "previousResults": [
                    {"date": "09/10/2025", "morning": {"number": "17"}}
                ]
            }
        }"#;

        let envelope: ResultsEnvelope = serde_json::from_str(json).unwrap();
        assert!(envelope.success);
        let body = envelope.results.unwrap();
        assert_eq!(body.date, "10/10/2025");
        assert_eq!(body.today_results.len(), 2);
        assert!(body.today_results["evening"].is_none());
        assert_eq!(body.previous_results.len(), 1);
        assert_eq!(body.previous_results[0].fields["morning"]["number"], "17");
    }

    #[test]
    fn deserializes_failure_envelope_without_results() {
        let json = r#"{"success": false, "message": "backend unavailable"}"#;
        let envelope: ResultsEnvelope = serde_json::from_str(json).unwrap();
        assert!(!envelope.success);
        assert_eq!(envelope.message.as_deref(), Some("backend unavailable"));
        assert!(envelope.results.is_none());
    }

    #[test]
    fn missing_result_lists_default_to_empty() {
        let json = r#"{"success": true, "results": {"date": "10/10/2025"}}"#;
        let envelope: ResultsEnvelope = serde_json::from_str(json).unwrap();
        let body = envelope.results.unwrap();
        assert!(body.today_results.is_empty());
        assert!(body.previous_results.is_empty());
    }

    #[test]
    fn historical_period_key_tolerates_separators() {
        let entry: HistoricalPeriod =
            serde_json::from_str(r#"{"date": "9-10-2025"}"#).unwrap();
        assert_eq!(entry.period_key(), PeriodKey::new("09/10/2025"));
    }
}
