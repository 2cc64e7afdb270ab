//! Normalized snapshot of current and historical feed state.

use crate::envelope::{HistoricalPeriod, PeriodResult, ResultsEnvelope};
use crate::error::{ProtocolError, ProtocolResult};
use crate::period::{DateQuery, PeriodKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The normalized, deduplicated view handed to subscribers.
///
/// Replaces the previous snapshot wholesale on every delivery; there is no
/// merging or conflict resolution beyond last-write-wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// The period the current results belong to.
    pub as_of: PeriodKey,
    /// Current-period results keyed by slot name.
    pub current: BTreeMap<String, Option<PeriodResult>>,
    /// Historical periods, server order preserved (newest first), with any
    /// entry for `as_of` removed.
    pub history: Vec<HistoricalPeriod>,
}

impl Snapshot {
    /// Returns the history entries matching a date query, in history order.
    pub fn search(&self, query: &DateQuery) -> Vec<&HistoricalPeriod> {
        self.history
            .iter()
            .filter(|entry| query.matches(&entry.period_key()))
            .collect()
    }
}

/// Normalizes a raw envelope into a [`Snapshot`].
///
/// Pure transform: rejects `success: false` envelopes and envelopes with no
/// results body, then filters the current period out of the history list.
/// The server may redundantly include "today" in `previousResults`.
pub fn normalize(envelope: ResultsEnvelope) -> ProtocolResult<Snapshot> {
    if !envelope.success {
        return Err(ProtocolError::rejected(envelope.message));
    }

    let body = envelope.results.ok_or(ProtocolError::MissingResults)?;
    let as_of = PeriodKey::new(&body.date);

    let history = body
        .previous_results
        .into_iter()
        .filter(|entry| entry.period_key() != as_of)
        .collect();

    Ok(Snapshot {
        as_of,
        current: body.today_results,
        history,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::ResultsBody;

    fn entry(date: &str) -> HistoricalPeriod {
        HistoricalPeriod {
            date: date.to_string(),
            fields: serde_json::Map::new(),
        }
    }

    fn envelope(date: &str, previous: Vec<HistoricalPeriod>) -> ResultsEnvelope {
        ResultsEnvelope {
            success: true,
            message: None,
            results: Some(ResultsBody {
                date: date.to_string(),
                today_results: BTreeMap::new(),
                previous_results: previous,
            }),
        }
    }

    #[test]
    fn normalize_filters_current_period_from_history() {
        let snapshot = normalize(envelope(
            "10/10/2025",
            vec![entry("10/10/2025"), entry("09/10/2025")],
        ))
        .unwrap();

        assert_eq!(snapshot.as_of, PeriodKey::new("10/10/2025"));
        assert_eq!(snapshot.history.len(), 1);
        assert_eq!(snapshot.history[0].date, "09/10/2025");
    }

    #[test]
    fn normalize_filters_despite_separator_mismatch() {
        let snapshot = normalize(envelope(
            "10/10/2025",
            vec![entry("10-10-2025"), entry("9-10-2025")],
        ))
        .unwrap();

        assert_eq!(snapshot.history.len(), 1);
        assert_eq!(snapshot.history[0].date, "9-10-2025");
    }

    #[test]
    fn normalize_preserves_history_order() {
        let snapshot = normalize(envelope(
            "10/10/2025",
            vec![entry("09/10/2025"), entry("08/10/2025"), entry("07/10/2025")],
        ))
        .unwrap();

        let dates: Vec<&str> = snapshot.history.iter().map(|e| e.date.as_str()).collect();
        assert_eq!(dates, ["09/10/2025", "08/10/2025", "07/10/2025"]);
    }

    #[test]
    fn normalize_rejects_failure_envelope() {
        let env = ResultsEnvelope {
            success: false,
            message: Some("backend unavailable".into()),
            results: None,
        };
        let err = normalize(env).unwrap_err();
        assert!(matches!(err, ProtocolError::ServerRejected { .. }));
    }

    #[test]
    fn normalize_rejects_missing_results_body() {
        let env = ResultsEnvelope {
            success: true,
            message: None,
            results: None,
        };
        assert_eq!(normalize(env).unwrap_err(), ProtocolError::MissingResults);
    }

    #[test]
    fn search_matches_day_component() {
        let snapshot = normalize(envelope(
            "12/10/2025",
            vec![entry("10/09/2025"), entry("11/09/2025"), entry("10/08/2024")],
        ))
        .unwrap();

        let query = DateQuery::parse("10").unwrap();
        let hits = snapshot.search(&query);
        let dates: Vec<&str> = hits.iter().map(|e| e.date.as_str()).collect();
        assert_eq!(dates, ["10/09/2025", "10/08/2024"]);
    }

    #[test]
    fn search_full_date_tolerates_separators() {
        let snapshot = normalize(envelope(
            "12/10/2025",
            vec![entry("10-09-2025"), entry("11/09/2025")],
        ))
        .unwrap();

        let query = DateQuery::parse("10/9/2025").unwrap();
        let hits = snapshot.search(&query);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].date, "10-09-2025");
    }
}
