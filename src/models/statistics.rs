use std::fmt;

use serde::{Deserialize, Serialize};

/// The caller's visibility scope over the answer log.
///
/// Organizers aggregate over every NGO's observers; everyone else only sees
/// rows submitted by observers of their own NGO. Two callers with the same
/// scope always share cached data, callers with different scopes never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeKey {
    pub is_organizer: bool,
    pub ngo_id: i32,
}

impl ScopeKey {
    pub fn organizer(ngo_id: i32) -> Self {
        Self {
            is_organizer: true,
            ngo_id,
        }
    }

    pub fn ngo(ngo_id: i32) -> Self {
        Self {
            is_organizer: false,
            ngo_id,
        }
    }
}

/// Which dimension a grouped aggregate is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingMode {
    /// Distinct observers that submitted answers, per county.
    County,
    /// Flagged answers, per (county, polling station).
    PollingStation,
}

impl GroupingMode {
    /// Tag used in cache keys and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupingMode::County => "county",
            GroupingMode::PollingStation => "polling-station",
        }
    }
}

impl fmt::Display for GroupingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One grouped count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateRow {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub value: i64,
}

impl AggregateRow {
    pub fn new(label: impl Into<String>, code: Option<String>, value: i64) -> Self {
        Self {
            label: label.into(),
            code,
            value,
        }
    }
}

/// A single scalar statistic, always computed live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledCounter {
    pub label: String,
    pub value: String,
}

/// The six dashboard counters.
///
/// `LiveCounter::ALL` is the order the dashboard batch returns them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LiveCounter {
    Answers,
    Stations,
    FlaggedAnswers,
    LoggedInObservers,
    Notes,
    Counties,
}

impl LiveCounter {
    pub const ALL: [LiveCounter; 6] = [
        LiveCounter::Answers,
        LiveCounter::Stations,
        LiveCounter::FlaggedAnswers,
        LiveCounter::LoggedInObservers,
        LiveCounter::Notes,
        LiveCounter::Counties,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            LiveCounter::Answers => "Number of answers submitted",
            LiveCounter::Stations => "Number of Polling Stations visited",
            LiveCounter::FlaggedAnswers => "Number of flagged answers submitted",
            LiveCounter::LoggedInObservers => "Number of logged in Observers",
            LiveCounter::Notes => "Number of notes submitted",
            LiveCounter::Counties => "Number of Counties visited",
        }
    }

    /// Path segment / metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            LiveCounter::Answers => "answers",
            LiveCounter::Stations => "stations",
            LiveCounter::FlaggedAnswers => "flagged-answers",
            LiveCounter::LoggedInObservers => "logged-in-observers",
            LiveCounter::Notes => "notes",
            LiveCounter::Counties => "counties",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grouping_mode_serde_names() {
        let mode: GroupingMode = serde_json::from_str("\"polling_station\"").unwrap();
        assert_eq!(mode, GroupingMode::PollingStation);
        assert_eq!(serde_json::to_string(&GroupingMode::County).unwrap(), "\"county\"");
    }

    #[test]
    fn test_live_counter_order_is_fixed() {
        let names: Vec<_> = LiveCounter::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(
            names,
            [
                "answers",
                "stations",
                "flagged-answers",
                "logged-in-observers",
                "notes",
                "counties"
            ]
        );
    }

    #[test]
    fn test_aggregate_row_omits_missing_code() {
        let row = AggregateRow::new("CJ", None, 50);
        let json = serde_json::to_value(&row).unwrap();
        assert!(json.get("code").is_none());

        let back: AggregateRow = serde_json::from_value(json).unwrap();
        assert_eq!(back, row);
    }
}
