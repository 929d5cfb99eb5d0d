use crate::catalog::{self, Level};
use crate::paper::PaperKey;
use crate::scores::ScoreRecord;
use chrono::{DateTime, Duration, Months, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::warn;

pub const EMPTY_MESSAGE: &str = "No data for this selection";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "all")]
    All,
    #[serde(rename = "1d")]
    Day,
    #[serde(rename = "3d")]
    ThreeDays,
    #[serde(rename = "1w")]
    Week,
    #[serde(rename = "1m")]
    Month,
    #[serde(rename = "1y")]
    Year,
}

impl TimeRange {
    pub const ALL: [TimeRange; 6] = [
        TimeRange::All,
        TimeRange::Day,
        TimeRange::ThreeDays,
        TimeRange::Week,
        TimeRange::Month,
        TimeRange::Year,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TimeRange::All => "all",
            TimeRange::Day => "1d",
            TimeRange::ThreeDays => "3d",
            TimeRange::Week => "1w",
            TimeRange::Month => "1m",
            TimeRange::Year => "1y",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeRange::All => "All Time",
            TimeRange::Day => "Past Day",
            TimeRange::ThreeDays => "Past 3 Days",
            TimeRange::Week => "Past Week",
            TimeRange::Month => "Past Month",
            TimeRange::Year => "Past Year",
        }
    }

    pub fn parse(s: &str) -> Option<TimeRange> {
        TimeRange::ALL.into_iter().find(|r| r.as_str() == s)
    }

    /// Earliest instant still inside the window; `None` means unbounded.
    pub fn cutoff(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            TimeRange::All => None,
            TimeRange::Day => Some(now - Duration::days(1)),
            TimeRange::ThreeDays => Some(now - Duration::days(3)),
            TimeRange::Week => Some(now - Duration::days(7)),
            TimeRange::Month => now.checked_sub_months(Months::new(1)),
            TimeRange::Year => now.checked_sub_months(Months::new(12)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("unknown subject '{0}'")]
    UnknownSubject(String),
    #[error("subject '{subject}' is not offered at level {level}")]
    SubjectNotInLevel { subject: String, level: &'static str },
    #[error("paper group '{group}' is not offered for {subject}")]
    GroupNotOffered { subject: String, group: String },
    #[error("year must be four digits, got '{0}'")]
    BadYear(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSelection {
    pub level: Level,
    pub subject: String,
    pub paper_group: String,
    pub session: Option<String>,
    pub year: Option<String>,
    pub time_range: TimeRange,
}

impl Default for FilterSelection {
    fn default() -> Self {
        Self {
            level: Level::O,
            subject: Level::O.default_subject().to_string(),
            paper_group: "1".to_string(),
            session: None,
            year: None,
            time_range: TimeRange::All,
        }
    }
}

impl FilterSelection {
    /// Switching level always lands on that level's default subject and group 1.
    pub fn set_level(&mut self, level: Level) {
        if self.level == level {
            return;
        }
        self.level = level;
        self.subject = level.default_subject().to_string();
        self.paper_group = "1".to_string();
    }

    pub fn set_subject(&mut self, code: &str) -> Result<(), SelectionError> {
        let subject = catalog::find_subject(code)
            .ok_or_else(|| SelectionError::UnknownSubject(code.to_string()))?;
        if subject.level != self.level {
            return Err(SelectionError::SubjectNotInLevel {
                subject: code.to_string(),
                level: self.level.as_str(),
            });
        }
        self.subject = subject.code.to_string();
        if !catalog::offers_group(&self.subject, &self.paper_group) {
            self.paper_group = "1".to_string();
        }
        Ok(())
    }

    pub fn set_paper_group(&mut self, group: &str) -> Result<(), SelectionError> {
        if !catalog::offers_group(&self.subject, group) {
            return Err(SelectionError::GroupNotOffered {
                subject: self.subject.clone(),
                group: group.to_string(),
            });
        }
        self.paper_group = group.to_string();
        Ok(())
    }

    pub fn set_session(&mut self, session: Option<&str>) {
        self.session = session
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty());
    }

    pub fn set_year(&mut self, year: Option<&str>) -> Result<(), SelectionError> {
        let year = year.map(str::trim).filter(|y| !y.is_empty());
        if let Some(y) = year {
            if y.len() != 4 || !y.chars().all(|c| c.is_ascii_digit()) {
                return Err(SelectionError::BadYear(y.to_string()));
            }
        }
        self.year = year.map(|y| y.to_string());
        Ok(())
    }

    pub fn set_time_range(&mut self, range: TimeRange) {
        self.time_range = range;
    }
}

/// A history record with its paper key and date parsed once.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsEntry {
    pub record: ScoreRecord,
    pub key: Option<PaperKey>,
    pub at: DateTime<Utc>,
}

/// Lenient decode of a history body: anything but an array is an empty history.
pub fn decode_history(body: &serde_json::Value) -> Vec<ScoreRecord> {
    let Some(items) = body.as_array() else {
        if !body.is_null() {
            warn!("score history is not an array; treating as empty");
        }
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match serde_json::from_value::<ScoreRecord>(item.clone()) {
            Ok(r) => Some(r),
            Err(e) => {
                warn!(error = %e, "skipping undecodable score record");
                None
            }
        })
        .collect()
}

/// ISO-8601 instant. Values without an offset are read as UTC, bare dates as midnight UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if let Ok(d) = DateTime::parse_from_rfc3339(s) {
        return Some(d.with_timezone(&Utc));
    }
    if let Ok(d) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(d.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
}

pub fn ingest(records: Vec<ScoreRecord>) -> Vec<StatsEntry> {
    records
        .into_iter()
        .filter_map(|record| {
            let Some(at) = parse_timestamp(&record.date) else {
                warn!(paper = %record.paper, date = %record.date, "dropping undated score");
                return None;
            };
            let key = PaperKey::split(&record.paper);
            Some(StatsEntry { record, key, at })
        })
        .collect()
}

/// Subject, paper group, sitting, year, then time window; sorted oldest first.
pub fn filter_entries<'a>(
    entries: &'a [StatsEntry],
    selection: &FilterSelection,
    now: DateTime<Utc>,
) -> Vec<&'a StatsEntry> {
    let cutoff = selection.time_range.cutoff(now);
    let mut out: Vec<&StatsEntry> = entries
        .iter()
        .filter(|e| e.record.subject == selection.subject)
        .filter(|e| {
            e.key
                .as_ref()
                .map(|k| k.in_group(&selection.paper_group))
                .unwrap_or(false)
        })
        .filter(|e| match (&selection.session, &e.key) {
            (Some(s), Some(k)) => k.in_sitting(s),
            (Some(_), None) => false,
            (None, _) => true,
        })
        .filter(|e| match (&selection.year, &e.key) {
            (Some(y), Some(k)) => &k.year == y,
            (Some(_), None) => false,
            (None, _) => true,
        })
        .filter(|e| cutoff.map(|c| e.at >= c).unwrap_or(true))
        .collect();
    out.sort_by_key(|e| e.at);
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
    pub text: String,
    pub date: String,
    pub paper: String,
}

pub fn chart_points(entries: &[&StatsEntry]) -> Vec<ChartPoint> {
    entries
        .iter()
        .map(|e| ChartPoint {
            label: e
                .key
                .as_ref()
                .map(|k| k.label())
                .unwrap_or_else(|| e.record.paper.clone()),
            value: e.record.score,
            text: format!("{}", e.record.score),
            date: e.record.date.clone(),
            paper: e.record.paper.clone(),
        })
        .collect()
}

/// One opened stats page: the fetched history plus the live selection.
#[derive(Debug, Clone, Default)]
pub struct StatsView {
    pub username: String,
    pub entries: Vec<StatsEntry>,
    pub selection: FilterSelection,
}

impl StatsView {
    pub fn new(username: &str, records: Vec<ScoreRecord>) -> Self {
        Self {
            username: username.to_string(),
            entries: ingest(records),
            selection: FilterSelection::default(),
        }
    }

    pub fn points(&self, now: DateTime<Utc>) -> Vec<ChartPoint> {
        chart_points(&filter_entries(&self.entries, &self.selection, now))
    }

    pub fn years(&self) -> Vec<String> {
        let years: BTreeSet<&str> = self
            .entries
            .iter()
            .filter_map(|e| e.key.as_ref())
            .filter(|k| k.has_full_year())
            .map(|k| k.year.as_str())
            .collect();
        years.into_iter().rev().map(|y| y.to_string()).collect()
    }

    pub fn options_json(&self) -> serde_json::Value {
        json!({
            "levels": catalog::levels_json(),
            "subjects": catalog::subjects_json(self.selection.level),
            "paperGroups": catalog::paper_groups_json(&self.selection.subject),
            "timeRanges": TimeRange::ALL
                .iter()
                .map(|r| json!({ "value": r.as_str(), "label": r.label() }))
                .collect::<Vec<_>>(),
            "years": self.years(),
        })
    }

    pub fn snapshot_json(&self, now: DateTime<Utc>) -> serde_json::Value {
        let points = self.points(now);
        let empty_message = points.is_empty().then_some(EMPTY_MESSAGE);
        json!({
            "username": self.username,
            "recordCount": self.entries.len(),
            "selection": self.selection,
            "options": self.options_json(),
            "empty": points.is_empty(),
            "emptyMessage": empty_message,
            "points": points,
        })
    }
}
