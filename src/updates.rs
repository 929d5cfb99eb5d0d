use crate::stats::parse_timestamp;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawCategory {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct RawUpdate {
    #[serde(default)]
    id: i64,
    #[serde(default)]
    heading: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    category: Option<RawCategory>,
}

#[derive(Debug, Deserialize)]
struct UpdatesFile {
    updates: Vec<RawUpdate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Update {
    pub id: i64,
    pub heading: String,
    pub text: String,
    pub date: String,
    pub categories: Vec<String>,
}

impl Update {
    pub fn primary_category(&self) -> Option<&str> {
        self.categories.first().map(|s| s.as_str())
    }

    fn is_listable(&self) -> bool {
        !self.date.is_empty() && !self.heading.is_empty() && !self.categories.is_empty()
    }
}

fn normalize(raw: RawUpdate) -> Update {
    let categories = match raw.category {
        None => Vec::new(),
        Some(RawCategory::One(c)) => vec![c],
        Some(RawCategory::Many(cs)) => cs,
    }
    .into_iter()
    .map(|c| c.trim().to_string())
    .filter(|c| !c.is_empty())
    .collect();
    Update {
        id: raw.id,
        heading: raw.heading,
        text: raw.text,
        date: raw.date,
        categories,
    }
}

/// Newest first; undated entries sink to the end in file order.
fn newest_first(a: &Update, b: &Update) -> Ordering {
    match (parse_timestamp(&a.date), parse_timestamp(&b.date)) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// A file without an `updates` array yields no updates rather than an error.
pub fn parse_updates(text: &str) -> Vec<Update> {
    match serde_json::from_str::<UpdatesFile>(text) {
        Ok(file) => {
            let mut out: Vec<Update> = file.updates.into_iter().map(normalize).collect();
            out.sort_by(newest_first);
            out
        }
        Err(e) => {
            warn!(error = %e, "invalid updates data structure");
            Vec::new()
        }
    }
}

pub fn load_updates(path: &Path) -> anyhow::Result<Vec<Update>> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_updates(&text))
}

pub fn latest(updates: &[Update], limit: usize) -> Vec<Update> {
    updates
        .iter()
        .filter(|u| u.is_listable())
        .take(limit)
        .cloned()
        .collect()
}
