use crate::paper::{derive_label, PaperKey};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeSet;
use std::path::Path;

/// One card of a subject's yearly past-paper fixture.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaperEntry {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub qp: Option<String>,
    #[serde(default)]
    pub ms: Option<String>,
    #[serde(default)]
    pub sf: Option<String>,
}

impl PaperEntry {
    pub fn to_json(&self) -> serde_json::Value {
        let name = if self.name.is_empty() {
            "Untitled"
        } else {
            self.name.as_str()
        };
        json!({
            "id": self.id,
            "name": name,
            "label": derive_label(&self.id),
            "qp": self.qp.as_deref().map(download_link),
            "ms": self.ms.as_deref().map(download_link),
            "sf": self.sf.as_deref().map(download_link),
        })
    }
}

pub fn load_catalog(path: &Path) -> anyhow::Result<Vec<PaperEntry>> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Distinct years present in the fixture, newest first.
pub fn years(entries: &[PaperEntry]) -> Vec<String> {
    let set: BTreeSet<String> = entries
        .iter()
        .filter_map(|e| PaperKey::split(&e.id))
        .filter(|k| k.has_full_year())
        .map(|k| k.year)
        .collect();
    set.into_iter().rev().collect()
}

pub fn filter_papers<'a>(
    entries: &'a [PaperEntry],
    session: &str,
    year: &str,
    paper_group: &str,
) -> Vec<&'a PaperEntry> {
    entries
        .iter()
        .filter(|e| {
            let Some(k) = PaperKey::split(&e.id) else {
                return false;
            };
            k.in_sitting(session) && k.year == year && k.in_group(paper_group)
        })
        .collect()
}

/// Turns a Drive share link (`.../d/<id>/view`) into a direct download link.
/// The first `/d/<id>/` anywhere in the URL wins.
pub fn download_link(url: &str) -> String {
    for (i, _) in url.match_indices("/d/") {
        let rest = &url[i + 3..];
        let id_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
            .unwrap_or(rest.len());
        if id_len > 0 && rest[id_len..].starts_with('/') {
            return format!(
                "https://drive.google.com/uc?export=download&id={}",
                &rest[..id_len]
            );
        }
    }
    url.to_string()
}
