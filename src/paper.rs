use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaperKeyError {
    #[error("paper key '{0}' must have exactly three '_' separated parts")]
    SegmentCount(String),
    #[error("paper key '{key}' has an invalid session '{session}'")]
    BadSession { key: String, session: String },
    #[error("paper key '{key}' has an invalid year '{year}'")]
    BadYear { key: String, year: String },
    #[error("paper key '{key}' has an invalid variant '{variant}'")]
    BadVariant { key: String, variant: String },
}

/// A past-paper sitting, parsed from `"session_year_variant"` (e.g. `november_2024_12`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperKey {
    pub session: String,
    pub year: String,
    pub variant: String,
}

impl PaperKey {
    /// Any three `_` separated segments, unchecked. Used for labels and filtering.
    pub fn split(raw: &str) -> Option<Self> {
        let mut parts = raw.split('_');
        let (Some(session), Some(year), Some(variant), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return None;
        };
        Some(Self {
            session: session.to_ascii_lowercase(),
            year: year.to_string(),
            variant: variant.to_string(),
        })
    }

    /// Strict form accepted for submissions: alphabetic session, four-digit year,
    /// one or two digit variant.
    pub fn parse(raw: &str) -> Result<Self, PaperKeyError> {
        let Some(key) = Self::split(raw) else {
            return Err(PaperKeyError::SegmentCount(raw.to_string()));
        };
        let (session, year, variant) = (&key.session, &key.year, &key.variant);

        if session.is_empty() || !session.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(PaperKeyError::BadSession {
                key: raw.to_string(),
                session: session.to_string(),
            });
        }
        if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
            return Err(PaperKeyError::BadYear {
                key: raw.to_string(),
                year: year.to_string(),
            });
        }
        if variant.is_empty() || variant.len() > 2 || !variant.chars().all(|c| c.is_ascii_digit())
        {
            return Err(PaperKeyError::BadVariant {
                key: raw.to_string(),
                variant: variant.to_string(),
            });
        }

        Ok(key)
    }

    pub fn has_full_year(&self) -> bool {
        self.year.len() == 4 && self.year.chars().all(|c| c.is_ascii_digit())
    }

    pub fn session_letter(&self) -> char {
        session_letter(&self.session)
    }

    /// Compact chart label: session letter, two-digit year, variant (`W2412`).
    pub fn label(&self) -> String {
        let short_year = self.year.get(2..).unwrap_or("");
        format!("{}{}{}", self.session_letter(), short_year, self.variant)
    }

    /// Paper group "1" covers variants 1, 11, 12, 13.
    pub fn in_group(&self, group: &str) -> bool {
        self.variant.starts_with(group)
    }

    pub fn in_sitting(&self, session: &str) -> bool {
        sitting_family(&self.session) == sitting_family(&session.to_ascii_lowercase())
    }
}

impl fmt::Display for PaperKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.session, self.year, self.variant)
    }
}

pub fn session_letter(session: &str) -> char {
    match session.to_ascii_lowercase().as_str() {
        "june" | "may" => 'S',
        "november" | "october" => 'W',
        "march" => 'M',
        _ => '?',
    }
}

// Month names that boards use interchangeably for one sitting.
fn sitting_family(session: &str) -> &str {
    match session {
        "may" | "june" => "summer",
        "october" | "november" => "winter",
        "february" | "march" => "march",
        other => other,
    }
}

/// Chart label for a raw paper id; ids without exactly three segments come back unchanged.
pub fn derive_label(raw: &str) -> String {
    PaperKey::split(raw)
        .map(|k| k.label())
        .unwrap_or_else(|| raw.to_string())
}
