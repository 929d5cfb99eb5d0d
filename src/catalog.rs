use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    #[serde(rename = "O")]
    O,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "IGCSE")]
    Igcse,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::O, Level::A, Level::Igcse];

    pub fn as_str(self) -> &'static str {
        match self {
            Level::O => "O",
            Level::A => "A",
            Level::Igcse => "IGCSE",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Level::O => "O Level",
            Level::A => "A Level",
            Level::Igcse => "IGCSE",
        }
    }

    pub fn parse(s: &str) -> Option<Level> {
        match s.trim().to_ascii_uppercase().as_str() {
            "O" => Some(Level::O),
            "A" => Some(Level::A),
            "IGCSE" => Some(Level::Igcse),
            _ => None,
        }
    }

    pub fn default_subject(self) -> &'static str {
        match self {
            Level::O => "AccO",
            Level::A => "Acc",
            Level::Igcse => "CSO",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Subject {
    pub code: &'static str,
    pub label: &'static str,
    pub level: Level,
    pub paper_groups: &'static [&'static str],
}

const GROUPS_2: &[&str] = &["1", "2"];
const GROUPS_3: &[&str] = &["1", "2", "3"];
const GROUPS_4: &[&str] = &["1", "2", "3", "4"];
const GROUPS_6: &[&str] = &["1", "2", "3", "4", "5", "6"];

pub const SUBJECTS: &[Subject] = &[
    Subject {
        code: "AccO",
        label: "Accounting (O Level)",
        level: Level::O,
        paper_groups: GROUPS_3,
    },
    Subject {
        code: "MathsO",
        label: "Maths (O Level)",
        level: Level::O,
        paper_groups: GROUPS_3,
    },
    Subject {
        code: "Acc",
        label: "Accounting (A Level)",
        level: Level::A,
        paper_groups: GROUPS_4,
    },
    Subject {
        code: "FM",
        label: "Further Maths (A Level)",
        level: Level::A,
        paper_groups: GROUPS_4,
    },
    Subject {
        code: "CS",
        label: "Computer Science (A Level)",
        level: Level::A,
        paper_groups: GROUPS_4,
    },
    Subject {
        code: "Maths",
        label: "Mathematics (A Level)",
        level: Level::A,
        paper_groups: GROUPS_6,
    },
    Subject {
        code: "CSO",
        label: "Computer Science (IGCSE)",
        level: Level::Igcse,
        paper_groups: GROUPS_2,
    },
    Subject {
        code: "IslamiyatO",
        label: "Islamiyat (IGCSE)",
        level: Level::Igcse,
        paper_groups: GROUPS_2,
    },
];

pub fn find_subject(code: &str) -> Option<&'static Subject> {
    SUBJECTS.iter().find(|s| s.code == code)
}

pub fn subjects_for(level: Level) -> impl Iterator<Item = &'static Subject> {
    SUBJECTS.iter().filter(move |s| s.level == level)
}

pub fn offers_group(subject_code: &str, group: &str) -> bool {
    find_subject(subject_code)
        .map(|s| s.paper_groups.contains(&group))
        .unwrap_or(false)
}

pub fn group_label(group: &str) -> String {
    format!("P{g} ({g}1,{g}2,{g}3)", g = group)
}

pub fn levels_json() -> Vec<serde_json::Value> {
    Level::ALL
        .iter()
        .map(|l| json!({ "value": l.as_str(), "label": l.label() }))
        .collect()
}

pub fn subjects_json(level: Level) -> Vec<serde_json::Value> {
    subjects_for(level)
        .map(|s| json!({ "value": s.code, "label": s.label }))
        .collect()
}

pub fn paper_groups_json(subject_code: &str) -> Vec<serde_json::Value> {
    find_subject(subject_code)
        .map(|s| s.paper_groups)
        .unwrap_or(&[])
        .iter()
        .map(|g| json!({ "value": g, "label": group_label(g) }))
        .collect()
}
