use std::collections::HashMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_LABEL_LENGTH: usize = 40;
pub const MAX_VALUE_LENGTH: usize = 200;

/// Which flavor of records this bot manages. Instances are free-form names,
/// panels are short identifiers that carry stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Instance,
    #[default]
    Panel
}

impl Variant {
    pub fn noun(self) -> &'static str {
        match self {
            Variant::Instance => "Instance",
            Variant::Panel => "Panel"
        }
    }

    pub fn collection(self) -> &'static str {
        match self {
            Variant::Instance => "instances",
            Variant::Panel => "panels"
        }
    }

    pub fn has_stats(self) -> bool {
        self == Variant::Panel
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    pub label: String,
    pub value: String
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub display: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub created_by: u64,
    pub created_at: DateTime<Utc>,
    // Stored but never flipped by any command.
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub stats: Vec<Stat>
}

fn default_active() -> bool {
    true
}

impl Record {
    pub fn new(display: &str, title: Option<String>, created_by: u64, created_at: DateTime<Utc>) -> Self {
        Record {
            display: display.to_string(),
            title,
            created_by,
            created_at,
            active: true,
            stats: Vec::new()
        }
    }
}

/// Everything stored for one guild under one namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct GuildDocument {
    pub enabled: bool,
    pub records: HashMap<String, Record>
}

impl Default for GuildDocument {
    fn default() -> Self {
        GuildDocument {
            enabled: true,
            records: HashMap::new()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordEdit {
    SetStat { label: String, value: String },
    RemoveStat { label: String }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Inserted,
    Updated,
    Removed,
    LabelMissing
}

impl EditOutcome {
    /// Whether the record changed and has to be written back.
    pub fn is_write(self) -> bool {
        self != EditOutcome::LabelMissing
    }
}

impl RecordEdit {
    pub fn apply(&self, record: &mut Record) -> EditOutcome {
        match self {
            RecordEdit::SetStat { label, value } => {
                if let Some(existing) = record.stats.iter_mut().find(|o| &o.label == label) {
                    existing.value = value.clone();
                    EditOutcome::Updated
                } else {
                    record.stats.push(Stat { label: label.clone(), value: value.clone() });
                    EditOutcome::Inserted
                }
            }
            RecordEdit::RemoveStat { label } => {
                match record.stats.iter().position(|o| &o.label == label) {
                    Some(index) => {
                        record.stats.remove(index);
                        EditOutcome::Removed
                    }
                    None => EditOutcome::LabelMissing
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Record {
        Record::new("hero1", None, 1, Utc::now())
    }

    #[test]
    fn set_stat_keeps_original_position_on_update() {
        let mut record = record();
        RecordEdit::SetStat { label: "HP".into(), value: "10".into() }.apply(&mut record);
        RecordEdit::SetStat { label: "MP".into(), value: "5".into() }.apply(&mut record);
        let outcome = RecordEdit::SetStat { label: "HP".into(), value: "7".into() }.apply(&mut record);

        assert_eq!(outcome, EditOutcome::Updated);
        assert_eq!(record.stats[0], Stat { label: "HP".into(), value: "7".into() });
        assert_eq!(record.stats[1].label, "MP");
    }

    #[test]
    fn remove_missing_label_is_not_a_write() {
        let mut record = record();
        let outcome = RecordEdit::RemoveStat { label: "HP".into() }.apply(&mut record);

        assert_eq!(outcome, EditOutcome::LabelMissing);
        assert!(!outcome.is_write());
    }

    #[test]
    fn record_body_defaults_when_fields_are_missing() {
        let body = r#"{"display":"Bob","created_by":42,"created_at":"2024-05-01T12:00:00Z"}"#;
        let record: Record = serde_json::from_str(body).unwrap();

        assert!(record.active);
        assert!(record.title.is_none());
        assert!(record.stats.is_empty());
    }
}
