use std::sync::{Arc, OnceLock};
use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use serenity::client::Context;
use serenity::model::id::GuildId;
use serenity::prelude::TypeMapKey;
use thiserror::Error as ThisError;
use tracing::debug;

use crate::Error;
use crate::models::panel_models::*;

const MAX_INSTANCE_NAME_LENGTH: usize = 50;
/// Width of the stored key column in UTF-16 code units.
pub const MAX_KEY_UNITS: usize = 300;

/// Persistence seam for per-guild records. Every method is atomic on its own,
/// so two commands racing on the same guild never overwrite each other.
#[async_trait]
pub trait GuildConfigStore: Send + Sync {
    async fn load(&self, namespace: &str, guild_id: GuildId) -> Result<GuildDocument, Error>;
    async fn get_record(&self, namespace: &str, guild_id: GuildId, key: &str) -> Result<Option<Record>, Error>;
    /// Returns `false` without writing if the key is already taken.
    async fn insert_record(&self, namespace: &str, guild_id: GuildId, key: &str, record: &Record) -> Result<bool, Error>;
    async fn delete_record(&self, namespace: &str, guild_id: GuildId, key: &str) -> Result<Option<Record>, Error>;
    /// `None` when the record doesn't exist.
    async fn edit_record(&self, namespace: &str, guild_id: GuildId, key: &str, edit: &RecordEdit) -> Result<Option<EditOutcome>, Error>;
    /// Flips the guild's `enabled` flag and returns the new value.
    async fn toggle_enabled(&self, namespace: &str, guild_id: GuildId) -> Result<bool, Error>;
}

#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("This command can only be run in a server.")]
    GuildOnly,
    #[error("{0}")]
    InvalidName(&'static str),
    #[error("{noun} '{name}' already exists.")]
    DuplicateKey { noun: &'static str, name: String },
    #[error("Instance not found.")]
    NotFound,
    #[error("Panel not found.")]
    PanelNotFound,
    #[error("There is no stat called '{0}' on this panel.")]
    LabelNotFound(String),
    #[error("Stat labels can be at most 40 characters long.")]
    LabelTooLong,
    #[error("Stat values can be at most 200 characters long.")]
    ValueTooLong,
    #[error("This panel doesn't have any stats yet.")]
    NoStats,
    #[error("Stat labels and values can't be empty.")]
    InvalidStat,
    #[error("Instances don't carry stats.")]
    StatsUnsupported,
    #[error("We couldn't reach the panel storage, sorry... Try again later?")]
    Backend(Error)
}

fn panel_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{1,30}$").expect("panel id pattern is valid"))
}

pub struct PanelStore {
    namespace: String,
    variant: Variant,
    backend: Arc<dyn GuildConfigStore>
}

impl TypeMapKey for PanelStore {
    type Value = Arc<PanelStore>;
}

impl PanelStore {
    pub fn new(namespace: &str, variant: Variant, backend: Arc<dyn GuildConfigStore>) -> Self {
        PanelStore {
            namespace: namespace.to_string(),
            variant,
            backend
        }
    }

    pub async fn from_context(ctx: &Context) -> Option<Arc<PanelStore>> {
        let data = ctx.data.read().await;
        data.get::<PanelStore>().cloned()
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Validates a user supplied name and splits it into (key, display).
    pub fn normalize(&self, name: &str) -> Result<(String, String), StoreError> {
        let trimmed = name.trim();

        match self.variant {
            Variant::Instance => {
                let length = trimmed.chars().count();
                if length == 0 || length > MAX_INSTANCE_NAME_LENGTH {
                    return Err(StoreError::InvalidName("Instance names must be between 1 and 50 characters long."));
                }
            }
            Variant::Panel => {
                if !panel_id_pattern().is_match(trimmed) {
                    return Err(StoreError::InvalidName("Panel ids must be 1 to 30 letters, numbers, `_` or `-`."));
                }
            }
        }

        let key = trimmed.to_lowercase();
        if key.encode_utf16().count() > MAX_KEY_UNITS {
            return Err(StoreError::InvalidName("Instance names must be between 1 and 50 characters long."));
        }

        Ok((key, trimmed.to_string()))
    }

    fn lookup_key(name: &str) -> String {
        name.trim().to_lowercase()
    }

    fn not_found(&self) -> StoreError {
        match self.variant {
            Variant::Instance => StoreError::NotFound,
            Variant::Panel => StoreError::PanelNotFound
        }
    }

    pub async fn create(&self, guild_id: GuildId, author: u64, name: &str, title: Option<&str>) -> Result<Record, StoreError> {
        let (key, display) = self.normalize(name)?;
        let title = title.map(str::trim).filter(|o| !o.is_empty()).map(str::to_string);
        let record = Record::new(&display, title, author, Utc::now());

        let inserted = self.backend.insert_record(&self.namespace, guild_id, &key, &record).await
            .map_err(StoreError::Backend)?;

        if !inserted {
            return Err(StoreError::DuplicateKey { noun: self.variant.noun(), name: display });
        }

        debug!("Created {} '{}' in guild {}", self.variant.noun(), key, guild_id);
        Ok(record)
    }

    pub async fn delete(&self, guild_id: GuildId, name: &str) -> Result<Record, StoreError> {
        let key = Self::lookup_key(name);

        match self.backend.delete_record(&self.namespace, guild_id, &key).await.map_err(StoreError::Backend)? {
            Some(record) => {
                debug!("Deleted {} '{}' in guild {}", self.variant.noun(), key, guild_id);
                Ok(record)
            }
            None => Err(self.not_found())
        }
    }

    /// Instances come back oldest first, panels in key order.
    pub async fn list(&self, guild_id: GuildId) -> Result<Vec<(String, Record)>, StoreError> {
        let document = self.backend.load(&self.namespace, guild_id).await.map_err(StoreError::Backend)?;
        let mut records = document.records.into_iter().collect::<Vec<_>>();

        match self.variant {
            Variant::Instance => records.sort_by(|a, b| a.1.created_at.cmp(&b.1.created_at).then_with(|| a.0.cmp(&b.0))),
            Variant::Panel => records.sort_by(|a, b| a.0.cmp(&b.0))
        }

        Ok(records)
    }

    pub async fn set_stat(&self, guild_id: GuildId, panel_id: &str, label: &str, value: &str) -> Result<EditOutcome, StoreError> {
        if !self.variant.has_stats() {
            return Err(StoreError::StatsUnsupported);
        }

        let label = label.trim();
        let value = value.trim();

        if label.is_empty() || value.is_empty() {
            return Err(StoreError::InvalidStat);
        }
        if label.chars().count() > MAX_LABEL_LENGTH {
            return Err(StoreError::LabelTooLong);
        }
        if value.chars().count() > MAX_VALUE_LENGTH {
            return Err(StoreError::ValueTooLong);
        }

        let edit = RecordEdit::SetStat { label: label.to_string(), value: value.to_string() };
        self.backend.edit_record(&self.namespace, guild_id, &Self::lookup_key(panel_id), &edit).await
            .map_err(StoreError::Backend)?
            .ok_or(StoreError::PanelNotFound)
    }

    pub async fn remove_stat(&self, guild_id: GuildId, panel_id: &str, label: &str) -> Result<(), StoreError> {
        if !self.variant.has_stats() {
            return Err(StoreError::StatsUnsupported);
        }

        let label = label.trim();
        let edit = RecordEdit::RemoveStat { label: label.to_string() };

        match self.backend.edit_record(&self.namespace, guild_id, &Self::lookup_key(panel_id), &edit).await.map_err(StoreError::Backend)? {
            None => Err(StoreError::PanelNotFound),
            Some(EditOutcome::LabelMissing) => Err(StoreError::LabelNotFound(label.to_string())),
            Some(_) => Ok(())
        }
    }

    pub async fn show(&self, guild_id: GuildId, panel_id: &str) -> Result<Record, StoreError> {
        if !self.variant.has_stats() {
            return Err(StoreError::StatsUnsupported);
        }

        let record = self.backend.get_record(&self.namespace, guild_id, &Self::lookup_key(panel_id)).await
            .map_err(StoreError::Backend)?
            .ok_or(StoreError::PanelNotFound)?;

        if record.stats.is_empty() {
            return Err(StoreError::NoStats);
        }

        Ok(record)
    }

    /// Nothing else reads the flag yet; it only round-trips through storage.
    pub async fn toggle(&self, guild_id: GuildId) -> Result<bool, StoreError> {
        self.backend.toggle_enabled(&self.namespace, guild_id).await.map_err(StoreError::Backend)
    }

    pub async fn autocomplete(&self, guild_id: GuildId, current: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        let needle = current.trim().to_lowercase();

        Ok(self.list(guild_id).await?
            .into_iter()
            .filter(|(key, record)| key.contains(&needle) || record.display.to_lowercase().contains(&needle))
            .take(limit)
            .map(|(_, record)| record.display)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory_store::MemoryStore;

    fn store(variant: Variant) -> PanelStore {
        PanelStore::new("rppanel", variant, Arc::new(MemoryStore::new()))
    }

    fn guild() -> GuildId {
        GuildId::new(1)
    }

    #[tokio::test]
    async fn create_then_list_preserves_case() {
        let store = store(Variant::Instance);
        store.create(guild(), 7, "Alice Smith", None).await.unwrap();

        let records = store.list(guild()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, "alice smith");
        assert_eq!(records[0].1.display, "Alice Smith");
        assert_eq!(records[0].1.created_by, 7);
        assert!(records[0].1.active);
    }

    #[tokio::test]
    async fn duplicate_detection_ignores_case_and_whitespace() {
        let store = store(Variant::Instance);
        store.create(guild(), 1, "bob", None).await.unwrap();

        let err = store.create(guild(), 1, "Bob ", None).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
        assert_eq!(err.to_string(), "Instance 'Bob' already exists.");
    }

    #[tokio::test]
    async fn names_are_validated_per_variant() {
        let instances = store(Variant::Instance);
        assert!(matches!(instances.create(guild(), 1, "   ", None).await, Err(StoreError::InvalidName(_))));
        assert!(matches!(instances.create(guild(), 1, &"x".repeat(51), None).await, Err(StoreError::InvalidName(_))));
        assert!(instances.create(guild(), 1, "has spaces & symbols!", None).await.is_ok());

        let panels = store(Variant::Panel);
        assert!(matches!(panels.create(guild(), 1, "has spaces", None).await, Err(StoreError::InvalidName(_))));
        assert!(matches!(panels.create(guild(), 1, &"x".repeat(31), None).await, Err(StoreError::InvalidName(_))));
        assert!(panels.create(guild(), 1, "Hero_1-a", None).await.is_ok());
    }

    #[test]
    fn widest_keys_fit_the_key_column() {
        let store = store(Variant::Instance);

        for name in ["\u{130}".repeat(50), "\u{1F600}".repeat(50), "\u{1E9E}".repeat(50)] {
            let (key, display) = store.normalize(&name).unwrap();
            assert_eq!(display, name);
            assert!(key.encode_utf16().count() <= MAX_KEY_UNITS);
        }
    }

    #[tokio::test]
    async fn instances_list_in_creation_order() {
        let store = store(Variant::Instance);
        store.create(guild(), 1, "zed", None).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        store.create(guild(), 1, "alpha", None).await.unwrap();

        let keys = store.list(guild()).await.unwrap().into_iter().map(|o| o.0).collect::<Vec<_>>();
        assert_eq!(keys, vec!["zed", "alpha"]);
    }

    #[tokio::test]
    async fn delete_missing_leaves_store_unchanged() {
        let store = store(Variant::Instance);
        store.create(guild(), 1, "alice", None).await.unwrap();

        let err = store.delete(guild(), "bob").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
        assert_eq!(store.list(guild()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn instance_scenario() {
        let store = store(Variant::Instance);
        store.create(guild(), 1, "alice", None).await.unwrap();

        let err = store.create(guild(), 1, "Alice", None).await.unwrap_err();
        assert!(err.to_string().contains("already exists"));

        let removed = store.delete(guild(), "alice").await.unwrap();
        assert_eq!(removed.display, "alice");

        let err = store.delete(guild(), "alice").await.unwrap_err();
        assert_eq!(err.to_string(), "Instance not found.");
    }

    #[tokio::test]
    async fn panel_scenario() {
        let store = store(Variant::Panel);

        let err = store.set_stat(guild(), "hero1", "HP", "100/100").await.unwrap_err();
        assert_eq!(err.to_string(), "Panel not found.");

        store.create(guild(), 1, "hero1", Some("The Hero")).await.unwrap();
        assert_eq!(store.set_stat(guild(), "hero1", "HP", "100/100").await.unwrap(), EditOutcome::Inserted);

        let record = store.show(guild(), "HERO1").await.unwrap();
        assert_eq!(record.title.as_deref(), Some("The Hero"));
        assert_eq!(record.stats.iter().find(|o| o.label == "HP").map(|o| o.value.as_str()), Some("100/100"));
    }

    #[tokio::test]
    async fn removing_last_stat_leaves_no_stats() {
        let store = store(Variant::Panel);
        store.create(guild(), 1, "hero1", None).await.unwrap();
        store.set_stat(guild(), "hero1", "HP", "10").await.unwrap();

        store.remove_stat(guild(), "hero1", "HP").await.unwrap();
        assert!(matches!(store.show(guild(), "hero1").await, Err(StoreError::NoStats)));
        assert!(matches!(store.remove_stat(guild(), "hero1", "HP").await, Err(StoreError::LabelNotFound(_))));
        assert!(matches!(store.remove_stat(guild(), "nobody", "HP").await, Err(StoreError::PanelNotFound)));
    }

    #[tokio::test]
    async fn stat_lengths_are_bounded() {
        let store = store(Variant::Panel);
        store.create(guild(), 1, "hero1", None).await.unwrap();

        assert!(store.set_stat(guild(), "hero1", &"l".repeat(40), &"v".repeat(200)).await.is_ok());
        assert!(matches!(store.set_stat(guild(), "hero1", &"l".repeat(41), "v").await, Err(StoreError::LabelTooLong)));
        assert!(matches!(store.set_stat(guild(), "hero1", "HP", &"v".repeat(201)).await, Err(StoreError::ValueTooLong)));
        assert!(matches!(store.set_stat(guild(), "hero1", " ", "v").await, Err(StoreError::InvalidStat)));
    }

    #[tokio::test]
    async fn instances_reject_stat_operations() {
        let store = store(Variant::Instance);
        store.create(guild(), 1, "alice", None).await.unwrap();

        assert!(matches!(store.set_stat(guild(), "alice", "HP", "1").await, Err(StoreError::StatsUnsupported)));
        assert!(matches!(store.show(guild(), "alice").await, Err(StoreError::StatsUnsupported)));
    }

    #[tokio::test]
    async fn panels_list_in_key_order() {
        let store = store(Variant::Panel);
        for id in ["zeta", "Alpha", "mid"] {
            store.create(guild(), 1, id, None).await.unwrap();
        }

        let keys = store.list(guild()).await.unwrap().into_iter().map(|o| o.0).collect::<Vec<_>>();
        assert_eq!(keys, vec!["alpha", "mid", "zeta"]);
    }

    #[tokio::test]
    async fn guilds_are_isolated() {
        let store = store(Variant::Panel);
        store.create(guild(), 1, "hero1", None).await.unwrap();

        assert!(store.list(GuildId::new(2)).await.unwrap().is_empty());
        assert!(store.create(GuildId::new(2), 1, "hero1", None).await.is_ok());
    }

    #[tokio::test]
    async fn toggle_flips_enabled() {
        let store = store(Variant::Panel);

        assert!(!store.toggle(guild()).await.unwrap());
        assert!(store.toggle(guild()).await.unwrap());
    }

    #[tokio::test]
    async fn autocomplete_matches_substrings() {
        let store = store(Variant::Panel);
        for id in ["Hero1", "hero2", "villain"] {
            store.create(guild(), 1, id, None).await.unwrap();
        }

        assert_eq!(store.autocomplete(guild(), "ERO", 20).await.unwrap(), vec!["Hero1", "hero2"]);
        assert_eq!(store.autocomplete(guild(), "", 2).await.unwrap().len(), 2);
        assert!(store.autocomplete(guild(), "nope", 20).await.unwrap().is_empty());
    }
}
