use std::collections::HashMap;
use async_trait::async_trait;
use serenity::model::id::GuildId;
use tokio::sync::RwLock;

use crate::Error;
use crate::models::panel_models::*;
use crate::services::panel_store::GuildConfigStore;

/// Keeps every guild document in process. Used when no SQL Server is configured;
/// nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<(String, GuildId), GuildDocument>>
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GuildConfigStore for MemoryStore {
    async fn load(&self, namespace: &str, guild_id: GuildId) -> Result<GuildDocument, Error> {
        let documents = self.documents.read().await;

        Ok(documents.get(&(namespace.to_string(), guild_id)).cloned().unwrap_or_default())
    }

    async fn get_record(&self, namespace: &str, guild_id: GuildId, key: &str) -> Result<Option<Record>, Error> {
        let documents = self.documents.read().await;

        Ok(documents.get(&(namespace.to_string(), guild_id)).and_then(|o| o.records.get(key)).cloned())
    }

    async fn insert_record(&self, namespace: &str, guild_id: GuildId, key: &str, record: &Record) -> Result<bool, Error> {
        let mut documents = self.documents.write().await;
        let document = documents.entry((namespace.to_string(), guild_id)).or_default();

        if document.records.contains_key(key) {
            return Ok(false);
        }

        document.records.insert(key.to_string(), record.clone());
        Ok(true)
    }

    async fn delete_record(&self, namespace: &str, guild_id: GuildId, key: &str) -> Result<Option<Record>, Error> {
        let mut documents = self.documents.write().await;

        Ok(documents.get_mut(&(namespace.to_string(), guild_id)).and_then(|o| o.records.remove(key)))
    }

    async fn edit_record(&self, namespace: &str, guild_id: GuildId, key: &str, edit: &RecordEdit) -> Result<Option<EditOutcome>, Error> {
        let mut documents = self.documents.write().await;

        Ok(documents.get_mut(&(namespace.to_string(), guild_id))
            .and_then(|o| o.records.get_mut(key))
            .map(|record| edit.apply(record)))
    }

    async fn toggle_enabled(&self, namespace: &str, guild_id: GuildId) -> Result<bool, Error> {
        let mut documents = self.documents.write().await;
        let document = documents.entry((namespace.to_string(), guild_id)).or_default();

        document.enabled = !document.enabled;
        Ok(document.enabled)
    }
}
