use std::time::Duration;
use poise::CreateReply;
use serenity::builder::{CreateEmbed, CreateEmbedFooter};
use serenity::utils::MessageBuilder;

use crate::models::panel_models::{Record, Variant};
use super::ping::PingMode;

pub const MAX_EMBED_TITLE: usize = 256;
pub const MAX_FIELD_NAME: usize = 256;
pub const MAX_FIELD_VALUE: usize = 1024;
pub const MAX_EMBED_FIELDS: usize = 25;
pub const MAX_EMBED_TOTAL: usize = 6000;
pub const MAX_MESSAGE_LENGTH: usize = 2000;
const MAX_LIST_TITLE: usize = 100;
// Room kept for the "N more not shown." line or footer.
const OVERFLOW_RESERVE: usize = 32;

pub fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

fn escape(text: &str) -> String {
    MessageBuilder::new().push_safe(text).build()
}

pub fn list_text(variant: Variant, entries: &[(String, Record)], limit: usize) -> String {
    if entries.is_empty() {
        return format!("There are no {} in this server yet.", variant.collection());
    }

    let mut text = format!("**{} ({})**", capitalize(variant.collection()), entries.len());
    let mut length = text.chars().count();
    let mut shown = 0;

    for (_, record) in entries.iter().take(limit) {
        let line = match (variant, &record.title) {
            (Variant::Instance, _) => format!("- {} (created <t:{}:d>)", escape(&record.display), record.created_at.timestamp()),
            (Variant::Panel, Some(title)) => format!("- `{}`: {}", record.display, escape(&truncate(title, MAX_LIST_TITLE))),
            (Variant::Panel, None) => format!("- `{}`", record.display)
        };

        let line_length = line.chars().count() + 1;
        if length + line_length + OVERFLOW_RESERVE > MAX_MESSAGE_LENGTH {
            break;
        }

        text.push('\n');
        text.push_str(&line);
        length += line_length;
        shown += 1;
    }

    if entries.len() > shown {
        text.push_str(&format!("\n{} more not shown.", entries.len() - shown));
    }

    text
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new()
    }
}

/// Everything needed to draw a panel, already cut down to what an embed accepts.
#[derive(Debug, PartialEq)]
pub struct ShowCard {
    pub title: String,
    pub description: Option<String>,
    pub fields: Vec<(String, String)>,
    pub footer: Option<String>
}

impl ShowCard {
    pub fn from_record(record: &Record) -> Self {
        let (title, description) = match &record.title {
            Some(title) => (truncate(title, MAX_EMBED_TITLE), Some(format!("`{}`", record.display))),
            None => (truncate(&record.display, MAX_EMBED_TITLE), None)
        };

        let mut used = title.chars().count()
            + description.as_deref().map(|o| o.chars().count()).unwrap_or(0)
            + OVERFLOW_RESERVE;
        let mut fields = Vec::new();

        for stat in record.stats.iter().take(MAX_EMBED_FIELDS) {
            let name = truncate(&stat.label, MAX_FIELD_NAME);
            let value = truncate(&stat.value, MAX_FIELD_VALUE);
            let size = name.chars().count() + value.chars().count();

            if used + size > MAX_EMBED_TOTAL {
                break;
            }

            used += size;
            fields.push((name, value));
        }

        let hidden = record.stats.len() - fields.len();
        let footer = if hidden > 0 {
            Some(format!("{} more not shown.", hidden))
        } else {
            None
        };

        ShowCard { title, description, fields, footer }
    }

    /// Characters Discord counts towards the embed size limit.
    pub fn total_chars(&self) -> usize {
        self.title.chars().count()
            + self.description.as_deref().map(|o| o.chars().count()).unwrap_or(0)
            + self.fields.iter().map(|(name, value)| name.chars().count() + value.chars().count()).sum::<usize>()
            + self.footer.as_deref().map(|o| o.chars().count()).unwrap_or(0)
    }

    pub fn into_reply(self, record: &Record) -> CreateReply {
        let mut embed = CreateEmbed::new()
            .title(self.title)
            .fields(self.fields.into_iter().map(|(name, value)| (name, value, true)))
            .timestamp(record.created_at);

        if let Some(description) = self.description {
            embed = embed.description(description);
        }
        if let Some(footer) = self.footer {
            embed = embed.footer(CreateEmbedFooter::new(footer));
        }

        CreateReply::default().embed(embed)
    }
}

pub fn ping_text(mode: PingMode, round_trip: Duration, gateway: Duration) -> String {
    let mut text = format!("Pong! {} ms.", round_trip.as_millis());

    if mode == PingMode::Debug {
        text.push_str(&format!("\nGateway latency: {} ms\nRaw round trip: {:?}", gateway.as_millis(), round_trip));
    }

    text
}

#[cfg(test)]
mod tests {
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use crate::models::panel_models::Stat;
    use super::*;

    fn instances(count: usize) -> Vec<(String, Record)> {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        (0..count)
            .map(|i| {
                let name = format!("inst{i:02}");
                let record = Record::new(&name, None, 1, start + ChronoDuration::minutes(i as i64));
                (name, record)
            })
            .collect()
    }

    #[test]
    fn empty_list_has_no_pagination() {
        let text = list_text(Variant::Instance, &[], 20);

        assert_eq!(text, "There are no instances in this server yet.");
        assert!(!text.contains("more not shown"));
    }

    #[test]
    fn prefix_list_cuts_after_twenty() {
        let text = list_text(Variant::Instance, &instances(25), 20);
        let lines = text.lines().collect::<Vec<_>>();

        assert_eq!(lines[0], "**Instances (25)**");
        assert!(lines[1].starts_with("- inst00 "));
        assert!(lines[20].starts_with("- inst19 "));
        assert_eq!(lines[21], "5 more not shown.");
        assert_eq!(lines.len(), 22);
    }

    #[test]
    fn slash_list_fits_twenty_five() {
        let text = list_text(Variant::Instance, &instances(25), 25);

        assert!(!text.contains("more not shown"));
        assert!(text.contains("inst24"));
    }

    #[test]
    fn panel_list_shows_titles() {
        let mut record = Record::new("hero1", Some("The Hero".into()), 1, Utc::now());
        record.stats.push(Stat { label: "HP".into(), value: "1".into() });

        assert_eq!(list_text(Variant::Panel, &[("hero1".into(), record)], 25), "**Panels (1)**\n- `hero1`: The Hero");
    }

    #[test]
    fn card_renders_stats_as_fields() {
        let mut record = Record::new("hero1", None, 1, Utc::now());
        record.stats.push(Stat { label: "HP".into(), value: "100/100".into() });

        let card = ShowCard::from_record(&record);
        assert_eq!(card.title, "hero1");
        assert_eq!(card.fields, vec![("HP".to_string(), "100/100".to_string())]);
        assert!(card.footer.is_none());
    }

    #[test]
    fn card_respects_embed_limits() {
        let mut record = Record::new("hero1", Some("t".repeat(300)), 1, Utc::now());
        for i in 0..30 {
            record.stats.push(Stat { label: format!("{i}{}", "l".repeat(300)), value: "v".repeat(2000) });
        }

        let card = ShowCard::from_record(&record);
        assert_eq!(card.title.chars().count(), 256);
        assert_eq!(card.description.as_deref(), Some("`hero1`"));
        assert_eq!(card.fields.len(), 4);
        assert!(card.fields.iter().all(|(name, value)| name.chars().count() == 256 && value.chars().count() == 1024));
        assert_eq!(card.footer.as_deref(), Some("26 more not shown."));
        assert!(card.total_chars() <= MAX_EMBED_TOTAL);
    }

    #[test]
    fn long_panel_list_stays_under_message_limit() {
        let entries = (0..25)
            .map(|i| {
                let id = format!("p{i:02}{}", "x".repeat(27));
                let record = Record::new(&id, Some("t".repeat(100)), 1, Utc::now());
                (id.to_lowercase(), record)
            })
            .collect::<Vec<_>>();

        for limit in [20, 25] {
            let text = list_text(Variant::Panel, &entries, limit);
            let lines = text.lines().collect::<Vec<_>>();

            assert!(text.chars().count() <= MAX_MESSAGE_LENGTH);
            assert_eq!(lines.len(), 16);
            assert_eq!(lines[15], "11 more not shown.");
        }
    }

    #[test]
    fn full_card_stays_under_embed_total() {
        let mut record = Record::new("hero1", Some("The Hero".into()), 1, Utc::now());
        for i in 0..25 {
            record.stats.push(Stat { label: format!("{i:02}{}", "l".repeat(38)), value: "v".repeat(200) });
        }

        let card = ShowCard::from_record(&record);
        assert_eq!(card.fields.len(), 24);
        assert_eq!(card.footer.as_deref(), Some("1 more not shown."));
        assert!(card.total_chars() <= MAX_EMBED_TOTAL);
    }

    #[test]
    fn user_text_is_escaped_in_lists() {
        let instance = Record::new("a*b_c", None, 1, Utc::now());
        let text = list_text(Variant::Instance, &[("a*b_c".into(), instance)], 20);
        assert!(!text.contains("a*b_c"));
        assert!(text.contains("a\\*b\\_c"));

        let panel = Record::new("hero1", Some("**bold** `tick`".into()), 1, Utc::now());
        let text = list_text(Variant::Panel, &[("hero1".into(), panel)], 25);
        assert!(text.starts_with("**Panels (1)**\n- `hero1`: "));
        assert!(text.contains("\\*\\*bold\\*\\* \\`tick\\`"));
    }

    #[tokio::test]
    async fn stored_instances_list_in_creation_order() {
        use std::sync::Arc;
        use serenity::model::id::GuildId;
        use crate::services::memory_store::MemoryStore;
        use crate::services::panel_store::PanelStore;

        let store = PanelStore::new("rppanel", Variant::Instance, Arc::new(MemoryStore::new()));
        let guild = GuildId::new(1);
        for i in 0..25 {
            store.create(guild, 1, &format!("inst{:02}", 24 - i), None).await.unwrap();
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        let entries = store.list(guild).await.unwrap();
        let text = list_text(Variant::Instance, &entries, 20);
        let lines = text.lines().collect::<Vec<_>>();

        assert!(lines[1].starts_with("- inst24 "));
        assert!(lines[20].starts_with("- inst05 "));
        assert_eq!(lines[21], "5 more not shown.");
    }

    #[test]
    fn debug_ping_includes_raw_latency() {
        let round_trip = Duration::from_millis(120);
        let gateway = Duration::from_millis(45);

        assert_eq!(ping_text(PingMode::Normal, round_trip, gateway), "Pong! 120 ms.");
        assert_eq!(ping_text(PingMode::Ephemeral, round_trip, gateway), "Pong! 120 ms.");

        let debug = ping_text(PingMode::Debug, round_trip, gateway);
        assert!(debug.starts_with("Pong! 120 ms.\n"));
        assert!(debug.contains("Gateway latency: 45 ms"));
        assert!(debug.contains("Raw round trip: 120ms"));
    }
}
