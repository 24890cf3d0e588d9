mod ping;
mod records;
mod render;
mod stats;

use poise::CreateReply;
use serenity::model::id::GuildId;
use tracing::error;

use ping::*;
use records::*;
use stats::*;
use crate::{PanelContext, Error};
use crate::models::panel_models::Variant;
use crate::services::panel_store::{PanelStore, StoreError};

pub const GROUP_NAME: &str = "rppanel";
const STAT_COMMANDS: [&str; 3] = ["set", "remove", "show"];
const NAME_SUGGESTIONS: usize = 20;

/// Which side of Discord a command came in from. Only presentation differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Prefix,
    Slash
}

impl Surface {
    pub fn of(ctx: &PanelContext<'_>) -> Self {
        match ctx {
            poise::Context::Prefix(_) => Surface::Prefix,
            poise::Context::Application(_) => Surface::Slash
        }
    }

    pub fn list_limit(self) -> usize {
        match self {
            Surface::Prefix => 20,
            Surface::Slash => 25
        }
    }
}

#[poise::command(prefix_command, slash_command,
    subcommands("ping", "create", "delete", "list", "set", "remove", "show", "toggle"),
    discard_spare_arguments,
    description_localized("en-US", "Manage roleplay panels for this server."),
    identifying_name = "RPPanel"
)]
pub async fn rppanel(ctx: PanelContext<'_>) -> Result<(), Error> {
    ctx.say("Use a valid subcommand. Ex: rppanel ping").await?;
    Ok(())
}

/// The `rppanel` group, minus the stat commands when the bot runs with instances.
pub fn group(variant: Variant) -> poise::Command<(), Error> {
    let mut command = rppanel();

    if !variant.has_stats() {
        command.subcommands.retain(|o| !STAT_COMMANDS.contains(&o.name.as_str()));
    }

    command
}

fn guild_of(ctx: &PanelContext<'_>) -> Result<GuildId, StoreError> {
    ctx.guild_id().ok_or(StoreError::GuildOnly)
}

async fn reply_error(ctx: PanelContext<'_>, err: StoreError) -> Result<(), Error> {
    if let StoreError::Backend(ex) = &err {
        error!("Panel storage failed during {}: {}", ctx.command().qualified_name, ex);
    }

    ctx.send(CreateReply::default().content(err.to_string()).ephemeral(true)).await?;
    Ok(())
}

async fn autocomplete_record(
    ctx: PanelContext<'_>,
    partial: &str)
-> Vec<String> {
    let Some(guild_id) = ctx.guild_id() else {
        return vec![];
    };

    let Some(store) = PanelStore::from_context(ctx.serenity_context()).await else {
        return vec![];
    };

    match store.autocomplete(guild_id, partial, NAME_SUGGESTIONS).await {
        Ok(names) => names,
        Err(ex) => {
            error!("Failed to autocomplete records: {}", ex);
            vec![]
        }
    }
}
