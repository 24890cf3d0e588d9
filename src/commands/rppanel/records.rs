use tracing::info;
use crate::{PanelContext, Error, paneldb};
use super::{autocomplete_record, guild_of, render, reply_error, Surface};

#[poise::command(
    prefix_command,
    slash_command,
    required_permissions = "MANAGE_GUILD",
    description_localized("en-US", "Create a new panel for this server.")
)]
pub async fn create(
    ctx: PanelContext<'_>,
    #[description = "Name or id of the new panel."] name: String,
    #[description = "An optional title to show on the panel."] #[rest] title: Option<String>)
-> Result<(), Error> {
    let store = paneldb!(ctx);

    let result = match guild_of(&ctx) {
        Ok(guild_id) => store.create(guild_id, ctx.author().id.get(), &name, title.as_deref()).await,
        Err(ex) => Err(ex)
    };

    match result {
        Ok(record) => {
            ctx.say(format!("{} '{}' created.", store.variant().noun(), record.display)).await?;
        }
        Err(ex) => reply_error(ctx, ex).await?
    }

    Ok(())
}

#[poise::command(
    prefix_command,
    slash_command,
    required_permissions = "MANAGE_GUILD",
    description_localized("en-US", "Delete a panel and all of its stats.")
)]
pub async fn delete(
    ctx: PanelContext<'_>,
    #[autocomplete = "autocomplete_record"] #[description = "The panel to delete."] #[rest] name: String)
-> Result<(), Error> {
    let store = paneldb!(ctx);

    let result = match guild_of(&ctx) {
        Ok(guild_id) => store.delete(guild_id, &name).await,
        Err(ex) => Err(ex)
    };

    match result {
        Ok(record) => {
            ctx.say(format!("{} '{}' deleted.", store.variant().noun(), record.display)).await?;
        }
        Err(ex) => reply_error(ctx, ex).await?
    }

    Ok(())
}

#[poise::command(
    prefix_command,
    slash_command,
    description_localized("en-US", "List the panels on this server.")
)]
pub async fn list(ctx: PanelContext<'_>) -> Result<(), Error> {
    let store = paneldb!(ctx);

    let result = match guild_of(&ctx) {
        Ok(guild_id) => store.list(guild_id).await,
        Err(ex) => Err(ex)
    };

    match result {
        Ok(entries) => {
            let limit = Surface::of(&ctx).list_limit();
            ctx.say(render::list_text(store.variant(), &entries, limit)).await?;
        }
        Err(ex) => reply_error(ctx, ex).await?
    }

    Ok(())
}

#[poise::command(
    prefix_command,
    slash_command,
    required_permissions = "ADMINISTRATOR",
    description_localized("en-US", "Turn the panel system on or off for this server.")
)]
pub async fn toggle(ctx: PanelContext<'_>) -> Result<(), Error> {
    let store = paneldb!(ctx);

    let result = match guild_of(&ctx) {
        Ok(guild_id) => store.toggle(guild_id).await,
        Err(ex) => Err(ex)
    };

    match result {
        Ok(enabled) => {
            info!("{} toggled panels {} in {:?}", ctx.author().name, if enabled { "on" } else { "off" }, ctx.guild_id());
            ctx.say(format!("Panels are now {} for this server.", if enabled { "enabled" } else { "disabled" })).await?;
        }
        Err(ex) => reply_error(ctx, ex).await?
    }

    Ok(())
}
