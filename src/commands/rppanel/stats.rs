use crate::{PanelContext, Error, paneldb};
use crate::models::panel_models::EditOutcome;
use super::{autocomplete_record, guild_of, render::ShowCard, reply_error};

#[poise::command(
    prefix_command,
    slash_command,
    required_permissions = "MANAGE_GUILD",
    description_localized("en-US", "Add a stat to a panel, or change its value.")
)]
pub async fn set(
    ctx: PanelContext<'_>,
    #[autocomplete = "autocomplete_record"] #[description = "The panel to edit."] panel_id: String,
    #[description = "Stat label, up to 40 characters."] label: String,
    #[description = "Stat value, up to 200 characters."] #[rest] value: String)
-> Result<(), Error> {
    let store = paneldb!(ctx);

    let result = match guild_of(&ctx) {
        Ok(guild_id) => store.set_stat(guild_id, &panel_id, &label, &value).await,
        Err(ex) => Err(ex)
    };

    match result {
        Ok(EditOutcome::Inserted) => {
            ctx.say(format!("Added `{}` to panel '{}'.", label.trim(), panel_id.trim())).await?;
        }
        Ok(_) => {
            ctx.say(format!("Updated `{}` on panel '{}'.", label.trim(), panel_id.trim())).await?;
        }
        Err(ex) => reply_error(ctx, ex).await?
    }

    Ok(())
}

#[poise::command(
    prefix_command,
    slash_command,
    required_permissions = "MANAGE_GUILD",
    description_localized("en-US", "Remove a stat from a panel.")
)]
pub async fn remove(
    ctx: PanelContext<'_>,
    #[autocomplete = "autocomplete_record"] #[description = "The panel to edit."] panel_id: String,
    #[description = "The stat label to remove."] #[rest] label: String)
-> Result<(), Error> {
    let store = paneldb!(ctx);

    let result = match guild_of(&ctx) {
        Ok(guild_id) => store.remove_stat(guild_id, &panel_id, &label).await,
        Err(ex) => Err(ex)
    };

    match result {
        Ok(()) => {
            ctx.say(format!("Removed `{}` from panel '{}'.", label.trim(), panel_id.trim())).await?;
        }
        Err(ex) => reply_error(ctx, ex).await?
    }

    Ok(())
}

#[poise::command(
    prefix_command,
    slash_command,
    description_localized("en-US", "Show a panel and all of its stats.")
)]
pub async fn show(
    ctx: PanelContext<'_>,
    #[autocomplete = "autocomplete_record"] #[description = "The panel to show."] panel_id: String)
-> Result<(), Error> {
    let store = paneldb!(ctx);

    let result = match guild_of(&ctx) {
        Ok(guild_id) => store.show(guild_id, &panel_id).await,
        Err(ex) => Err(ex)
    };

    match result {
        Ok(record) => {
            ctx.send(ShowCard::from_record(&record).into_reply(&record)).await?;
        }
        Err(ex) => reply_error(ctx, ex).await?
    }

    Ok(())
}
