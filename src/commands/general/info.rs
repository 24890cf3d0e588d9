use crate::{PanelContext, Error};

#[poise::command(
    prefix_command,
    slash_command,
    description_localized("en-US", "Info about this bot.")
)]
pub async fn info(ctx: PanelContext<'_>) -> Result<(), Error> {
    const VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");
    let content = format!("RPPanel v{} - roleplay panels for your server", VERSION.unwrap_or("<unknown>"));

    ctx.say(content).await?;
    Ok(())
}

/// Registers or unregisters application commands in this guild or globally
#[poise::command(prefix_command, hide_in_help, owners_only)]
pub async fn register(ctx: PanelContext<'_>) -> Result<(), Error> {
    poise::builtins::register_application_commands_buttons(ctx).await?;

    Ok(())
}
