use serenity::{
    client::Context,
    http::Http,
    model::{
        application::Command,
        gateway::Ready
    }
};
use tracing::{debug, error, info};
use crate::Error;

pub async fn ready(ctx: &Context, ready: &Ready, commands: &[poise::Command<(), Error>]) {
    info!("Logged in as {} (in {} guilds)", ready.user.name, ready.guilds.len());

    if let Err(ex) = poise::builtins::register_globally(ctx, commands).await {
        error!("Failed to create slash commands: {}", ex);
    } else {
        info!("Registered {} application commands", commands.len());
    }
}

/// Removes a global application command by name. Removal is best effort: an already
/// missing command or a failed request is only logged.
pub async fn unregister(http: &Http, name: &str) {
    match Command::get_global_commands(http).await {
        Ok(commands) => {
            for command in commands.iter().filter(|o| o.name == name) {
                if let Err(ex) = Command::delete_global_command(http, command.id).await {
                    debug!("Ignoring failure to remove /{}: {}", name, ex);
                }
            }
        }
        Err(ex) => debug!("Ignoring failure to list application commands: {}", ex)
    }
}
