mod general;
pub mod rppanel;

use std::collections::HashSet;
use tracing::{debug, error};

use serenity::model::id::UserId;

use general::*;
use crate::{Error, PanelContext};
use crate::models::panel_models::Variant;

async fn on_error(error: poise::FrameworkError<'_, (), Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Command {} failed: {}", ctx.command().qualified_name, error);

            if let Err(ex) = ctx.say("Something went wrong running that command... try again later?").await {
                error!("Failed to send error message: {}", ex);
            }
        }
        other => {
            if let Err(ex) = poise::builtins::on_error(other).await {
                error!("Failed to handle framework error: {}", ex);
            }
        }
    }
}

async fn pre_command(ctx: PanelContext<'_>) {
    debug!("{} invoked {} in {:?}", ctx.author().name, ctx.command().qualified_name, ctx.guild_id());
}

pub fn get_commands(variant: Variant) -> Vec<poise::Command<(), Error>> {
    vec![
        help(),
        info(),
        register(),
        rppanel::group(variant)
    ]
}

pub fn get_framework(pref: &str, owners: HashSet<UserId>, variant: Variant) -> poise::FrameworkOptions<(), Error> {
    poise::FrameworkOptions {
        commands: get_commands(variant),
        prefix_options: poise::PrefixFrameworkOptions {
            prefix: Some(pref.to_string()),
            mention_as_prefix: true,
            ..Default::default()
        },
        on_error: |error| Box::pin(on_error(error)),
        pre_command: |ctx| Box::pin(pre_command(ctx)),
        owners,
        ..Default::default()
    }
}
