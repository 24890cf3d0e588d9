use std::str::FromStr;
use std::time::Instant;
use poise::CreateReply;
use thiserror::Error as ThisError;

use crate::{PanelContext, Error};
use super::{render, Surface};

const MODE_SUGGESTIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingMode {
    Normal,
    Ephemeral,
    Debug
}

impl PingMode {
    pub const NAMES: [&'static str; 3] = ["normal", "ephemeral", "debug"];
}

#[derive(Debug, ThisError)]
#[error("Unknown mode `{0}`. Try one of: normal, ephemeral, debug.")]
pub struct UnknownMode(String);

impl FromStr for PingMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "normal" => Ok(PingMode::Normal),
            "ephemeral" => Ok(PingMode::Ephemeral),
            "debug" => Ok(PingMode::Debug),
            _ => Err(UnknownMode(s.to_string()))
        }
    }
}

pub fn mode_suggestions(partial: &str) -> Vec<String> {
    let needle = partial.trim().to_lowercase();

    PingMode::NAMES.iter()
        .filter(|o| o.contains(&needle))
        .take(MODE_SUGGESTIONS)
        .map(|o| o.to_string())
        .collect()
}

async fn autocomplete_mode(
    _ctx: PanelContext<'_>,
    partial: &str)
-> Vec<String> {
    mode_suggestions(partial)
}

#[poise::command(
    prefix_command,
    slash_command,
    description_localized("en-US", "Check whether the bot is responding, and how fast."),
    discard_spare_arguments
)]
pub async fn ping(
    ctx: PanelContext<'_>,
    #[autocomplete = "autocomplete_mode"] #[description = "normal, ephemeral (only you see it) or debug"] mode: Option<String>)
-> Result<(), Error> {
    let mode = match mode.as_deref().map(PingMode::from_str) {
        None => PingMode::Normal,
        Some(Ok(mode)) => mode,
        Some(Err(ex)) => {
            ctx.send(CreateReply::default().content(ex.to_string()).ephemeral(true)).await?;
            return Ok(());
        }
    };

    let ephemeral = mode == PingMode::Ephemeral && Surface::of(&ctx) == Surface::Slash;

    let start = Instant::now();
    let handle = ctx.send(CreateReply::default().content("Pinging...").ephemeral(ephemeral)).await?;
    let round_trip = start.elapsed();
    let gateway = ctx.ping().await;

    handle.edit(ctx, CreateReply::default().content(render::ping_text(mode, round_trip, gateway))).await?;

    Ok(())
}
