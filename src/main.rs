mod models;
mod commands;
mod services;

use std::collections::HashSet;
use commands::get_framework;
use models::config::Config;
use services::{*, database::Database, memory_store::MemoryStore, panel_store::{GuildConfigStore, PanelStore}};
use std::fs;
use std::sync::Arc;
use std::env;
use std::error;
use serenity::{
    client::ClientBuilder,
    model::{gateway::GatewayIntents, id::UserId},
    http::Http
};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;

type Error = Box<dyn error::Error + Send + Sync>;
type PanelContext<'a> = poise::Context<'a, (), Error>;

async fn init_logger() -> Result<WorkerGuard, Error> {
    let file_appender = tracing_appender::rolling::hourly("logs", "rppanel.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing::subscriber::set_global_default(
        fmt::Subscriber::builder()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_span_events(fmt::format::FmtSpan::CLOSE)
            .with_ansi(true)
            .with_max_level(tracing::Level::DEBUG)
            .finish()
            .with(fmt::Layer::default().with_writer(non_blocking))
    )?;

    const VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");
    info!("Initializing RPPanel v{}", VERSION.unwrap_or("<unknown>"));
    info!("Reading from {}", env::current_dir()?.display());

    Ok(guard)
}

async fn fetch_owners(token: &str) -> Result<HashSet<UserId>, Error> {
    let http = Http::new(token);
    let info = http.get_current_application_info().await?;

    let mut owners = HashSet::new();

    if let Some(team) = info.team {
        owners.insert(team.owner_user_id);
    } else if let Some(owner) = info.owner {
        owners.insert(owner.id);
    }

    Ok(owners)
}

async fn build_store(config: &Config) -> Result<Arc<PanelStore>, Error> {
    let backend: Arc<dyn GuildConfigStore> = if config.uses_sql_server() {
        Arc::new(Database::new(&config.sql_server_ip, config.sql_server_port, &config.sql_server_username, &config.sql_server_password).await?)
    } else {
        warn!("No SQL Server configured; {} will only be kept in memory", config.variant.collection());
        Arc::new(MemoryStore::new())
    };

    Ok(Arc::new(PanelStore::new(&config.namespace, config.variant, backend)))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Dropping the guard stops the file writer, so it lives until main returns.
    let _guard = match init_logger().await {
        Ok(guard) => Some(guard),
        Err(ex) => {
            eprintln!("Failed to initialize logger: {}", ex);
            None
        }
    };

    let config_json = fs::read_to_string("config.json").map_err(|ex| format!("config.json not found: {ex}"))?;
    let config: Config = serde_json::from_str(&config_json).map_err(|ex| format!("config.json is malformed: {ex}"))?;

    let owners = fetch_owners(&config.token).await?;
    let store = build_store(&config).await?;
    info!("Serving {} under namespace '{}'", config.variant.collection(), config.namespace);

    let framework = poise::Framework::builder()
        .options(get_framework(&config.cmd_prefix, owners, config.variant))
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                bot_init::ready(ctx, ready, &framework.options().commands).await;
                Ok(())
            })
        })
        .build();

    let intents = GatewayIntents::non_privileged() | GatewayIntents::MESSAGE_CONTENT;
    let mut client = ClientBuilder::new(&config.token, intents)
        .framework(framework)
        .await?;

    {
        let mut data = client.data.write().await;
        data.insert::<PanelStore>(store);
    }

    {
        let shard_manager = client.shard_manager.clone();
        let http = client.http.clone();
        let unregister = config.unregister_on_shutdown;

        // Stop on Ctrl-C, taking the slash group down with us if asked to.
        #[allow(clippy::let_underscore_future)]
        let _ = tokio::spawn(async move {
            if let Err(ex) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", ex);
                return;
            }

            info!("Shutting down");

            if unregister {
                bot_init::unregister(&http, commands::rppanel::GROUP_NAME).await;
            }

            shard_manager.shutdown_all().await;
        });
    }

    if let Err(ex) = client.start().await {
        error!("Discord bot client error: {:?}", ex);
    }

    Ok(())
}
