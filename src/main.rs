use std::env;
use std::sync::Arc;

use poise::serenity_prelude::{self as serenity};
use serenity::GatewayIntents;
use strike_warden::config::{self, BotConfig, ConfigError};
use strike_warden::data::Stores;
use strike_warden::discord::SerenityPlatform;
use strike_warden::{Data, ERROR_TARGET, Error, handlers, liveness, logging};
use tracing::{error, info};

/// Messages kept per channel so deletions and edits can be mirrored with content
const CACHED_MESSAGES: usize = 500;

/// Main function to run the bot
async fn async_main() -> Result<(), Error> {
    logging::init()?;

    let config_path =
        env::var(config::CONFIG_ENV).unwrap_or_else(|_| config::CONFIG_FILE.to_string());
    let config = BotConfig::load(&config_path).await?;
    info!("Loaded configuration from {config_path}");

    let token =
        env::var(config::TOKEN_ENV).map_err(|_| ConfigError::MissingToken(config::TOKEN_ENV))?;

    // Fail before connecting if either document is unreadable
    let stores = Stores::open(&config).await?;

    if config.liveness.enabled {
        let addr = config
            .liveness
            .socket_addr(env::var(config::PORT_ENV).ok().as_deref())?;
        let body = config.liveness.body.clone();
        tokio::spawn(async move {
            if let Err(e) = liveness::serve(addr, body).await {
                error!(target: ERROR_TARGET, error = %e, "Liveness endpoint stopped");
            }
        });
    }

    // Commands are parsed by our own router, so poise only carries events
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            event_handler: |ctx, event, framework, data| {
                Box::pin(handlers::event_handler(ctx, event, framework, data))
            },
            on_error: |error| {
                Box::pin(async move {
                    logging::log_framework_error(&error);
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, _framework| {
            Box::pin(async move {
                logging::log_console("Wiring the moderation core to Discord".to_string());
                let platform = Arc::new(SerenityPlatform::new(
                    Arc::clone(&ctx.http),
                    Arc::clone(&ctx.cache),
                ));
                Ok(Data::new(config, stores, platform))
            })
        })
        .build();

    let mut cache_settings = ::serenity::cache::Settings::default();
    cache_settings.max_messages = CACHED_MESSAGES;

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MEMBERS;
    let mut client = serenity::ClientBuilder::new(token, intents)
        .cache_settings(cache_settings)
        .framework(framework)
        .await?;

    let shard_manager = Arc::clone(&client.shard_manager);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down");
            shard_manager.shutdown_all().await;
        }
    });

    info!("Starting bot...");
    client.start().await?;
    Ok(())
}

fn main() {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Error: failed to start the runtime: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = runtime.block_on(async_main()) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
