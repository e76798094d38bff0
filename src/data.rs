use std::{ops::Deref, sync::Arc};

use crate::commands::CommandDispatcher;
use crate::config::BotConfig;
use crate::mirror::LogMirror;
use crate::moderation::platform::{ChannelDirectory, Messageable, Moderatable};
use crate::store::{LogConfigStore, StoreResult, StrikeStore};

/// The two durable documents, opened once at startup
#[derive(Debug, Clone)]
pub struct Stores {
    pub strikes: Arc<StrikeStore>,
    pub log_config: Arc<LogConfigStore>,
}

impl Stores {
    /// Open `warns.json` and `config.json` under the configured data directory
    ///
    /// # Errors
    ///
    /// Fails if either file is unreadable, is invalid JSON, or the strike file
    /// uses a different layout than configured.
    pub async fn open(config: &BotConfig) -> StoreResult<Self> {
        let strikes = StrikeStore::open(config.strikes_path(), config.strike_layout).await?;
        let log_config = LogConfigStore::open(config.log_config_path()).await?;
        Ok(Self {
            strikes: Arc::new(strikes),
            log_config: Arc::new(log_config),
        })
    }
}

/// Centralized data structure for the bot
#[derive(Clone)]
pub struct Data(pub Arc<DataInner>);

impl std::fmt::Debug for Data {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Data")
            .field("config", &self.config)
            .field("strikes", &self.stores.strikes)
            .field("log_config", &self.stores.log_config)
            .finish_non_exhaustive()
    }
}

impl Deref for Data {
    type Target = DataInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Data {
    /// Wire every subsystem to one platform implementation
    #[must_use]
    pub fn new<P>(config: BotConfig, stores: Stores, platform: Arc<P>) -> Self
    where
        P: Moderatable + Messageable + ChannelDirectory + 'static,
    {
        Self::with_capabilities(
            config,
            stores,
            platform.clone(),
            platform.clone(),
            platform,
        )
    }

    /// Like [`Data::new`] with each capability supplied separately
    #[must_use]
    pub fn with_capabilities(
        config: BotConfig,
        stores: Stores,
        moderator: Arc<dyn Moderatable>,
        messages: Arc<dyn Messageable>,
        directory: Arc<dyn ChannelDirectory>,
    ) -> Self {
        let dispatcher = CommandDispatcher::new(
            &config,
            Arc::clone(&stores.strikes),
            Arc::clone(&stores.log_config),
            moderator,
            Arc::clone(&messages),
            Arc::clone(&directory),
        );
        let mirror = LogMirror::new(
            &config,
            Arc::clone(&stores.log_config),
            directory,
            Arc::clone(&messages),
        );

        Self(Arc::new(DataInner {
            config,
            stores,
            dispatcher,
            mirror,
            messages,
        }))
    }
}

pub struct DataInner {
    pub config: BotConfig,
    pub stores: Stores,
    pub dispatcher: CommandDispatcher,
    pub mirror: LogMirror,
    /// Outbound channel used to post command replies
    pub messages: Arc<dyn Messageable>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{Invocation, Reply};
    use crate::moderation::Actor;
    use crate::moderation::platform::{MockChannelDirectory, MockMessageable, MockModeratable};
    use poise::serenity_prelude::{ChannelId, GuildId, MessageId, Permissions, UserId};

    async fn data(dir: &tempfile::TempDir) -> Data {
        let config = BotConfig {
            data_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let stores = Stores::open(&config).await.expect("stores");
        Data::with_capabilities(
            config,
            stores,
            Arc::new(MockModeratable::new()),
            Arc::new(MockMessageable::new()),
            Arc::new(MockChannelDirectory::new()),
        )
    }

    #[tokio::test]
    async fn test_stores_open_under_data_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let data = data(&dir).await;
        assert_eq!(data.config.strikes_path(), dir.path().join("warns.json"));
        assert_eq!(data.stores.strikes.count(GuildId::new(1), UserId::new(2)).await, 0);
    }

    #[tokio::test]
    async fn test_dispatch_through_data() {
        let dir = tempfile::tempdir().expect("tempdir");
        let data = data(&dir).await;
        let invocation = Invocation {
            guild_id: Some(GuildId::new(1)),
            channel_id: ChannelId::new(2),
            message_id: MessageId::new(3),
            actor: Actor {
                id: UserId::new(4),
                tag: "someone".to_string(),
                permissions: Permissions::empty(),
                is_guild_owner: false,
            },
            author_is_bot: false,
            content: "!ping".to_string(),
            mentioned_members: Vec::new(),
            mentioned_channels: Vec::new(),
        };
        assert_eq!(data.dispatcher.dispatch(&invocation).await, Some(vec![Reply::Ping]));
    }

    #[tokio::test]
    async fn test_data_debug_impl() {
        let dir = tempfile::tempdir().expect("tempdir");
        let debug_output = format!("{:?}", data(&dir).await);
        assert!(debug_output.contains("Data"));
        assert!(debug_output.contains("config"));
        assert!(debug_output.contains("strikes"));
    }
}
