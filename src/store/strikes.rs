//! Strike count persistence

use std::collections::BTreeMap;
use std::path::PathBuf;

use poise::serenity_prelude::{GuildId, UserId};
use serde::{Deserialize, Serialize};

use super::{JsonDocument, StoreError, StoreResult};
use crate::config::StrikeLayout;

/// On-disk strike map, in either layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StrikeLedger {
    /// `{serverId: {memberId: count}}`
    Nested(BTreeMap<String, BTreeMap<String, u64>>),
    /// `{memberId: count}`
    Flat(BTreeMap<String, u64>),
}

impl Default for StrikeLedger {
    fn default() -> Self {
        Self::Nested(BTreeMap::new())
    }
}

impl StrikeLedger {
    #[must_use]
    pub fn empty(layout: StrikeLayout) -> Self {
        match layout {
            StrikeLayout::Nested => Self::Nested(BTreeMap::new()),
            StrikeLayout::Flat => Self::Flat(BTreeMap::new()),
        }
    }

    #[must_use]
    pub fn layout(&self) -> StrikeLayout {
        match self {
            Self::Nested(_) => StrikeLayout::Nested,
            Self::Flat(_) => StrikeLayout::Flat,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Nested(guilds) => guilds.is_empty(),
            Self::Flat(members) => members.is_empty(),
        }
    }

    #[must_use]
    pub fn count(&self, guild_id: GuildId, user_id: UserId) -> u64 {
        match self {
            Self::Nested(guilds) => guilds
                .get(&guild_id.to_string())
                .and_then(|members| members.get(&user_id.to_string()))
                .copied()
                .unwrap_or(0),
            Self::Flat(members) => members.get(&user_id.to_string()).copied().unwrap_or(0),
        }
    }

    /// Add one strike and return the new count
    pub fn increment(&mut self, guild_id: GuildId, user_id: UserId) -> u64 {
        let slot = match self {
            Self::Nested(guilds) => guilds
                .entry(guild_id.to_string())
                .or_default()
                .entry(user_id.to_string())
                .or_insert(0),
            Self::Flat(members) => members.entry(user_id.to_string()).or_insert(0),
        };
        *slot += 1;
        *slot
    }
}

/// Durable per-member strike counts
#[derive(Debug)]
pub struct StrikeStore {
    document: JsonDocument<StrikeLedger>,
}

impl StrikeStore {
    /// Open the strike file, creating an empty ledger in `layout` if absent.
    ///
    /// # Errors
    ///
    /// Fails if the file is unreadable, is invalid JSON, or holds strikes in the
    /// other layout.
    pub async fn open(path: impl Into<PathBuf>, layout: StrikeLayout) -> StoreResult<Self> {
        let path = path.into();
        let mut ledger = JsonDocument::<StrikeLedger>::load(&path).await?;
        if ledger.layout() != layout {
            // An empty `{}` always parses as nested; only real data pins the layout
            if !ledger.is_empty() {
                return Err(StoreError::LayoutMismatch {
                    path,
                    expected: layout,
                });
            }
            ledger = StrikeLedger::empty(layout);
        }
        Ok(Self {
            document: JsonDocument::new(path, ledger),
        })
    }

    /// Current strike count, zero if the member has none
    pub async fn count(&self, guild_id: GuildId, user_id: UserId) -> u64 {
        self.document
            .read(|ledger| ledger.count(guild_id, user_id))
            .await
    }

    /// Add one strike, persist, and return the new count
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be written; the count is not advanced.
    pub async fn increment(&self, guild_id: GuildId, user_id: UserId) -> StoreResult<u64> {
        self.document
            .update(|ledger| ledger.increment(guild_id, user_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUILD: GuildId = GuildId::new(111);
    const OTHER_GUILD: GuildId = GuildId::new(222);
    const USER: UserId = UserId::new(12345);

    #[test]
    fn test_nested_ledger_serialization() {
        let mut ledger = StrikeLedger::empty(StrikeLayout::Nested);
        ledger.increment(GUILD, USER);
        ledger.increment(GUILD, USER);

        let json = serde_json::to_value(&ledger).expect("serialize");
        assert_eq!(json, serde_json::json!({ "111": { "12345": 2 } }));

        let parsed: StrikeLedger = serde_json::from_value(json).expect("deserialize");
        assert_eq!(parsed.layout(), StrikeLayout::Nested);
        assert_eq!(parsed.count(GUILD, USER), 2);
    }

    #[test]
    fn test_flat_ledger_is_shared_across_guilds() {
        let mut ledger = StrikeLedger::empty(StrikeLayout::Flat);
        ledger.increment(GUILD, USER);
        assert_eq!(ledger.increment(OTHER_GUILD, USER), 2);

        let json = serde_json::to_value(&ledger).expect("serialize");
        assert_eq!(json, serde_json::json!({ "12345": 2 }));

        let parsed: StrikeLedger = serde_json::from_value(json).expect("deserialize");
        assert_eq!(parsed.layout(), StrikeLayout::Flat);
    }

    #[test]
    fn test_nested_ledger_is_per_guild() {
        let mut ledger = StrikeLedger::empty(StrikeLayout::Nested);
        ledger.increment(GUILD, USER);
        assert_eq!(ledger.count(GUILD, USER), 1);
        assert_eq!(ledger.count(OTHER_GUILD, USER), 0);
    }

    #[tokio::test]
    async fn test_counts_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("warns.json");

        let store = StrikeStore::open(&path, StrikeLayout::Nested)
            .await
            .expect("open");
        for expected in 1..=3 {
            assert_eq!(store.increment(GUILD, USER).await.expect("inc"), expected);
        }
        drop(store);

        let store = StrikeStore::open(&path, StrikeLayout::Nested)
            .await
            .expect("reopen");
        assert_eq!(store.count(GUILD, USER).await, 3);
        assert_eq!(store.increment(GUILD, USER).await.expect("inc"), 4);
    }

    #[tokio::test]
    async fn test_empty_file_adopts_configured_layout() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("warns.json");
        tokio::fs::write(&path, "{}").await.expect("write");

        let store = StrikeStore::open(&path, StrikeLayout::Flat)
            .await
            .expect("open");
        store.increment(GUILD, USER).await.expect("inc");

        let content = tokio::fs::read_to_string(&path).await.expect("read");
        let json: serde_json::Value = serde_json::from_str(&content).expect("json");
        assert_eq!(json, serde_json::json!({ "12345": 1 }));
    }

    #[tokio::test]
    async fn test_layout_mismatch_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("warns.json");
        tokio::fs::write(&path, r#"{ "12345": 4 }"#)
            .await
            .expect("write");

        assert!(matches!(
            StrikeStore::open(&path, StrikeLayout::Nested).await,
            Err(StoreError::LayoutMismatch { .. })
        ));
    }
}
