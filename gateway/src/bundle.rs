//! Request-scoped credential bundles.
//!
//! Each deployment variant reads a fixed list of keys from the
//! configuration store. All reads for one request run concurrently and
//! are joined before the bot core is invoked; a missing or empty key
//! aborts the request before any invocation happens.

use crate::config::BundleShape;
use crate::errors::{GatewayError, Result};
use crate::store::KvStore;
use serde::{Deserialize, Serialize};

/// Store key spellings, as provisioned per deployment.
pub mod keys {
    pub const TOKEN: &str = "token";
    pub const ANNOUNCEMENT_CHANNEL: &str = "announcementChannel";
    pub const DISCORD_GATEWAY_TOKEN: &str = "discordGatewayToken";
    pub const DISCORD_WEBHOOK_URL: &str = "discordWebhookUrl";
    pub const DISCORD_MAINTAINER: &str = "discordMaintainer";
    pub const KV_TOKEN: &str = "kvToken";
    pub const KV_ACCOUNT_ID: &str = "kvAccountId";
    pub const LOTTERY_CONFIG: &str = "lotteryConfig";
    pub const SLACK_TOKEN: &str = "slackToken";
    pub const SLACK_ANNOUNCEMENT_CHANNEL: &str = "slackAnnouncementChannel";
    pub const SLACK_MAINTAINER: &str = "slackMaintainer";
    pub const SENTRY_PROJECT_ID: &str = "sentryProjectID";
    pub const SENTRY_KEY: &str = "sentryKey";
}

/// Credentials for a single shared-token deployment.
#[derive(Clone, Debug, Serialize)]
pub struct SharedBundle {
    pub token: String,
    pub announcement_channel: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct DiscordConfig {
    /// Shared secret used to verify requests from the discord gateway
    pub gateway_token: String,
    pub webhook_url: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct SlackConfig {
    pub token: String,
    pub announcement_channel: String,
    pub maintainer: String,
}

/// Credentials the core uses for its own key/value storage.
#[derive(Clone, Debug, Serialize)]
pub struct KvCredentials {
    pub token: String,
    pub account_id: String,
}

/// Lottery rules, stored as a JSON document under `lotteryConfig`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LotteryRules {
    pub has_winner: bool,
    pub active: bool,
    pub jackpot: String,
    pub season: u64,
    pub retry_in_hrs: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct MultiPlatformBundle {
    pub discord: DiscordConfig,
    pub slack: SlackConfig,
    pub kv: KvCredentials,
    pub lottery: LotteryRules,
}

#[derive(Clone, Debug, Serialize)]
pub struct WebhookBundle {
    pub webhook_url: String,
    pub discord_maintainer: String,
    pub slack_maintainer: String,
}

/// Immutable credential bundle assembled once per request, shaped per
/// deployment variant.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum ConfigBundle {
    Shared(SharedBundle),
    MultiPlatform(MultiPlatformBundle),
    Webhook(WebhookBundle),
}

/// Assemble the bundle for the deployment's variant.
pub async fn resolve(shape: BundleShape, store: &dyn KvStore) -> Result<ConfigBundle> {
    match shape {
        BundleShape::Shared => resolve_shared(store).await.map(ConfigBundle::Shared),
        BundleShape::MultiPlatform => resolve_multi_platform(store)
            .await
            .map(ConfigBundle::MultiPlatform),
        BundleShape::Webhook => resolve_webhook(store).await.map(ConfigBundle::Webhook),
    }
}

async fn require(store: &dyn KvStore, key: &'static str) -> Result<String> {
    match store.get(key).await? {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(GatewayError::MissingKey(key)),
    }
}

async fn resolve_shared(store: &dyn KvStore) -> Result<SharedBundle> {
    let (token, announcement_channel) = tokio::try_join!(
        require(store, keys::TOKEN),
        require(store, keys::ANNOUNCEMENT_CHANNEL),
    )?;

    Ok(SharedBundle {
        token,
        announcement_channel,
    })
}

async fn resolve_multi_platform(store: &dyn KvStore) -> Result<MultiPlatformBundle> {
    let (
        gateway_token,
        webhook_url,
        slack_token,
        slack_channel,
        slack_maintainer,
        kv_token,
        kv_account_id,
        lottery_json,
    ) = tokio::try_join!(
        require(store, keys::DISCORD_GATEWAY_TOKEN),
        require(store, keys::DISCORD_WEBHOOK_URL),
        require(store, keys::SLACK_TOKEN),
        require(store, keys::SLACK_ANNOUNCEMENT_CHANNEL),
        require(store, keys::SLACK_MAINTAINER),
        require(store, keys::KV_TOKEN),
        require(store, keys::KV_ACCOUNT_ID),
        require(store, keys::LOTTERY_CONFIG),
    )?;

    Ok(MultiPlatformBundle {
        discord: DiscordConfig {
            gateway_token,
            webhook_url,
        },
        slack: SlackConfig {
            token: slack_token,
            announcement_channel: slack_channel,
            maintainer: slack_maintainer,
        },
        kv: KvCredentials {
            token: kv_token,
            account_id: kv_account_id,
        },
        lottery: decode_lottery_rules(&lottery_json)?,
    })
}

async fn resolve_webhook(store: &dyn KvStore) -> Result<WebhookBundle> {
    let (webhook_url, discord_maintainer, slack_maintainer) = tokio::try_join!(
        require(store, keys::DISCORD_WEBHOOK_URL),
        require(store, keys::DISCORD_MAINTAINER),
        require(store, keys::SLACK_MAINTAINER),
    )?;

    Ok(WebhookBundle {
        webhook_url,
        discord_maintainer,
        slack_maintainer,
    })
}

/// The stored value is a JSON-encoded document; a decode failure is a
/// configuration error, not a crash.
pub fn decode_lottery_rules(raw: &str) -> Result<LotteryRules> {
    serde_json::from_str(raw).map_err(|e| GatewayError::MalformedKey {
        key: keys::LOTTERY_CONFIG,
        detail: e.to_string(),
    })
}
