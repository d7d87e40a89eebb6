use anyhow::{Context, Result, anyhow, bail};
use log::{debug, warn};
use reqwest::Client;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use teloxide::{
    prelude::*,
    types::{ChatId, InputFile},
};

use crate::config::Config;
use crate::models::Post;
use crate::utils::truncate_chars;

const DISCORD_API: &str = "https://discord.com/api/v10";
const EMBED_TITLE_MAX: usize = 256;
const EMBED_DESCRIPTION_MAX: usize = 4096;
const TELEGRAM_CAPTION_MAX: usize = 1024;

/// Which route a post actually went out through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Webhook,
    DiscordBot,
    Telegram,
}

impl fmt::Display for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Delivery::Webhook => "webhook",
            Delivery::DiscordBot => "discord-bot",
            Delivery::Telegram => "telegram",
        })
    }
}

#[derive(Debug, Serialize)]
struct DiscordMessage {
    content: String,
    embeds: Vec<DiscordEmbed>,
}

#[derive(Debug, Serialize)]
struct DiscordEmbed {
    title: String,
    url: String,
    description: String,
    image: EmbedImage,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct EmbedImage {
    url: String,
}

struct DiscordBot {
    token: String,
    channel_id: String,
}

struct TelegramBot {
    token: String,
    chat_ids: Vec<i64>,
}

/// Sends finished posts to chat. Webhook first, then a Discord bot, then Telegram;
/// the first configured route is the one used.
pub struct Publisher {
    client: Client,
    timeout: Duration,
    max_retries: u8,
    mention_everyone: bool,
    webhook_url: Option<String>,
    discord_bot: Option<DiscordBot>,
    telegram: Option<TelegramBot>,
    discord_api: String,
}

impl Publisher {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let timeout = Duration::from_secs(cfg.http_timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build publish client")?;

        let non_empty = |s: &Option<String>| s.as_ref().map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let discord_bot = match (non_empty(&cfg.discord_bot_token), non_empty(&cfg.discord_channel_id)) {
            (Some(token), Some(channel_id)) => Some(DiscordBot { token, channel_id }),
            _ => None,
        };

        let telegram = match (non_empty(&cfg.telegram_bot_token), &cfg.telegram_chat_ids) {
            (Some(token), Some(ids)) if !ids.is_empty() => {
                let chat_ids = ids
                    .iter()
                    .map(|id| id.trim().parse::<i64>().with_context(|| format!("Invalid telegram chat id {id:?}")))
                    .collect::<Result<Vec<_>>>()?;
                Some(TelegramBot { token, chat_ids })
            }
            _ => None,
        };

        Ok(Publisher {
            client,
            timeout,
            max_retries: 3,
            mention_everyone: cfg.mention_everyone,
            webhook_url: non_empty(&cfg.discord_webhook_url),
            discord_bot,
            telegram,
            discord_api: DISCORD_API.to_string(),
        })
    }

    #[cfg(test)]
    pub fn with_discord_api(mut self, base: impl Into<String>) -> Self {
        self.discord_api = base.into();
        self
    }

    #[cfg(test)]
    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    pub fn has_credentials(&self) -> bool {
        self.webhook_url.is_some() || self.discord_bot.is_some() || self.telegram.is_some()
    }

    pub async fn publish(&self, post: &Post, body: &str) -> Result<Delivery> {
        if let Some(webhook) = &self.webhook_url {
            self.post_json(webhook, None, &self.discord_message(post, body)).await?;
            return Ok(Delivery::Webhook);
        }

        if let Some(bot) = &self.discord_bot {
            let endpoint = format!("{}/channels/{}/messages", self.discord_api, bot.channel_id);
            let auth = format!("Bot {}", bot.token);
            self.post_json(&endpoint, Some(&auth), &self.discord_message(post, body)).await?;
            return Ok(Delivery::DiscordBot);
        }

        if let Some(telegram) = &self.telegram {
            self.send_telegram(telegram, post, body).await?;
            return Ok(Delivery::Telegram);
        }

        bail!(
            "No chat credentials set. Provide discord_webhook_url, discord_bot_token + discord_channel_id, or telegram_bot_token + telegram_chat_ids"
        )
    }

    fn discord_message(&self, post: &Post, body: &str) -> DiscordMessage {
        let content = if self.mention_everyone {
            format!("@everyone\n{}", post.caption)
        } else {
            post.caption.clone()
        };

        DiscordMessage {
            content,
            embeds: vec![DiscordEmbed {
                title: truncate_chars(&post.title, EMBED_TITLE_MAX),
                url: post.url.clone(),
                description: truncate_chars(
                    &format!("{body}\n\n{}", post.hashtag_line()),
                    EMBED_DESCRIPTION_MAX,
                ),
                image: EmbedImage {
                    url: post.image.as_str().to_string(),
                },
                timestamp: post.published_at.to_rfc3339(),
            }],
        }
    }

    /// POST with retries on network errors and 5xx; a 4xx is final.
    async fn post_json(&self, endpoint: &str, auth: Option<&str>, payload: &DiscordMessage) -> Result<()> {
        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let mut req = self.client.post(endpoint).json(payload);
            if let Some(auth) = auth {
                req = req.header(reqwest::header::AUTHORIZATION, auth);
            }

            let err = match req.send().await {
                Ok(rsp) if rsp.status().is_success() => return Ok(()),
                Ok(rsp) if rsp.status().is_client_error() => {
                    let status = rsp.status();
                    let text = rsp.text().await.unwrap_or_default();
                    return Err(anyhow!("Discord rejected the message ({status}): {text}"));
                }
                Ok(rsp) => anyhow!("Discord answered {}", rsp.status()),
                Err(e) => anyhow!("Discord request failed: {e}"),
            };

            if attempt >= self.max_retries {
                return Err(err);
            }
            warn!("Publish attempt {attempt} failed: {err}, retrying");
            tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
        }
    }

    async fn send_telegram(&self, telegram: &TelegramBot, post: &Post, body: &str) -> Result<()> {
        let bot = Bot::new(&telegram.token);
        let text = truncate_chars(
            &format!("{}\n\n{body}\n\n{}\n{}", post.caption, post.hashtag_line(), post.url),
            TELEGRAM_CAPTION_MAX,
        );

        for chat_id in &telegram.chat_ids {
            let send = bot
                .send_photo(ChatId(*chat_id), InputFile::url(post.image.url().clone()))
                .caption(text.clone())
                .send();
            tokio::time::timeout(self.timeout, send)
                .await
                .map_err(|_| anyhow!("Telegram send to {chat_id} timed out"))?
                .with_context(|| format!("Telegram send to {chat_id} failed"))?;
            debug!("Sent {} post to telegram chat {chat_id}", post.sport);
        }
        Ok(())
    }
}
