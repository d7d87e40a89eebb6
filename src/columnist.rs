use anyhow::{Context, Result, anyhow, bail};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
        CreateChatCompletionRequestArgs,
    },
};
use log::debug;
use std::time::{Duration, Instant};

use crate::models::Post;

const SYSTEM_PROMPT: &str = "You are a concise, hype Gen Z sports columnist.";
const MAX_TOKENS: u32 = 220;
const TEMPERATURE: f32 = 0.8;

/// Writes the short column that goes under each post.
pub struct Columnist {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
}

impl Columnist {
    pub fn new(api_key: &str, model: &str, timeout: Duration) -> Self {
        let openai_config = OpenAIConfig::default().with_api_key(api_key);
        Columnist {
            client: Client::with_config(openai_config),
            model: model.to_string(),
            timeout,
        }
    }

    pub async fn write_column(&self, post: &Post) -> Result<String> {
        let prompt = build_prompt(post);
        debug!("Column prompt for {}:\n{prompt}", post.sport);

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(TEMPERATURE)
            .max_tokens(MAX_TOKENS)
            .messages([
                ChatCompletionRequestSystemMessage::from(SYSTEM_PROMPT).into(),
                ChatCompletionRequestUserMessage::from(prompt).into(),
            ])
            .build()
            .context("Failed to build OpenAI request")?;

        debug!("Calling OpenAI with {:?} timeout", self.timeout);
        let start_time = Instant::now();
        let response = match tokio::time::timeout(self.timeout, self.client.chat().create(request)).await {
            Ok(Ok(response)) => {
                debug!("OpenAI call completed in {:?}", start_time.elapsed());
                response
            }
            Ok(Err(api_error)) => return Err(anyhow!("OpenAI API error: {api_error}")),
            Err(_) => bail!("OpenAI call timed out after {:?}", self.timeout),
        };

        let text = response
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            bail!("OpenAI returned an empty column");
        }
        Ok(text)
    }
}

/// Column body used when AI is switched off: the story's own summary,
/// else its headline.
pub fn fallback_column(post: &Post) -> String {
    post.summary
        .clone()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| post.title.clone())
}

pub fn build_prompt(post: &Post) -> String {
    let tags = match post.hashtags.iter().take(2).cloned().collect::<Vec<_>>() {
        tags if tags.is_empty() => "#SportsTalk".to_string(),
        tags => tags.join(" "),
    };
    let summary = post.summary.as_deref().unwrap_or("(no summary available)");

    format!(
        r#"Write a short {sport} column for Gen Z readers about this story.

Headline: {title}
Summary: {summary}
Source: {source}
Published: {when}

Use a witty, casual tone with Gen Z slang, like a viral Discord post.
- Stick to the facts above. Do not invent scores, stats, quotes or results that are not in the headline or summary.
- Give one hot take and one bold but clearly-labelled prediction.
- Keep it under 120 words.
- End with the hashtags: {tags}"#,
        sport = post.sport.label(),
        title = post.title,
        source = post.source,
        when = post.when_text,
    )
}
