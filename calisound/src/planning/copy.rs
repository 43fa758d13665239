//! AI promotional copy generation for release plans.
//!
//! Prompts are built from a minijinja template with per-platform tone and
//! length hints, then sent to an OpenAI-compatible chat-completion endpoint.
//! The model reply is stored verbatim by the caller. Without an API key the
//! generator is disabled and every request fails cleanly.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use chrono::NaiveDate;
use minijinja::{Environment, context};
use tracing::instrument;

use crate::config::AiConfig;
use crate::errors::{Error, Result};
use crate::platforms::Platform;

const SYSTEM_PROMPT: &str =
    "You write short promotional copy for CALI Sound, a California house music brand. \
     Reply with the post text only, no quotes and no commentary.";

const PROMPT_TEMPLATE: &str = "\
Write a {{ platform }} post announcing the release \"{{ title }}\" by {{ artist }}, out {{ release_date }}.
{{ tone }}
Keep it under {{ max_chars }} characters.";

fn tone_for(platform: Platform) -> &'static str {
    match platform {
        Platform::X => "Punchy and direct, at most two hashtags.",
        Platform::Instagram => "Warm and visual, emoji welcome, a handful of hashtags.",
        Platform::Tiktok => "Casual and high-energy, speak to a young crowd.",
        Platform::Youtube => "Descriptive, mention the full set and invite subscriptions.",
        Platform::Facebook => "Conversational, slightly longer, invite sharing.",
    }
}

pub struct CopyGenerator {
    client: Option<Client<OpenAIConfig>>,
    model: String,
    max_tokens: u32,
    env: Environment<'static>,
}

impl CopyGenerator {
    pub fn new(config: &AiConfig) -> Result<Self> {
        let client = config.api_key.as_ref().map(|api_key| {
            let mut openai_config = OpenAIConfig::new().with_api_key(api_key);
            if let Some(api_base) = &config.api_base {
                openai_config = openai_config.with_api_base(api_base);
            }
            Client::with_config(openai_config)
        });

        let mut env = Environment::new();
        env.add_template("copy_prompt", PROMPT_TEMPLATE)
            .map_err(|e| Error::Internal {
                operation: format!("register copy prompt template: {e}"),
            })?;

        Ok(Self {
            client,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            env,
        })
    }

    /// Whether an API key was configured.
    pub fn enabled(&self) -> bool {
        self.client.is_some()
    }

    /// The model name recorded on generated copy rows.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Render the per-platform prompt for a release.
    pub fn render_prompt(&self, title: &str, artist: &str, release_date: NaiveDate, platform: Platform) -> Result<String> {
        let template = self.env.get_template("copy_prompt").map_err(|e| Error::Internal {
            operation: format!("load copy prompt template: {e}"),
        })?;
        template
            .render(context! {
                platform => platform.as_str(),
                title => title,
                artist => artist,
                release_date => release_date.to_string(),
                tone => tone_for(platform),
                max_chars => platform.rules().max_chars,
            })
            .map_err(|e| Error::Internal {
                operation: format!("render copy prompt: {e}"),
            })
    }

    /// Generate copy for one platform of a release.
    #[instrument(skip(self), fields(model = %self.model, platform = %platform), err)]
    pub async fn generate(&self, title: &str, artist: &str, release_date: NaiveDate, platform: Platform) -> Result<String> {
        let client = self.client.as_ref().ok_or_else(|| Error::BadRequest {
            message: "Copy generation is not configured (no AI API key)".to_string(),
        })?;

        let prompt = self.render_prompt(title, artist, release_date, platform)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .max_tokens(self.max_tokens)
            .messages([
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(SYSTEM_PROMPT)
                    .build()
                    .map_err(anyhow::Error::from)?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()
                    .map_err(anyhow::Error::from)?
                    .into(),
            ])
            .build()
            .map_err(anyhow::Error::from)?;

        let response = client.chat().create(request).await.map_err(anyhow::Error::from)?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::Internal {
                operation: "copy generation: empty completion response".to_string(),
            })?;

        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> CopyGenerator {
        CopyGenerator::new(&AiConfig::default()).unwrap()
    }

    #[test]
    fn test_disabled_without_api_key() {
        assert!(!generator().enabled());
    }

    #[test]
    fn test_prompt_includes_release_details() {
        let release = NaiveDate::from_ymd_opt(2026, 9, 18).unwrap();
        let prompt = generator()
            .render_prompt("Night Drive", "DJ Cali", release, Platform::Instagram)
            .unwrap();

        assert!(prompt.contains("Night Drive"));
        assert!(prompt.contains("DJ Cali"));
        assert!(prompt.contains("2026-09-18"));
        assert!(prompt.contains("instagram"));
        assert!(prompt.contains("2200"));
    }

    #[test]
    fn test_prompt_tone_varies_by_platform() {
        let release = NaiveDate::from_ymd_opt(2026, 9, 18).unwrap();
        let g = generator();
        let x = g.render_prompt("T", "A", release, Platform::X).unwrap();
        let tiktok = g.render_prompt("T", "A", release, Platform::Tiktok).unwrap();
        assert_ne!(x, tiktok);
        assert!(x.contains("280"));
    }

    #[tokio::test]
    async fn test_generate_fails_cleanly_without_key() {
        let release = NaiveDate::from_ymd_opt(2026, 9, 18).unwrap();
        let result = generator().generate("T", "A", release, Platform::X).await;
        assert!(matches!(result.unwrap_err(), Error::BadRequest { .. }));
    }
}
