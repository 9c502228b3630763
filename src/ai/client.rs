//! Chat-completion client for an OpenAI-compatible API.
//!
//! The endpoint, model and sampling settings come from [`LlmConfig`]; every
//! request is bounded by the configured timeout.

use crate::config::LlmConfig;
use crate::error::GeneratorError;
use anyhow::{Context as _, Result};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
};
use secrecy::{ExposeSecret as _, SecretString};
use std::future::Future;
use std::time::Duration;

/// Something that answers a system prompt plus one user message with text.
pub trait CompletionBackend {
    fn complete(
        &self,
        system_prompt: &str,
        user_input: &str,
    ) -> impl Future<Output = Result<String, GeneratorError>> + Send;
}

pub struct CommandAssistant {
    client: Client<OpenAIConfig>,
    config: LlmConfig,
}

impl CommandAssistant {
    pub fn new(api_key: &SecretString, config: LlmConfig) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_base(config.api_base.clone())
            .with_api_key(api_key.expose_secret());
        Self {
            client: Client::with_config(openai_config),
            config,
        }
    }

    /// Build a client using the API key from the configured environment variable.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = config.api_key()?;
        Ok(Self::new(&api_key, config.clone()))
    }

    fn build_messages(
        system_prompt: &str,
        user_input: &str,
    ) -> Result<Vec<ChatCompletionRequestMessage>> {
        Ok(vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_prompt)
                .build()
                .context("Failed to build system message")?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_input)
                .build()
                .context("Failed to build user message")?
                .into(),
        ])
    }
}

impl CompletionBackend for CommandAssistant {
    async fn complete(&self, system_prompt: &str, user_input: &str) -> Result<String, GeneratorError> {
        let request = Self::build_messages(system_prompt, user_input)
            .and_then(|messages| {
                CreateChatCompletionRequestArgs::default()
                    .model(&self.config.model)
                    .messages(messages)
                    .temperature(self.config.temperature)
                    .top_p(self.config.top_p)
                    .max_tokens(self.config.max_tokens)
                    .build()
                    .context("Failed to build chat completion request")
            })
            .map_err(|e| GeneratorError::UpstreamRequestFailure(format!("{e:#}")))?;

        let timeout = Duration::from_secs(self.config.timeout_secs);
        tracing::debug!("Sending command request to {}", self.config.api_base);

        let response = tokio::time::timeout(timeout, self.client.chat().create(request))
            .await
            .map_err(|elapsed| {
                GeneratorError::UpstreamRequestFailure(format!(
                    "no response within {}s ({elapsed})",
                    self.config.timeout_secs
                ))
            })?
            .map_err(|e| GeneratorError::UpstreamRequestFailure(format!("API error: {e}")))?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| GeneratorError::MalformedResponse("No response content received".to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_system_then_user() -> Result<()> {
        let messages = CommandAssistant::build_messages("rules", "find big orders")?;
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(messages[1], ChatCompletionRequestMessage::User(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_upstream_failure() {
        let config = LlmConfig {
            api_base: "http://127.0.0.1:9".to_owned(),
            timeout_secs: 5,
            ..Default::default()
        };
        let assistant = CommandAssistant::new(&SecretString::new("test".into()), config);
        let result = assistant.complete("rules", "hello").await;
        assert!(matches!(result, Err(GeneratorError::UpstreamRequestFailure(_))));
    }
}
