use anyhow::{anyhow, Result};
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, CreateEmbeddingRequestArgs, EmbeddingInput,
    },
    Client,
};
use async_trait::async_trait;
use classsight_observability::log_external_call;
use std::time::Instant;

/// Chat completion and embedding provider behind the assistant.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Single-turn completion. `system` may be empty.
    async fn complete(&self, system: &str, user: &str) -> Result<String>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

pub struct OpenAiModel {
    client: Client<OpenAIConfig>,
    chat_model: String,
    embed_model: String,
}

impl OpenAiModel {
    pub fn new(api_key: &str, chat_model: impl Into<String>, embed_model: impl Into<String>) -> Self {
        Self {
            client: Client::with_config(OpenAIConfig::new().with_api_key(api_key)),
            chat_model: chat_model.into(),
            embed_model: embed_model.into(),
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::with_capacity(2);
        if !system.is_empty() {
            messages.push(ChatCompletionRequestSystemMessageArgs::default().content(system).build()?.into());
        }
        messages.push(ChatCompletionRequestUserMessageArgs::default().content(user).build()?.into());

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.chat_model)
            .messages(messages)
            .build()?;

        log_external_call!("openai", "chat/completions");
        let started = Instant::now();
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| anyhow!("Chat completion failed: {}", e))?;
        log_external_call!("openai", "chat/completions", started.elapsed().as_millis() as u64, 200u16);

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| anyhow!("No completion returned from OpenAI"))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.embed_model)
            .input(EmbeddingInput::String(text.to_string()))
            .build()?;

        log_external_call!("openai", "embeddings");
        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| anyhow!("Failed to create embedding: {}", e))?;

        Ok(response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No embedding returned from OpenAI"))?
            .embedding)
    }
}
