//! services/api/src/adapters/text_llm.rs
//!
//! This module contains the adapter for the drafting LLM.
//! It implements the `TextGenerationService` port from the `psico_core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ResponseFormat,
    },
    Client,
};
use async_trait::async_trait;
use psico_core::ports::{GenerationRequest, PortError, PortResult, TextGenerationService};
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `TextGenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiTextAdapter {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAiTextAdapter {
    /// Creates a new `OpenAiTextAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String, temperature: f32) -> Self {
        Self {
            client,
            model,
            temperature,
        }
    }
}

//=========================================================================================
// `TextGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl TextGenerationService for OpenAiTextAdapter {
    /// Sends one chat completion with a system and a user message and returns
    /// the text of the first choice.
    async fn generate(&self, request: &GenerationRequest) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(request.system.as_str())
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.user.as_str())
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .n(1);
        if request.structured {
            builder.response_format(ResponseFormat::JsonObject);
        }
        let chat_request = builder
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        debug!(model = %self.model, structured = request.structured, "Sending completion request");

        // Call the API and manually map the error if it occurs, which respects the orphan rule.
        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let choice = response.choices.into_iter().next().ok_or_else(|| {
            PortError::Unexpected("Drafting LLM returned no choices in its response.".to_string())
        })?;
        choice.message.content.ok_or_else(|| {
            PortError::Unexpected("Drafting LLM response contained no text content.".to_string())
        })
    }
}
