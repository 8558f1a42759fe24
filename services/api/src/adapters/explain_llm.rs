//! services/api/src/adapters/explain_llm.rs
//!
//! This module contains the adapter for the concept-explaining LLM.
//! It implements the `ExplanationGenerationService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    error::OpenAIError,
    Client,
};
use async_trait::async_trait;
use interview_prep_core::ports::{ExplanationGenerationService, PortError, PortResult};

use crate::prompts::concept_explain_prompt;

const SYSTEM_INSTRUCTIONS: &str =
    "You explain technical interview concepts. Follow the formatting rules in the \
     user prompt exactly and respond with a single JSON object only.";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ExplanationGenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiExplainAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiExplainAdapter {
    /// Creates a new `OpenAiExplainAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `ExplanationGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ExplanationGenerationService for OpenAiExplainAdapter {
    async fn generate_explanation(&self, question: &str) -> PortResult<String> {
        let prompt = concept_explain_prompt(question);

        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_INSTRUCTIONS)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        if let Some(choice) = response.choices.into_iter().next() {
            if let Some(content) = choice.message.content {
                Ok(content)
            } else {
                Err(PortError::Unexpected(
                    "Explanation LLM response contained no text content.".to_string(),
                ))
            }
        } else {
            Err(PortError::Unexpected(
                "Explanation LLM returned no choices in its response.".to_string(),
            ))
        }
    }
}
