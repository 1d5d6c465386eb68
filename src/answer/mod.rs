//! Answer generation for viewer questions.
//!
//! Answers are written to be read aloud: short, conversational, and free of
//! visual references, because the listener may not be able to see the video.

use crate::error::{Result, TolkError};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// System prompt for accessibility-first sports commentary.
const SYSTEM_PROMPT: &str = "\
You are a friendly, casual sports companion helping someone follow a live event.

RESPOND IN 2-3 SHORT SENTENCES MAXIMUM. Be brief and conversational like texting a friend.

Key rules:
- Keep it SHORT - this is a live event, don't make them miss action
- Be warm and casual, like a friend explaining the sport
- Never say \"as you can see\" or visual references
- If explaining rules, give the simplest version
- Sound natural - your response will be read aloud

Keep answers friendly, brief, and helpful!";

/// Generates an accessibility-friendly answer from a question plus context.
#[async_trait]
pub trait AnswerEngine: Send + Sync {
    async fn answer(&self, question: &str, context: &str) -> Result<String>;
}

/// Chat-completion backed answer engine.
pub struct ChatAnswerer {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl ChatAnswerer {
    pub fn new(model: &str, temperature: f32) -> Self {
        Self {
            client: create_client(),
            model: model.to_string(),
            temperature,
        }
    }
}

#[async_trait]
impl AnswerEngine for ChatAnswerer {
    #[instrument(skip(self, context), fields(question = %question))]
    async fn answer(&self, question: &str, context: &str) -> Result<String> {
        let user_prompt = format!(
            "Context:\n{}\n\nQuestion: {}\n\nAnswer briefly (2-3 sentences max):",
            context, question
        );

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_PROMPT)
                .build()
                .map_err(|e| TolkError::Answer(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_prompt)
                .build()
                .map_err(|e| TolkError::Answer(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(|e| TolkError::Answer(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| TolkError::OpenAI(format!("Failed to generate answer: {}", e)))?;

        let answer = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| TolkError::Answer("Empty response from model".to_string()))?
            .trim()
            .to_string();

        debug!("Generated {} character answer", answer.len());
        Ok(answer)
    }
}
