use async_trait::async_trait;
use log::debug;
use std::error::Error as StdError;
use std::time::Duration;

use super::{ ChatClient, CompletionResponse };
use crate::llm::{ LlmConfig, LlmType };
use crate::models::chat::{ ChatMessage, Role };
use rllm::builder::{ LLMBackend, LLMBuilder };
use rllm::chat::{ ChatMessage as RllmMessage, ChatRole, MessageType };
use rllm::LLMProvider;

/// Providers without an OpenAI-compatible surface, reached through `rllm`.
pub struct HostedChatClient {
    llm_type: LlmType,
    api_key: String,
    model: String,
    base_url: Option<String>,
    timeout: Duration,
}

fn backend_defaults(llm_type: LlmType) -> Result<(LLMBackend, &'static str), String> {
    match llm_type {
        LlmType::Anthropic => Ok((LLMBackend::Anthropic, "claude-3-5-haiku-latest")),
        LlmType::Gemini => Ok((LLMBackend::Google, "gemini-1.5-flash-latest")),
        other => Err(format!("{} is not served by HostedChatClient", other)),
    }
}

/// Splits the request into the builder's system prompt and the turn list.
/// rllm has no system role, so system entries are joined into one preamble.
fn split_system(messages: &[ChatMessage]) -> (Option<String>, Vec<RllmMessage>) {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();

    let turns = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| RllmMessage {
            role: if m.role == Role::Assistant { ChatRole::Assistant } else { ChatRole::User },
            content: m.content.clone(),
            message_type: MessageType::Text,
        })
        .collect();

    let system = if system.is_empty() { None } else { Some(system.join("\n\n")) };
    (system, turns)
}

impl HostedChatClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let (_, default_model) = backend_defaults(config.llm_type)?;
        let api_key = config.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| format!("{} API key is required", config.llm_type))?;

        Ok(Self {
            llm_type: config.llm_type,
            api_key,
            model: config.completion_model.clone().unwrap_or_else(|| default_model.to_string()),
            base_url: config.base_url.clone(),
            timeout: config.timeout,
        })
    }

    fn build_provider(
        &self,
        system: Option<String>
    ) -> Result<Box<dyn LLMProvider + Send + Sync>, Box<dyn StdError + Send + Sync>> {
        let (backend, _) = backend_defaults(self.llm_type)?;
        let mut builder = LLMBuilder::new()
            .backend(backend)
            .api_key(self.api_key.clone())
            .model(&self.model)
            .timeout_seconds(self.timeout.as_secs())
            .stream(false);

        if let Some(url) = &self.base_url {
            builder = builder.base_url(url);
        }
        if let Some(prompt) = system {
            builder = builder.system(prompt);
        }

        Ok(builder.build()?)
    }
}

#[async_trait]
impl ChatClient for HostedChatClient {
    async fn complete(
        &self,
        messages: &[ChatMessage]
    ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>> {
        let (system, turns) = split_system(messages);
        let provider = self.build_provider(system)?;
        debug!("HostedChatClient::complete() → model={} turns={}", self.model, turns.len());

        let resp = provider.chat(&turns).await?;
        let text = resp
            .text()
            .map(|s| s.to_string())
            .unwrap_or_else(|| resp.to_string());
        Ok(CompletionResponse { response: text })
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        self.base_url.clone()
    }
}
