use async_trait::async_trait;
use log::debug;
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::{ Deserialize, Serialize };
use std::error::Error as StdError;
use std::time::Duration;

use super::{ ChatClient, CompletionResponse };
use crate::llm::{ LlmConfig, LlmType };
use crate::models::chat::ChatMessage;

const COMPLETIONS_ROUTE: &str = "/chat/completions";

/// Client for any provider that speaks the OpenAI chat-completions dialect
/// (OpenAI, Groq, DeepSeek, xAI, Cloudflare Workers AI).
pub struct OpenAIChatClient {
    http: HttpClient,
    provider: LlmType,
    model: String,
    endpoint: String,
}

#[derive(Serialize)]
struct OpenAIChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Deserialize)]
struct OpenAIMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Default API root and model for each OpenAI-compatible provider.
/// Workers AI has no usable default root: the URL embeds the account id.
fn provider_defaults(provider: LlmType) -> (Option<&'static str>, &'static str) {
    match provider {
        LlmType::Groq => (Some("https://api.groq.com/openai/v1"), "llama-3.3-70b-versatile"),
        LlmType::DeepSeek => (Some("https://api.deepseek.com/v1"), "deepseek-chat"),
        LlmType::XAI => (Some("https://api.x.ai/v1"), "grok-2-latest"),
        LlmType::WorkersAI => (None, "@cf/meta/llama-3.3-70b-instruct-fp8-fast"),
        _ => (Some("https://api.openai.com/v1"), "gpt-4o-mini"),
    }
}

fn completions_endpoint(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.ends_with(COMPLETIONS_ROUTE) {
        base.to_string()
    } else {
        format!("{}{}", base, COMPLETIONS_ROUTE)
    }
}

impl OpenAIChatClient {
    pub fn new(
        provider: LlmType,
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
        timeout: Duration
    ) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let (default_base, default_model) = provider_defaults(provider);
        let chat_model = model.unwrap_or_else(|| default_model.to_string());
        let api_url = base_url
            .or_else(|| default_base.map(str::to_string))
            .ok_or_else(|| format!("{} requires CHAT_BASE_URL to be set", provider))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| format!("Invalid API key format: {}", e))?
        );

        let http = HttpClient::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| Box::new(e) as Box<dyn StdError + Send + Sync>)?;

        Ok(Self {
            http,
            provider,
            model: chat_model,
            endpoint: completions_endpoint(&api_url),
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let api_key = config.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| format!("{} API key is required", config.llm_type))?;

        Self::new(
            config.llm_type,
            api_key,
            config.completion_model.clone(),
            config.base_url.clone(),
            config.timeout,
        )
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn complete(
        &self,
        messages: &[ChatMessage]
    ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>> {
        let req = OpenAIChatRequest {
            model: &self.model,
            messages,
        };
        debug!("{} chat → {} model={} messages={}", self.provider, self.endpoint, self.model, messages.len());

        let resp = self.http.post(&self.endpoint)
            .json(&req)
            .send()
            .await?
            .error_for_status()?
            .json::<OpenAIResponse>()
            .await?;

        let content = resp.choices
            .into_iter()
            .next()
            .ok_or_else(|| format!("No response from {} API", self.provider))?
            .message.content
            .unwrap_or_default();

        Ok(CompletionResponse { response: content })
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.endpoint.clone())
    }
}
