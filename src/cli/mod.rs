use clap::Parser;

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful personal assistant. Be concise and friendly.";

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- History Store Args ---
    /// Conversation store type (file, redis, memory, none)
    #[arg(long, env = "HISTORY_TYPE", default_value = "file")]
    pub history_type: String,

    /// Conversation store location: a directory for `file`, a URL for `redis` (e.g., redis://127.0.0.1:6379)
    #[arg(long, env = "HISTORY_HOST", default_value = "data/conversations")]
    pub history_host: String,

    /// Prefix for Redis conversation keys.
    #[arg(long, env = "HISTORY_REDIS_PREFIX", default_value = "conversation:")]
    pub history_redis_prefix: String,

    // --- Chat LLM Provider Args ---
    /// Type of LLM provider for chat completion (ollama, openai, groq, deepseek, xai, workersai, anthropic, gemini)
    #[arg(long, env = "CHAT_LLM_TYPE", default_value = "ollama")]
    pub chat_llm_type: String,

    /// Base URL for the Chat LLM provider API (e.g., http://localhost:11434 for Ollama)
    #[arg(long, env = "CHAT_BASE_URL")] // No default, let adapters handle defaults if None
    pub chat_base_url: Option<String>,

    /// API Key for the Chat LLM provider (e.g., OpenAI, Anthropic)
    #[arg(long, env = "CHAT_API_KEY", default_value = "")]
    pub chat_api_key: String,

    /// Model name for chat completion (e.g., gpt-4o-mini, llama3.3, @cf/meta/llama-3.3-70b-instruct-fp8-fast)
    #[arg(long, env = "CHAT_MODEL")] // No default, rely on adapter defaults if None
    pub chat_model: Option<String>,

    /// Request timeout in seconds for calls to the Chat LLM provider.
    #[arg(long, env = "CHAT_TIMEOUT_SECS", default_value = "120")]
    pub chat_timeout_secs: u64,

    /// System prompt placed in front of every conversation sent to the model.
    #[arg(long, env = "SYSTEM_PROMPT", default_value = DEFAULT_SYSTEM_PROMPT)]
    pub system_prompt: String,

    /// Conversation key used when a request carries no userId.
    #[arg(long, env = "DEFAULT_USER_ID", default_value = "default-user")]
    pub default_user_id: String,

    // --- General App Args ---
    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,

    /// Host address and port for the server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:8787")]
    pub server_addr: String,

    /// Optional path to the TLS certificate file (PEM format) for enabling HTTPS. Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format) for enabling HTTPS. Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_original_deployment() {
        let args = Args::parse_from(["memory-agent"]);
        assert_eq!(args.default_user_id, "default-user");
        assert_eq!(args.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(args.history_type, "file");
        assert!(!args.enable_tls);
    }

    #[test]
    fn flags_override_defaults() {
        let args = Args::parse_from([
            "memory-agent",
            "--history-type",
            "redis",
            "--history-host",
            "redis://cache:6379/2",
            "--chat-llm-type",
            "groq",
            "--chat-timeout-secs",
            "30",
        ]);
        assert_eq!(args.history_type, "redis");
        assert_eq!(args.history_host, "redis://cache:6379/2");
        assert_eq!(args.chat_llm_type, "groq");
        assert_eq!(args.chat_timeout_secs, 30);
    }
}
