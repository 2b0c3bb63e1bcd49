pub mod models;
pub mod server;
pub mod llm;
pub mod cli;
pub mod history;

use cli::Args;
use history::initialize_history_store;
use llm::chat::new_client as new_chat_client;
use llm::LlmConfig;
use log::info;
use server::api::AppState;
use server::Server;
use std::error::Error;
use std::time::Duration;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("History Store Type: {}", args.history_type);
    info!("History Store Host: {}", args.history_host);
    info!("Chat LLM Type: {}", args.chat_llm_type);
    info!("Chat Timeout: {}s", args.chat_timeout_secs);
    info!("Default User Id: {}", args.default_user_id);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let store = initialize_history_store(&args)?;

    let chat_config = LlmConfig {
        llm_type: args.chat_llm_type.parse()?,
        base_url: args.chat_base_url.clone().filter(|u| !u.trim().is_empty()),
        api_key: Some(args.chat_api_key.clone()).filter(|k| !k.is_empty()),
        completion_model: args.chat_model.clone().filter(|m| !m.trim().is_empty()),
        timeout: Duration::from_secs(args.chat_timeout_secs),
    };
    let chat_client = new_chat_client(&chat_config)?;
    info!(
        "Chat client configured: Type={}, Model={}, BaseURL={}",
        chat_config.llm_type,
        chat_client.get_model(),
        chat_client.get_base_url().as_deref().unwrap_or("adapter default")
    );

    let state = AppState::new(store, chat_client, &args.system_prompt, &args.default_user_id);
    let server = Server::new(args.server_addr.clone(), state, args.clone());
    server.run().await
}
