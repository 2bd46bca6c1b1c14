use anyhow::{Context, Result};

use crate::alias_registry::AliasRegistry;
use crate::client::ProxyClient;
use crate::config::GlobalConfig;
use crate::server_manager::ServerManager;

/// One-shot chat completion against `alias`, grounded in the source's
/// `LazyLlama` convenience wrapper: the backend is started or reused on
/// demand, the response printed, and the process exits. No conversation
/// state is kept across invocations.
pub async fn execute(alias: &str, prompt: &str) -> Result<()> {
    let registry = AliasRegistry::load_default()?;
    let global = GlobalConfig::load()?;
    let manager = ServerManager::new(global);
    let mut client = ProxyClient::new(registry, manager);

    let body = serde_json::json!({
        "messages": [{"role": "user", "content": prompt}],
        "stream": false,
    });

    let response = client
        .chat_completion(alias, body)
        .await
        .context("request to backend failed")?;

    let content = response["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or("(no content in response)");

    println!("{}", content);

    Ok(())
}
