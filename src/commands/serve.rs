use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::alias_registry::AliasRegistry;
use crate::client::ProxyClient;
use crate::config::GlobalConfig;
use crate::server_manager::ServerManager;

/// Keeps one `ServerManager` alive for the process lifetime and serves
/// `alias: prompt` lines from stdin until EOF or Ctrl-C, tearing down every
/// running backend on exit. This is the one command whose manager
/// accumulates running servers across more than a single request.
pub async fn execute() -> Result<()> {
    let registry = AliasRegistry::load_default().context("loading alias registry")?;
    let global = GlobalConfig::load().context("loading global configuration")?;
    let manager = ServerManager::new(global);
    let mut client = ProxyClient::new(registry, manager);

    info!(
        aliases = client.registry().len(),
        "llmswap serving; send lines as \"<alias>: <prompt>\", Ctrl-C to stop"
    );

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("received interrupt, shutting down");
                break;
            }
            line = lines.next_line() => {
                match line? {
                    Some(line) => handle_line(&mut client, &line).await,
                    None => break,
                }
            }
        }
    }

    shutdown(&mut client).await;
    Ok(())
}

async fn handle_line(client: &mut ProxyClient, line: &str) {
    let Some((alias, prompt)) = line.split_once(':') else {
        eprintln!("expected \"<alias>: <prompt>\", got: {line}");
        return;
    };
    let (alias, prompt) = (alias.trim(), prompt.trim());

    let body = serde_json::json!({
        "messages": [{"role": "user", "content": prompt}],
        "stream": false,
    });

    match client.chat_completion(alias, body).await {
        Ok(response) => {
            let content = response["choices"][0]["message"]["content"]
                .as_str()
                .unwrap_or("(no content in response)");
            println!("{content}");
        }
        Err(err) => eprintln!("error: {err}"),
    }
}

async fn shutdown(client: &mut ProxyClient) {
    let manager = client.manager_mut();
    let count = manager.running_count();
    for idx in (0..count).rev() {
        let _ = manager.stop_server(idx).await;
    }
}
