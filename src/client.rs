use crate::alias_registry::AliasRegistry;
use crate::error::{LlmSwapError, Result};
use crate::server_manager::ServerManager;
use serde_json::Value;

/// Resolves an alias through the registry, ensures a compatible server is
/// admitted via the manager, then forwards the request body to that
/// server's OpenAI-compatible `/v1/chat/completions` endpoint. Each call is
/// independent: there is no persistent connection or session state here,
/// only the lazily-started backend underneath.
pub struct ProxyClient {
    registry: AliasRegistry,
    manager: ServerManager,
    http: reqwest::Client,
}

impl ProxyClient {
    pub fn new(registry: AliasRegistry, manager: ServerManager) -> Self {
        Self {
            registry,
            manager,
            http: reqwest::Client::new(),
        }
    }

    /// Looks up `alias_name`, starts or reuses its backend, and relays
    /// `body` (an OpenAI chat-completion request, `model` field ignored and
    /// overwritten) to it. Returns the backend's raw JSON response.
    pub async fn chat_completion(&mut self, alias_name: &str, mut body: Value) -> Result<Value> {
        let alias = self.registry.get(alias_name)?.clone();
        let idx = self.manager.get_or_start_server(&alias).await?;
        let port = self.manager.server(idx).port;

        if let Some(obj) = body.as_object_mut() {
            obj.insert("model".to_string(), Value::String(alias.model.model_id.clone()));
        }

        let url = format!("http://localhost:{port}/v1/chat/completions");
        let response = self.http.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(LlmSwapError::Config(format!(
                "backend for alias '{}' returned HTTP {}",
                alias_name,
                response.status()
            )));
        }
        Ok(response.json::<Value>().await?)
    }

    pub fn registry(&self) -> &AliasRegistry {
        &self.registry
    }

    pub fn manager(&self) -> &ServerManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut ServerManager {
        &mut self.manager
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GlobalConfig;
    use crate::models::alias::{Alias, BackendKind};
    use crate::resource_model::ResourceModel;

    fn manager() -> ServerManager {
        ServerManager::new_with_strategy(
            8192.0,
            8192.0,
            std::env::temp_dir().join(format!("llmswap-client-test-{}.json", line!())),
            |_alias| -> Result<ResourceModel> { Ok((100.0, 0.0, 0.0, 0.0)) },
            |_alias, _port| {
                Ok(Box::new(crate::servers::test_support::MockLifecycle::new())
                    as Box<dyn crate::servers::BackendLifecycle>)
            },
        )
    }

    #[test]
    fn unknown_alias_is_rejected_before_any_spawn() {
        let registry = AliasRegistry::new();
        let mut client = ProxyClient::new(registry, manager());
        let result = tokio::runtime::Runtime::new()
            .unwrap()
            .block_on(client.chat_completion("missing", serde_json::json!({})));
        assert!(matches!(result, Err(LlmSwapError::AliasNotFound(_))));
    }

    #[test]
    fn global_config_round_trips_through_registry_construction() {
        let global = GlobalConfig::default();
        let alias = Alias::new("fast", "llama2", BackendKind::Ollama, 4096, vec![]);
        let registry = AliasRegistry::from_sources(vec![alias.clone()], vec![]).unwrap();
        assert_eq!(registry.get("fast").unwrap(), &alias);
        let _ = global;
    }
}
