use crate::models::alias::{Alias, BackendKind};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// `(r0, r1, v0, v1)`: predicted RAM at context `x` is `r0 + r1*x`,
/// predicted VRAM is `v0 + v1*x`.
pub type ResourceModel = (f64, f64, f64, f64);

/// Keys the model by everything that changes the footprint of a load
/// except `n_ctx`, which is the affine model's free variable.
pub type ResourceKey = (BackendKind, String, Vec<String>);

pub fn resource_key(alias: &Alias) -> ResourceKey {
    (alias.model.backend, alias.model.model_id.clone(), alias.command_params.clone())
}

pub fn predict(model: ResourceModel, n_ctx: u32) -> (f64, f64) {
    let (r0, r1, v0, v1) = model;
    let x = n_ctx as f64;
    (r0 + r1 * x, v0 + v1 * x)
}

/// Persistent mapping from `ResourceKey` to `ResourceModel`, synchronously
/// rewritten to disk on each new measurement. Load is tolerant of anything
/// short of a directory-creation failure: an unknown backend, a malformed
/// entry, a missing file or an IO error all degrade to an empty in-memory
/// cache rather than aborting startup.
pub struct ResourceModelCache {
    path: PathBuf,
    models: HashMap<ResourceKey, ResourceModel>,
}

impl ResourceModelCache {
    pub fn load(path: PathBuf) -> Self {
        let models = Self::try_load(&path).unwrap_or_default();
        Self { path, models }
    }

    pub fn default_path() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("llmswap")
            .join("resource_measurements.json")
    }

    fn try_load(path: &Path) -> Option<HashMap<ResourceKey, ResourceModel>> {
        let content = std::fs::read_to_string(path).ok()?;
        let raw: HashMap<String, Value> = serde_json::from_str(&content).ok()?;
        let mut models = HashMap::new();
        for (key_str, value) in raw {
            let Some((backend, model_id, params)) = parse_key(&key_str) else {
                continue;
            };
            let Some(tuple) = parse_model(&value) else {
                continue;
            };
            models.insert((backend, model_id, params), tuple);
        }
        Some(models)
    }

    pub fn get(&self, key: &ResourceKey) -> Option<ResourceModel> {
        self.models.get(key).copied()
    }

    /// Install a freshly-measured model and synchronously persist the
    /// whole cache. Errors during persistence are swallowed: the
    /// resource-cache layer never raises.
    pub fn insert_and_persist(&mut self, key: ResourceKey, model: ResourceModel) {
        self.models.insert(key, model);
        self.persist();
    }

    fn persist(&self) {
        let mut data = serde_json::Map::new();
        for ((backend, model_id, params), (r0, r1, v0, v1)) in &self.models {
            let key_str = format!("{backend}::{model_id}::{}", params.join(","));
            data.insert(key_str, serde_json::json!([r0, r1, v0, v1]));
        }
        let Some(parent) = self.path.parent() else { return };
        if std::fs::create_dir_all(parent).is_err() {
            return;
        }
        if let Ok(content) = serde_json::to_string(&data) {
            let _ = std::fs::write(&self.path, content);
        }
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

fn parse_key(key_str: &str) -> Option<(BackendKind, String, Vec<String>)> {
    let parts: Vec<&str> = key_str.splitn(3, "::").collect();
    if parts.len() != 3 {
        return None;
    }
    let backend: BackendKind = parts[0].parse().ok()?;
    let model_id = parts[1].to_string();
    let params = if parts[2].is_empty() {
        vec![]
    } else {
        parts[2].split(',').map(str::to_string).collect()
    };
    Some((backend, model_id, params))
}

fn parse_model(value: &Value) -> Option<ResourceModel> {
    let arr = value.as_array()?;
    if arr.len() != 4 {
        return None;
    }
    let mut nums = [0.0_f64; 4];
    for (slot, v) in nums.iter_mut().zip(arr) {
        *slot = v.as_f64()?;
    }
    Some((nums[0], nums[1], nums[2], nums[3]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> ResourceKey {
        (BackendKind::Llamacpp, "mistral-7b".into(), vec!["--x".into()])
    }

    #[test]
    fn missing_file_degrades_to_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResourceModelCache::load(dir.path().join("nope.json"));
        assert!(cache.is_empty());
    }

    #[test]
    fn malformed_json_degrades_to_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "not json at all {{{").unwrap();
        let cache = ResourceModelCache::load(path);
        assert!(cache.is_empty());
    }

    #[test]
    fn unknown_backend_entry_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, r#"{"vllm::foo::": [1,2,3,4]}"#).unwrap();
        let cache = ResourceModelCache::load(path);
        assert!(cache.is_empty());
    }

    #[test]
    fn malformed_tuple_length_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, r#"{"llamacpp::m::": [1,2,3]}"#).unwrap();
        let cache = ResourceModelCache::load(path);
        assert!(cache.is_empty());
    }

    #[test]
    fn round_trips_through_persist_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let mut cache = ResourceModelCache::load(path.clone());
        cache.insert_and_persist(key(), (100.0, 0.1, 200.0, 0.2));

        let reloaded = ResourceModelCache::load(path);
        assert_eq!(reloaded.get(&key()), Some((100.0, 0.1, 200.0, 0.2)));
    }

    #[test]
    fn predict_applies_affine_model() {
        let (r, v) = predict((100.0, 0.1, 200.0, 0.2), 2048);
        assert!((r - 304.8).abs() < 1e-9);
        assert!((v - 609.6).abs() < 1e-9);
    }
}
