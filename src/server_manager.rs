use crate::config::GlobalConfig;
use crate::error::{LlmSwapError, Result};
use crate::models::alias::{Alias, BackendKind};
use crate::port_allocator;
use crate::resource_model::{predict, resource_key, ResourceModel, ResourceModelCache};
use crate::resource_probe;
use crate::servers::llamacpp::LlamaCppLifecycle;
use crate::servers::ollama::OllamaLifecycle;
use crate::servers::{BackendLifecycle, Server, ServerStatus};
use std::path::PathBuf;
use tracing::{info, warn};

type MeasureFn = Box<dyn Fn(&Alias) -> Result<ResourceModel> + Send + Sync>;
type SpawnFn = Box<dyn Fn(&Alias, u16) -> Result<Box<dyn BackendLifecycle>> + Send + Sync>;

const EPSILON: f64 = 1e-6;

/// The core scheduler: holds the running-server pool and performs
/// compatibility reuse, resource accounting, eviction and spawn on each
/// admission request. Single-threaded cooperative — callers on distinct
/// tasks must serialise access externally (see `ServerManagerHandle`).
pub struct ServerManager {
    running: Vec<Server>,
    cache: ResourceModelCache,
    pub total_ram_mb: f64,
    pub total_vram_mb: f64,
    measure: MeasureFn,
    spawn: SpawnFn,
}

impl ServerManager {
    pub fn new(global: GlobalConfig) -> Self {
        Self::with_cache_path(global, ResourceModelCache::default_path())
    }

    pub fn with_cache_path(global: GlobalConfig, cache_path: PathBuf) -> Self {
        let global = std::sync::Arc::new(global);
        Self {
            running: Vec::new(),
            cache: ResourceModelCache::load(cache_path),
            total_ram_mb: resource_probe::total_ram_mb(),
            total_vram_mb: resource_probe::total_vram_mb(),
            measure: unimplemented_measure(),
            spawn: default_spawn(global),
        }
    }

    /// Used by tests and embedders that want to swap in a stub resource
    /// model or a mock backend lifecycle, mirroring the Python suite's
    /// monkeypatch of `get_or_measure_resource_model` / `create_server`.
    pub fn new_with_strategy(
        total_ram_mb: f64,
        total_vram_mb: f64,
        cache_path: PathBuf,
        measure: impl Fn(&Alias) -> Result<ResourceModel> + Send + Sync + 'static,
        spawn: impl Fn(&Alias, u16) -> Result<Box<dyn BackendLifecycle>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            running: Vec::new(),
            cache: ResourceModelCache::load(cache_path),
            total_ram_mb,
            total_vram_mb,
            measure: Box::new(measure),
            spawn: Box::new(spawn),
        }
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    pub fn server(&self, idx: usize) -> &Server {
        &self.running[idx]
    }

    /// Stops and removes the server at `idx`, outside the admission path —
    /// used for process-wide teardown (e.g. the `serve` command on exit).
    pub async fn stop_server(&mut self, idx: usize) -> Result<()> {
        let mut server = self.running.remove(idx);
        info!(alias = %server.alias.name, port = server.port, "stopping server");
        server.stop_and_wait().await;
        Ok(())
    }

    pub fn get_or_measure(&mut self, alias: &Alias) -> Result<ResourceModel> {
        measure_and_cache(&mut self.cache, &self.measure, alias)
    }

    /// `request.model == running.model`, `request.command_params ==
    /// running.command_params`, and `request.n_ctx <= running.n_ctx`. The
    /// asymmetry on `n_ctx` is intentional: a server started with a larger
    /// window can serve smaller-window requests; the reverse would require
    /// reloading.
    fn is_compatible(request: &Alias, running: &Alias) -> bool {
        request.model == running.model
            && request.command_params == running.command_params
            && request.n_ctx <= running.n_ctx
    }

    async fn current_usage(&mut self) -> Result<(f64, f64)> {
        let mut total_r = 0.0;
        let mut total_v = 0.0;
        for server in self.running.iter_mut() {
            if !server.check_running().await {
                continue;
            }
            let model = measure_and_cache(&mut self.cache, &self.measure, &server.alias)?;
            let (r, v) = predict(model, server.alias.n_ctx);
            total_r += r;
            total_v += v;
        }
        Ok((total_r, total_v))
    }

    /// Greedy max-ratio selection over `running` candidates. Returns the
    /// ports to evict, in the order they were selected.
    fn select_eviction(&self, deficit_r: f64, deficit_v: f64) -> Result<Vec<u16>> {
        let mut candidates: Vec<(f64, u16, f64, f64)> = Vec::new();
        for server in &self.running {
            if server.status != ServerStatus::Running {
                continue;
            }
            let key = resource_key(&server.alias);
            let Some(model) = self.cache.get(&key) else {
                // A running server must already have a measured model
                // (it was admitted through get_or_measure); absence here
                // means accounting has diverged from reality.
                warn!(alias = %server.alias.name, "running server has no cached resource model");
                continue;
            };
            let (r_i, v_i) = predict(model, server.alias.n_ctx);
            let w_i = (r_i / deficit_r.max(EPSILON)).max(v_i / deficit_v.max(EPSILON));
            candidates.push((w_i, server.port, r_i, v_i));
        }

        candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut selected = Vec::new();
        let mut r_total = 0.0;
        let mut v_total = 0.0;
        for (_, port, r_i, v_i) in candidates {
            selected.push(port);
            r_total += r_i;
            v_total += v_i;
            if r_total >= deficit_r && v_total >= deficit_v {
                break;
            }
        }

        if r_total < deficit_r || v_total < deficit_v {
            return Err(LlmSwapError::EvictionImpossible);
        }
        Ok(selected)
    }

    async fn evict(&mut self, ports: &[u16]) {
        for &port in ports {
            if let Some(idx) = self.running.iter().position(|s| s.port == port) {
                let mut server = self.running.remove(idx);
                info!(alias = %server.alias.name, port, "evicting server");
                server.stop_and_wait().await;
            }
        }
    }

    /// Reuse -> predict -> account -> evict-if-needed -> refuse-if-still-
    /// short -> spawn. Returns the index of the server serving `alias`;
    /// stable identity within this manager as long as no eviction removes
    /// it, standing in for the source's object identity.
    pub async fn get_or_start_server(&mut self, alias: &Alias) -> Result<usize> {
        for (idx, server) in self.running.iter_mut().enumerate() {
            if server.check_running().await && Self::is_compatible(alias, &server.alias) {
                return Ok(idx);
            }
        }

        let model = self.get_or_measure(alias)?;
        let (r_need, v_need) = predict(model, alias.n_ctx);

        let (r_used, v_used) = self.current_usage().await?;
        let mut r_free = self.total_ram_mb - r_used;
        let mut v_free = self.total_vram_mb - v_used;

        if r_free < r_need || v_free < v_need {
            let ports = self.select_eviction(r_need - r_free, v_need - v_free)?;
            self.evict(&ports).await;

            let (r_used, v_used) = self.current_usage().await?;
            r_free = self.total_ram_mb - r_used;
            v_free = self.total_vram_mb - v_used;
        }

        if r_free < r_need || v_free < v_need {
            return Err(LlmSwapError::InfeasibleRequest);
        }

        let claimed: Vec<u16> = self.running.iter().map(|s| s.port).collect();
        let port = port_allocator::allocate(alias.model.backend, &claimed)?;
        let lifecycle = (self.spawn)(alias, port)?;
        let mut server = Server::new(alias.clone(), port, lifecycle);
        server.start_and_wait().await?;
        self.running.push(server);
        Ok(self.running.len() - 1)
    }
}

fn measure_and_cache(cache: &mut ResourceModelCache, measure: &MeasureFn, alias: &Alias) -> Result<ResourceModel> {
    let key = resource_key(alias);
    if let Some(model) = cache.get(&key) {
        return Ok(model);
    }
    let model = measure(alias)?;
    cache.insert_and_persist(key, model);
    Ok(model)
}

fn unimplemented_measure() -> MeasureFn {
    Box::new(|alias: &Alias| {
        Err(LlmSwapError::Config(format!(
            "resource model measurement not implemented for alias '{}'",
            alias.name
        )))
    })
}

fn default_spawn(global: std::sync::Arc<GlobalConfig>) -> SpawnFn {
    Box::new(move |alias: &Alias, port: u16| -> Result<Box<dyn BackendLifecycle>> {
        match alias.model.backend {
            BackendKind::Llamacpp => Ok(Box::new(LlamaCppLifecycle::new(alias, port, &global)?)),
            BackendKind::Ollama => Ok(Box::new(OllamaLifecycle::new(alias, port)?)),
        }
    })
}
