use crate::models::alias::Alias;
use thiserror::Error;

/// Error surface for everything below the CLI boundary. `main.rs` and
/// `commands/*` convert these into `anyhow::Error` at the edge.
#[derive(Debug, Error)]
pub enum LlmSwapError {
    #[error("alias '{0}' not found")]
    AliasNotFound(String),

    #[error("alias '{name}' already registered with a different configuration:\nexisting: {existing:?}\nnew: {new:?}", name = existing.name)]
    DuplicateAliasConflict { existing: Box<Alias>, new: Box<Alias> },

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("server did not become ready within {0:.1}s")]
    ReadinessTimeout(f64),

    #[error("ollama API did not become ready within {0:.1}s")]
    ApiReadinessTimeout(f64),

    #[error("model did not warm up within {0:.1}s")]
    WarmupTimeout(f64),

    #[error("no free port available for backend {0:?}")]
    NoFreePort(crate::models::alias::BackendKind),

    #[error("no combination of running servers can be evicted to satisfy resource requirements")]
    EvictionImpossible,

    #[error("no combination of servers can satisfy resource requirements")]
    InfeasibleRequest,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, LlmSwapError>;
