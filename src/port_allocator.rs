use crate::error::{LlmSwapError, Result};
use crate::models::alias::BackendKind;
use std::net::TcpListener;

const SCAN_RANGE: u16 = 100;

fn default_port(backend: BackendKind) -> u16 {
    match backend {
        BackendKind::Llamacpp => 8000,
        BackendKind::Ollama => 11434,
    }
}

/// Returns a free TCP port for `backend`: starting from its default base,
/// scan forward up to `SCAN_RANGE` candidates. A candidate is accepted iff
/// no port already in `claimed` matches it and a transient bind to
/// `localhost:port` succeeds.
pub fn allocate(backend: BackendKind, claimed: &[u16]) -> Result<u16> {
    let base = default_port(backend);
    for offset in 0..SCAN_RANGE {
        let port = base + offset;
        if claimed.contains(&port) {
            continue;
        }
        if TcpListener::bind(("127.0.0.1", port)).is_ok() {
            return Ok(port);
        }
    }
    Err(LlmSwapError::NoFreePort(backend))
}
