use anyhow::Result;
use colored::Colorize;

use crate::config::GlobalConfig;
use crate::server_manager::ServerManager;

/// Reports the running set of the manager instance backing this process.
/// Absent a daemon/IPC protocol (not part of this system — each CLI
/// invocation owns its own manager), a one-shot `status` call mostly shows
/// capacity; `serve` is the command whose manager accumulates running
/// servers across a session.
pub async fn execute() -> Result<()> {
    let global = GlobalConfig::load()?;
    let manager = ServerManager::new(global);

    println!("{}", "Server Manager Status:".green().bold());
    println!(
        "  capacity: {:.0} MB RAM, {:.0} MB VRAM",
        manager.total_ram_mb, manager.total_vram_mb
    );
    println!();

    if manager.running_count() == 0 {
        println!("  {}", "(no servers running in this process)".dimmed());
        return Ok(());
    }

    for idx in 0..manager.running_count() {
        let server = manager.server(idx);
        println!(
            "  {} {} {} port {} {}",
            "●".green(),
            server.alias.name.bold(),
            format!("({})", server.alias.model.backend).dimmed(),
            server.port,
            format!("{:?}", server.status).to_lowercase()
        );
    }
    println!();

    Ok(())
}
