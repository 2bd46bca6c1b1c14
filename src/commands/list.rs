use anyhow::Result;
use colored::Colorize;

use crate::alias_registry::AliasRegistry;
use crate::models::alias::BackendKind;

pub fn execute() -> Result<()> {
    let registry = AliasRegistry::load_default()?;

    if registry.is_empty() {
        println!("{}", "No aliases configured.".yellow());
        return Ok(());
    }

    for backend in [BackendKind::Llamacpp, BackendKind::Ollama] {
        let mut aliases: Vec<_> = registry.iter().filter(|a| a.model.backend == backend).collect();
        if aliases.is_empty() {
            continue;
        }
        aliases.sort_by(|a, b| a.name.cmp(&b.name));

        println!("{}", format!("{backend}").green().bold());
        for alias in aliases {
            println!(
                "  {} {} {}",
                "→".cyan(),
                alias.name.bold(),
                format!("({}, ctx={})", alias.model.model_id, alias.n_ctx).dimmed()
            );
        }
        println!();
    }

    Ok(())
}
