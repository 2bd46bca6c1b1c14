use anyhow::Result;
use colored::Colorize;

use crate::config::{GlobalConfig, ProjectConfig};

pub fn execute(show_path: bool) -> Result<()> {
    if show_path {
        println!("global: {}", GlobalConfig::path()?.display());
        println!("project: {}", ProjectConfig::path()?.display());
        return Ok(());
    }

    let global = GlobalConfig::load()?;
    let project = ProjectConfig::load()?;

    println!("{}", "llmswap Configuration:".green().bold());
    println!();
    println!("{} {}", "Global config:".cyan(), GlobalConfig::path()?.display());
    println!("{}", serde_yaml::to_string(&global)?);
    println!("{} {}", "Project config:".cyan(), ProjectConfig::path()?.display());
    println!("{}", serde_yaml::to_string(&project)?);

    Ok(())
}
