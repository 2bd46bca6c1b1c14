use crate::config::{GlobalConfig, ProjectConfig};
use crate::error::{LlmSwapError, Result};
use crate::models::alias::Alias;
use std::collections::HashMap;

/// Mapping `name -> Alias`, populated once at startup from a global and a
/// project configuration source. Silent override would make reproducibility
/// depend on load order, so a name collision is only accepted when the two
/// bodies are structurally identical.
#[derive(Debug, Default)]
pub struct AliasRegistry {
    aliases: HashMap<String, Alias>,
}

impl AliasRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the global config first, then the project config, applying
    /// `add` to each alias in turn.
    pub fn load_default() -> Result<Self> {
        let global = GlobalConfig::load()?;
        let project = ProjectConfig::load()?;
        Self::from_sources(global.get_aliases(), project.get_aliases())
    }

    pub fn from_sources(global: Vec<Alias>, project: Vec<Alias>) -> Result<Self> {
        let mut registry = Self::new();
        for alias in global.into_iter().chain(project) {
            registry.add(alias)?;
        }
        Ok(registry)
    }

    pub fn add(&mut self, alias: Alias) -> Result<()> {
        match self.aliases.get(&alias.name) {
            Some(existing) if existing != &alias => Err(LlmSwapError::DuplicateAliasConflict {
                existing: Box::new(existing.clone()),
                new: Box::new(alias),
            }),
            Some(_) => Ok(()),
            None => {
                self.aliases.insert(alias.name.clone(), alias);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Result<&Alias> {
        self.aliases
            .get(name)
            .ok_or_else(|| LlmSwapError::AliasNotFound(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Alias> {
        self.aliases.values()
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}
