use crate::error::{ModwireError, Result};
use clap::ValueEnum;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// Kind of generated artifact, which decides the registration list it joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactCategory {
    Component,
    Controller,
    Module,
}

impl ArtifactCategory {
    pub const ALL: [ArtifactCategory; 3] = [
        ArtifactCategory::Component,
        ArtifactCategory::Controller,
        ArtifactCategory::Module,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ArtifactCategory::Component => "component",
            ArtifactCategory::Controller => "controller",
            ArtifactCategory::Module => "module",
        }
    }

    /// Registration key used when no override is configured.
    pub fn default_key(&self) -> &'static str {
        match self {
            ArtifactCategory::Component => "components",
            ArtifactCategory::Controller => "controllers",
            ArtifactCategory::Module => "modules",
        }
    }
}

impl fmt::Display for ArtifactCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ArtifactCategory {
    type Err = ModwireError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        ArtifactCategory::ALL
            .into_iter()
            .find(|category| category.name() == normalized)
            .ok_or_else(|| {
                ModwireError::Config(format!(
                    "Unknown artifact category '{}'. Expected one of: component, controller, module",
                    s
                ))
            })
    }
}

/// Lookup table from category to the configuration-property key of its list.
#[derive(Debug, Clone, Default)]
pub struct CategoryKeys {
    overrides: HashMap<ArtifactCategory, String>,
}

impl CategoryKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the table from `category = "key"` pairs read from configuration.
    pub fn with_overrides(raw: &BTreeMap<String, String>) -> Result<Self> {
        let mut keys = Self::new();
        for (category, key) in raw {
            let category: ArtifactCategory = category.parse()?;
            keys.set(category, key)?;
        }
        Ok(keys)
    }

    pub fn set(&mut self, category: ArtifactCategory, key: &str) -> Result<()> {
        let key = key.trim();
        if !is_identifier(key) {
            return Err(ModwireError::Config(format!(
                "Registration key '{}' for {} is not a valid property name",
                key, category
            )));
        }
        self.overrides.insert(category, key.to_string());
        Ok(())
    }

    pub fn key_for(&self, category: ArtifactCategory) -> &str {
        self.overrides
            .get(&category)
            .map(String::as_str)
            .unwrap_or_else(|| category.default_key())
    }
}

/// True for plain identifiers usable as class names and property keys.
pub fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}
