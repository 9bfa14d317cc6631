use crate::asset::CategoryKeys;
use crate::error::{ModwireError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "modwire.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStyle {
    Single,
    Double,
}

impl QuoteStyle {
    pub fn as_char(&self) -> char {
        match self {
            QuoteStyle::Single => '\'',
            QuoteStyle::Double => '"',
        }
    }
}

/// Project-level settings read from `modwire.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModwireConfig {
    pub decorator: String,
    pub module_suffix: String,
    pub lock_suffix: String,
    pub indent_width: usize,
    pub quote: QuoteStyle,
    pub source_extensions: Vec<String>,
    pub categories: BTreeMap<String, String>,
}

impl Default for ModwireConfig {
    fn default() -> Self {
        Self {
            decorator: "Module".to_string(),
            module_suffix: ".module.ts".to_string(),
            lock_suffix: ".lock".to_string(),
            indent_width: 2,
            quote: QuoteStyle::Single,
            source_extensions: ["ts", "tsx", "js", "jsx", "mts", "cts"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            categories: BTreeMap::new(),
        }
    }
}

impl ModwireConfig {
    /// Loads `modwire.toml` from the project directory, falling back to defaults.
    pub fn load<P: AsRef<Path>>(project_path: P) -> Result<Self> {
        let path = project_path.as_ref().join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            ModwireError::Config(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: ModwireConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !crate::asset::is_identifier(&self.decorator) {
            return Err(ModwireError::Config(format!(
                "decorator '{}' is not a valid identifier",
                self.decorator
            )));
        }
        if self.module_suffix.trim().is_empty() {
            return Err(ModwireError::Config("module_suffix may not be empty".into()));
        }
        if self.lock_suffix.trim().is_empty() || self.lock_suffix.contains(['/', '\\']) {
            return Err(ModwireError::Config(format!(
                "lock_suffix '{}' must be a non-empty file name suffix",
                self.lock_suffix
            )));
        }
        if self.indent_width == 0 {
            return Err(ModwireError::Config("indent_width must be at least 1".into()));
        }
        self.category_keys()?;
        Ok(())
    }

    pub fn category_keys(&self) -> Result<CategoryKeys> {
        CategoryKeys::with_overrides(&self.categories)
    }

    pub fn indent_unit(&self) -> String {
        " ".repeat(self.indent_width)
    }
}
