use crate::error::{ModwireError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Finds the module declaration an artifact belongs to.
pub trait ModuleLocator {
    fn find_from(&self, path: &Path) -> Result<PathBuf>;
}

/// Walks up from the artifact's directory and returns the first module file found.
///
/// The search never leaves `root`. Within one directory the lexicographically
/// first matching file name wins. An artifact that is itself a module file
/// belongs to a module of an enclosing directory, so its own directory is
/// skipped.
pub struct NearestModuleLocator {
    root: PathBuf,
    module_suffix: String,
}

impl NearestModuleLocator {
    pub fn new<P: AsRef<Path>>(root: P, module_suffix: impl Into<String>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            module_suffix: module_suffix.into(),
        }
    }

    fn module_in(&self, dir: &Path) -> Option<PathBuf> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(target: "modwire::locator", "skipping {}: {}", dir.display(), e);
                return None;
            }
        };

        let mut candidates: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| self.is_module_name(path))
            .collect();
        candidates.sort();
        candidates.into_iter().next()
    }

    fn is_module_name(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| {
                name.ends_with(&self.module_suffix) && name.len() > self.module_suffix.len()
            })
    }
}

impl ModuleLocator for NearestModuleLocator {
    fn find_from(&self, path: &Path) -> Result<PathBuf> {
        let start = if path.is_dir() {
            path
        } else {
            path.parent().unwrap_or(path)
        };

        let mut dirs = start.ancestors();
        if !path.is_dir() && self.is_module_name(path) {
            debug!(
                target: "modwire::locator",
                "{} is a module file, searching above it",
                path.display()
            );
            dirs.next();
        }

        for dir in dirs {
            if !dir.starts_with(&self.root) {
                break;
            }
            if let Some(module) = self.module_in(dir) {
                debug!(
                    target: "modwire::locator",
                    "resolved {} to {}",
                    path.display(),
                    module.display()
                );
                return Ok(module);
            }
        }

        Err(ModwireError::ModuleNotFound {
            from: path.to_path_buf(),
        })
    }
}
