use crate::error::{ModwireError, Result};
use std::path::{Path, PathBuf};

/// System trees a project root may never point into.
const SYSTEM_DIRS: &[&str] = &["/etc", "/sys", "/proc", "/dev", "/boot"];

/// Confines module lookups and artifact paths to one project directory.
pub struct PathValidator;

impl PathValidator {
    /// Canonicalises the project root the module search is confined to.
    ///
    /// Filesystem roots and system directories are refused.
    pub fn validate_project_path(path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();

        let root = path.canonicalize().map_err(|e| {
            ModwireError::ProjectValidation(format!(
                "Invalid project directory '{}': {e}",
                path.display()
            ))
        })?;

        if !root.is_dir() {
            return Err(ModwireError::ProjectValidation(format!(
                "Project path '{}' is not a directory",
                root.display()
            )));
        }

        if root.parent().is_none() {
            return Err(ModwireError::ProjectValidation(format!(
                "Project directory '{}' is a filesystem root",
                root.display()
            )));
        }

        let system_dir = SYSTEM_DIRS.iter().map(Path::new).find(|dir| {
            root.starts_with(dir)
                || dir
                    .canonicalize()
                    .is_ok_and(|canonical| root.starts_with(canonical))
        });
        if let Some(dir) = system_dir {
            return Err(ModwireError::ProjectValidation(format!(
                "Project directory '{}' lies inside system directory '{}'",
                root.display(),
                dir.display()
            )));
        }

        Ok(root)
    }

    /// Resolves an artifact path inside the project root.
    ///
    /// Relative paths are taken relative to `project_root`. The artifact itself
    /// may not exist yet; its parent directory must.
    pub fn validate_artifact_path(
        artifact_path: impl AsRef<Path>,
        project_root: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        let project_root = project_root.as_ref();
        // Joining an absolute path yields that path unchanged.
        let artifact_path = project_root.join(artifact_path);

        let file_name = artifact_path.file_name().ok_or_else(|| {
            ModwireError::ProjectValidation(format!(
                "Artifact path '{}' does not name a file",
                artifact_path.display()
            ))
        })?;

        let parent = match artifact_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let canonical_parent = parent.canonicalize().map_err(|e| {
            ModwireError::ProjectValidation(format!(
                "Invalid artifact directory '{}': {e}",
                parent.display()
            ))
        })?;

        let canonical_root = project_root.canonicalize().map_err(|e| {
            ModwireError::ProjectValidation(format!(
                "Invalid project directory '{}': {e}",
                project_root.display()
            ))
        })?;

        if !canonical_parent.starts_with(&canonical_root) {
            return Err(ModwireError::ProjectValidation(format!(
                "Artifact '{}' is outside the project directory",
                artifact_path.display()
            )));
        }

        let resolved = canonical_parent.join(file_name);
        if resolved.is_dir() {
            return Err(ModwireError::ProjectValidation(format!(
                "Artifact path '{}' is a directory",
                artifact_path.display()
            )));
        }

        Ok(resolved)
    }
}
