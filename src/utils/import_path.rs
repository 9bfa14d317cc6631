use crate::error::{ModwireError, Result};
use std::path::{Component, Path, PathBuf};

/// Builds the relative module specifier used to import `artifact` from a file in `module_dir`.
///
/// The result always starts with `./` or `../`, uses forward slashes and has
/// its source-file extension removed, e.g. `./asset.service`.
pub fn import_specifier(
    artifact: &Path,
    module_dir: &Path,
    source_extensions: &[String],
) -> Result<String> {
    let artifact = normalize(artifact)?;
    let module_dir = normalize(module_dir)?;

    let from: Vec<Component> = module_dir.components().collect();
    let to: Vec<Component> = artifact.components().collect();

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    if common == 0 {
        return Err(ModwireError::ProjectValidation(format!(
            "Artifact '{}' shares no common root with module directory '{}'",
            artifact.display(),
            module_dir.display()
        )));
    }

    if common == to.len() {
        return Err(ModwireError::ProjectValidation(format!(
            "Artifact '{}' does not name a file below '{}'",
            artifact.display(),
            module_dir.display()
        )));
    }

    let mut parts: Vec<String> = vec!["..".to_string(); from.len() - common];
    let remaining = &to[common..];
    for (index, component) in remaining.iter().enumerate() {
        let segment = component.as_os_str().to_string_lossy();
        if index + 1 == remaining.len() {
            parts.push(strip_source_extension(&segment, source_extensions).to_string());
        } else {
            parts.push(segment.into_owned());
        }
    }

    let joined = parts.join("/");
    if from.len() == common {
        Ok(format!("./{}", joined))
    } else {
        Ok(joined)
    }
}

fn strip_source_extension<'a>(file_name: &'a str, source_extensions: &[String]) -> &'a str {
    match file_name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && source_extensions
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext)) =>
        {
            stem
        }
        _ => file_name,
    }
}

/// Absolute, lexically normalised form of `path` (no filesystem access).
fn normalize(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}
