use crate::agents::{ModuleLocator, ModuleUpdater, NearestModuleLocator, UpdateReport};
use crate::asset::ArtifactCategory;
use crate::config::ModwireConfig;
use crate::error::Result;
use crate::streams::LocalFileStreams;
use crate::utils::PathValidator;
use colored::Colorize;
use std::path::{Path, PathBuf};

struct Project {
    root: PathBuf,
    config: ModwireConfig,
}

impl Project {
    fn open<P: AsRef<Path>>(project_path: P) -> Result<Self> {
        let root = PathValidator::validate_project_path(project_path)?;
        let config = ModwireConfig::load(&root)?;
        Ok(Self { root, config })
    }

    fn updater(&self) -> Result<ModuleUpdater<NearestModuleLocator, LocalFileStreams>> {
        let locator = NearestModuleLocator::new(&self.root, self.config.module_suffix.clone());
        ModuleUpdater::new(locator, LocalFileStreams::new(), &self.config)
    }
}

/// Register an artifact in its nearest module file
pub fn execute_register<P: AsRef<Path>>(
    project_path: P,
    artifact: &str,
    class_name: &str,
    category: ArtifactCategory,
    json: bool,
) -> Result<()> {
    if json {
        let project = Project::open(project_path)?;
        let artifact = PathValidator::validate_artifact_path(artifact, &project.root)?;
        let report = project.updater()?.update(&artifact, class_name, category)?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "Registering artifact in module...".cyan().bold());

    println!("\n{}", "1. Validating project structure...".yellow());
    let project = Project::open(project_path)?;
    let artifact = PathValidator::validate_artifact_path(artifact, &project.root)?;
    println!("{}", "✓ Project structure is valid".green());

    println!("\n{}", "2. Updating module declaration...".yellow());
    let updater = project.updater()?;
    let report = updater.update(&artifact, class_name, category)?;

    print_register_result(&report, &project.root);

    println!("\n{}", "✨ Artifact registered successfully!".green().bold());
    Ok(())
}

/// Print the module file an artifact resolves to
pub fn execute_locate<P: AsRef<Path>>(project_path: P, artifact: &str) -> Result<()> {
    let project = Project::open(project_path)?;
    let artifact = PathValidator::validate_artifact_path(artifact, &project.root)?;
    let locator = NearestModuleLocator::new(&project.root, project.config.module_suffix.clone());
    let module = locator.find_from(&artifact)?;
    println!("{}", display_relative(&module, &project.root));
    Ok(())
}

/// List artifact kinds with their effective registration keys
pub fn execute_kinds<P: AsRef<Path>>(project_path: P) -> Result<()> {
    let project = Project::open(project_path)?;
    let keys = project.config.category_keys()?;

    println!("{}", "Artifact kinds:".cyan().bold());
    for category in ArtifactCategory::ALL {
        let key = keys.key_for(category);
        let marker = if key == category.default_key() {
            String::new()
        } else {
            format!(" (default: {})", category.default_key()).dimmed().to_string()
        };
        println!("   • {:<12} → {}{}", category.to_string(), key.bright_cyan(), marker);
    }
    Ok(())
}

fn print_register_result(report: &UpdateReport, root: &Path) {
    println!(
        "   {} {}",
        "Module:".bold(),
        display_relative(&report.module_path, root).bright_cyan()
    );
    println!(
        "   {}",
        format!(
            "✓ import {{{}}} from '{}'",
            report.class_name, report.import_specifier
        )
        .green()
    );

    let action = if report.created_list {
        "created list"
    } else {
        "appended to"
    };
    println!(
        "   {}",
        format!("✓ {} '{}' with {}", action, report.key, report.class_name).green()
    );

    if !report.lock_removed {
        println!(
            "   {}",
            "⚠ The intermediate .lock file could not be removed".yellow()
        );
    }
}

fn display_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}
