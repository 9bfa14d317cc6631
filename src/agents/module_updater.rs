use crate::agents::module_locator::ModuleLocator;
use crate::agents::module_transformer::{ModuleTransformer, Registration, TransformOutcome};
use crate::asset::{ArtifactCategory, CategoryKeys, is_identifier};
use crate::config::ModwireConfig;
use crate::error::{ModwireError, Result};
use crate::streams::FileStreams;
use crate::utils::import_specifier;
use serde::Serialize;
use std::ffi::OsString;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Result of a successful registration.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateReport {
    pub module_path: PathBuf,
    pub import_specifier: String,
    pub class_name: String,
    pub category: ArtifactCategory,
    pub key: String,
    /// The registration list was absent and has been created.
    pub created_list: bool,
    /// False when the intermediate file could not be deleted afterwards.
    pub lock_removed: bool,
}

/// Registers artifacts in their module file through an intermediate lock file.
///
/// The module file is only rewritten once the complete new content has been
/// written to `<module><lock_suffix>`. Concurrent updates of the same module
/// file are not coordinated; callers must serialise them.
pub struct ModuleUpdater<L, S> {
    locator: L,
    streams: S,
    transformer: ModuleTransformer,
    keys: CategoryKeys,
    lock_suffix: String,
    source_extensions: Vec<String>,
}

impl<L: ModuleLocator, S: FileStreams> ModuleUpdater<L, S> {
    pub fn new(locator: L, streams: S, config: &ModwireConfig) -> Result<Self> {
        Ok(Self {
            locator,
            streams,
            transformer: ModuleTransformer::new(config)?,
            keys: config.category_keys()?,
            lock_suffix: config.lock_suffix.clone(),
            source_extensions: config.source_extensions.clone(),
        })
    }

    /// Imports `class_name` from `artifact_path` into the nearest module file
    /// and appends it to the list registered for `category`.
    pub fn update(
        &self,
        artifact_path: &Path,
        class_name: &str,
        category: ArtifactCategory,
    ) -> Result<UpdateReport> {
        if !is_identifier(class_name) {
            return Err(ModwireError::ProjectValidation(format!(
                "'{}' is not a valid class name",
                class_name
            )));
        }

        let module_path = self.locator.find_from(artifact_path)?;
        info!(
            target: "modwire::updater",
            "registering {} in {}",
            class_name,
            module_path.display()
        );

        let module_dir = match module_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let specifier = import_specifier(artifact_path, module_dir, &self.source_extensions)?;
        let key = self.keys.key_for(category);
        let lock_path = lock_path_for(&module_path, &self.lock_suffix);

        let registration = Registration {
            class_name,
            specifier: &specifier,
            key,
        };
        let outcome = self.write_intermediate(&module_path, &lock_path, &registration)?;
        debug!(
            target: "modwire::updater",
            existing_imports = outcome.existing_imports,
            "wrote {} (list created: {})",
            lock_path.display(),
            outcome.created_list
        );

        self.commit(&lock_path, &module_path)?;
        info!(target: "modwire::updater", "updated {}", module_path.display());

        let lock_removed = match self.streams.remove(&lock_path) {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    target: "modwire::updater",
                    "could not remove {}: {}",
                    lock_path.display(),
                    e
                );
                false
            }
        };

        Ok(UpdateReport {
            module_path,
            import_specifier: specifier,
            class_name: class_name.to_string(),
            category,
            key: key.to_string(),
            created_list: outcome.created_list,
            lock_removed,
        })
    }

    /// Streams the patched module into the lock file. The module file is only read.
    fn write_intermediate(
        &self,
        module_path: &Path,
        lock_path: &Path,
        registration: &Registration<'_>,
    ) -> Result<TransformOutcome> {
        let reader = self.streams.open_read(module_path)?;
        let mut writer = self.streams.open_write(lock_path)?;

        let outcome =
            match self
                .transformer
                .transform(BufReader::new(reader), writer.as_mut(), registration)
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    drop(writer);
                    self.discard(lock_path);
                    return Err(e);
                }
            };

        if let Err(e) = writer.finish() {
            self.discard(lock_path);
            return Err(e);
        }

        Ok(outcome)
    }

    /// Copies the finished lock file back over the module file.
    fn commit(&self, lock_path: &Path, module_path: &Path) -> Result<()> {
        let mut reader = self.streams.open_read(lock_path)?;
        let mut writer = self.streams.open_write(module_path)?;

        let copied = io::copy(&mut reader, &mut writer)
            .map_err(ModwireError::from)
            .and_then(|_| writer.finish());

        if let Err(e) = copied {
            error!(
                target: "modwire::updater",
                "writing {} failed; the complete content is kept in {}",
                module_path.display(),
                lock_path.display()
            );
            return Err(e);
        }
        Ok(())
    }

    fn discard(&self, lock_path: &Path) {
        if let Err(e) = self.streams.remove(lock_path) {
            debug!(
                target: "modwire::updater",
                "could not discard {}: {}",
                lock_path.display(),
                e
            );
        }
    }
}

/// `asset.module.ts` becomes `asset.module.ts.lock` for the default suffix.
pub fn lock_path_for(module_path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(module_path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::module_locator::NearestModuleLocator;
    use crate::streams::LocalFileStreams;
    use crate::streams::memory::{MemoryStreams, StreamEvent};
    use std::cell::RefCell;
    use std::fs;
    use tempfile::tempdir;

    const MODULE: &str = "path/to/asset/asset.module.ts";
    const LOCK: &str = "path/to/asset/asset.module.ts.lock";
    const CONTENT: &str =
        "import {Module} from 'framework';\n\n@Module({})\nexport class AssetModule {}\n";

    struct StubLocator {
        module: Option<PathBuf>,
        calls: RefCell<Vec<PathBuf>>,
    }

    impl StubLocator {
        fn resolving(module: &str) -> Self {
            Self {
                module: Some(PathBuf::from(module)),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                module: None,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl ModuleLocator for &StubLocator {
        fn find_from(&self, path: &Path) -> Result<PathBuf> {
            self.calls.borrow_mut().push(path.to_path_buf());
            self.module
                .clone()
                .ok_or_else(|| ModwireError::ModuleNotFound {
                    from: path.to_path_buf(),
                })
        }
    }

    fn updater<'a>(
        locator: &'a StubLocator,
        streams: &MemoryStreams,
    ) -> ModuleUpdater<&'a StubLocator, MemoryStreams> {
        ModuleUpdater::new(locator, streams.clone(), &ModwireConfig::default()).unwrap()
    }

    #[test]
    fn registers_component_through_lock_file() {
        let locator = StubLocator::resolving(MODULE);
        let streams = MemoryStreams::new().with_file(MODULE, CONTENT);

        let report = updater(&locator, &streams)
            .update(
                Path::new("path/to/asset/asset.service.ts"),
                "AssetService",
                ArtifactCategory::Component,
            )
            .unwrap();

        assert_eq!(
            locator.calls.borrow().as_slice(),
            &[PathBuf::from("path/to/asset/asset.service.ts")]
        );
        assert_eq!(
            streams.content(MODULE).unwrap(),
            "import {Module} from 'framework';\n\
             import {AssetService} from './asset.service';\n\
             \n\
             @Module({\n\
             \x20 components: [\n\
             \x20   AssetService\n\
             \x20 ]\n\
             })\n\
             export class AssetModule {}\n"
        );
        assert!(!streams.exists(LOCK));
        assert_eq!(report.import_specifier, "./asset.service");
        assert_eq!(report.key, "components");
        assert!(report.created_list);
        assert!(report.lock_removed);
    }

    #[test]
    fn follows_write_aside_then_copy_back_order() {
        let locator = StubLocator::resolving(MODULE);
        let streams = MemoryStreams::new().with_file(MODULE, CONTENT);

        updater(&locator, &streams)
            .update(
                Path::new("path/to/asset/asset.service.ts"),
                "AssetService",
                ArtifactCategory::Component,
            )
            .unwrap();

        assert_eq!(
            streams.events(),
            vec![
                StreamEvent::OpenRead(PathBuf::from(MODULE)),
                StreamEvent::OpenWrite(PathBuf::from(LOCK)),
                StreamEvent::Finish(PathBuf::from(LOCK)),
                StreamEvent::OpenRead(PathBuf::from(LOCK)),
                StreamEvent::OpenWrite(PathBuf::from(MODULE)),
                StreamEvent::Finish(PathBuf::from(MODULE)),
                StreamEvent::Remove(PathBuf::from(LOCK)),
            ]
        );
    }

    #[test]
    fn registers_controller_under_controllers() {
        let locator = StubLocator::resolving(MODULE);
        let streams = MemoryStreams::new().with_file(MODULE, CONTENT);

        let report = updater(&locator, &streams)
            .update(
                Path::new("path/to/asset/asset.controller.ts"),
                "AssetService",
                ArtifactCategory::Controller,
            )
            .unwrap();

        assert_eq!(
            streams.content(MODULE).unwrap(),
            "import {Module} from 'framework';\n\
             import {AssetService} from './asset.controller';\n\
             \n\
             @Module({\n\
             \x20 controllers: [\n\
             \x20   AssetService\n\
             \x20 ]\n\
             })\n\
             export class AssetModule {}\n"
        );
        assert_eq!(report.key, "controllers");
    }

    #[test]
    fn repeated_update_appends_duplicate_entry() {
        let locator = StubLocator::resolving(MODULE);
        let streams = MemoryStreams::new().with_file(MODULE, CONTENT);
        let updater = updater(&locator, &streams);
        let artifact = Path::new("path/to/asset/asset.service.ts");

        updater
            .update(artifact, "AssetService", ArtifactCategory::Component)
            .unwrap();
        let second = updater
            .update(artifact, "AssetService", ArtifactCategory::Component)
            .unwrap();

        let content = streams.content(MODULE).unwrap();
        assert!(!second.created_list);
        assert_eq!(
            content
                .matches("import {AssetService} from './asset.service';")
                .count(),
            2
        );
        assert!(content.contains("  components: [\n    AssetService,\n    AssetService\n  ]\n"));
    }

    #[test]
    fn locator_failure_touches_no_file() {
        let locator = StubLocator::failing();
        let streams = MemoryStreams::new().with_file(MODULE, CONTENT);

        let err = updater(&locator, &streams)
            .update(
                Path::new("path/to/asset/asset.service.ts"),
                "AssetService",
                ArtifactCategory::Component,
            )
            .unwrap_err();

        assert!(matches!(err, ModwireError::ModuleNotFound { .. }));
        assert!(streams.events().is_empty());
        assert!(!streams.exists(LOCK));
        assert_eq!(streams.content(MODULE).unwrap(), CONTENT);
    }

    #[test]
    fn failed_intermediate_write_leaves_module_untouched() {
        let locator = StubLocator::resolving(MODULE);
        let streams = MemoryStreams::new()
            .with_file(MODULE, CONTENT)
            .failing_write(LOCK, 20);

        let err = updater(&locator, &streams)
            .update(
                Path::new("path/to/asset/asset.service.ts"),
                "AssetService",
                ArtifactCategory::Component,
            )
            .unwrap_err();

        assert!(matches!(err, ModwireError::Io(_)));
        assert_eq!(streams.content(MODULE).unwrap(), CONTENT);
        assert!(!streams.exists(LOCK));
        assert!(
            !streams
                .events()
                .contains(&StreamEvent::OpenWrite(PathBuf::from(MODULE)))
        );
    }

    #[test]
    fn malformed_module_leaves_module_untouched() {
        let locator = StubLocator::resolving(MODULE);
        let original = "import {Module} from 'framework';\n\nexport class AssetModule {}\n";
        let streams = MemoryStreams::new().with_file(MODULE, original);

        let err = updater(&locator, &streams)
            .update(
                Path::new("path/to/asset/asset.service.ts"),
                "AssetService",
                ArtifactCategory::Component,
            )
            .unwrap_err();

        assert!(matches!(err, ModwireError::Transform(_)));
        assert_eq!(streams.content(MODULE).unwrap(), original);
        assert!(!streams.exists(LOCK));
    }

    #[test]
    fn missing_module_file_is_an_io_error() {
        let locator = StubLocator::resolving(MODULE);
        let streams = MemoryStreams::new();

        let err = updater(&locator, &streams)
            .update(
                Path::new("path/to/asset/asset.service.ts"),
                "AssetService",
                ArtifactCategory::Component,
            )
            .unwrap_err();

        assert!(matches!(err, ModwireError::Io(_)));
        assert!(!streams.exists(LOCK));
    }

    #[test]
    fn cleanup_failure_still_succeeds() {
        let locator = StubLocator::resolving(MODULE);
        let streams = MemoryStreams::new()
            .with_file(MODULE, CONTENT)
            .failing_remove();

        let report = updater(&locator, &streams)
            .update(
                Path::new("path/to/asset/asset.service.ts"),
                "AssetService",
                ArtifactCategory::Component,
            )
            .unwrap();

        assert!(!report.lock_removed);
        assert!(streams.exists(LOCK));
        assert_eq!(streams.content(MODULE), streams.content(LOCK));
        assert!(
            streams
                .content(MODULE)
                .unwrap()
                .contains("import {AssetService} from './asset.service';")
        );
    }

    #[test]
    fn invalid_class_name_is_rejected_before_locating() {
        let locator = StubLocator::resolving(MODULE);
        let streams = MemoryStreams::new().with_file(MODULE, CONTENT);

        let err = updater(&locator, &streams)
            .update(
                Path::new("path/to/asset/asset.service.ts"),
                "Asset Service",
                ArtifactCategory::Component,
            )
            .unwrap_err();

        assert!(matches!(err, ModwireError::ProjectValidation(_)));
        assert!(locator.calls.borrow().is_empty());
        assert!(streams.events().is_empty());
    }

    #[test]
    fn lock_path_appends_suffix_to_full_name() {
        assert_eq!(
            lock_path_for(Path::new("src/app.module.ts"), ".lock"),
            PathBuf::from("src/app.module.ts.lock")
        );
    }

    #[test]
    fn updates_module_on_disk() {
        let dir = tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let module = root.join("src/asset/asset.module.ts");
        fs::create_dir_all(root.join("src/asset/controllers")).unwrap();
        fs::write(
            &module,
            "import {Module} from 'framework';\n\n@Module({\n  components: [\n    AssetService\n  ]\n})\nexport class AssetModule {}\n",
        )
        .unwrap();

        let config = ModwireConfig::default();
        let updater = ModuleUpdater::new(
            NearestModuleLocator::new(&root, config.module_suffix.clone()),
            LocalFileStreams::new(),
            &config,
        )
        .unwrap();

        let report = updater
            .update(
                &root.join("src/asset/controllers/asset.controller.ts"),
                "AssetController",
                ArtifactCategory::Controller,
            )
            .unwrap();

        assert_eq!(report.module_path, module);
        assert!(report.lock_removed);
        assert!(!root.join("src/asset/asset.module.ts.lock").exists());
        assert_eq!(
            fs::read_to_string(&module).unwrap(),
            "import {Module} from 'framework';\n\
             import {AssetController} from './controllers/asset.controller';\n\
             \n\
             @Module({\n\
             \x20 components: [\n\
             \x20   AssetService\n\
             \x20 ],\n\
             \x20 controllers: [\n\
             \x20   AssetController\n\
             \x20 ]\n\
             })\n\
             export class AssetModule {}\n"
        );
    }

    #[test]
    fn registers_sub_module_in_enclosing_module() {
        let dir = tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let sub_module = root.join("src/asset/asset.module.ts");
        let app_module = root.join("src/app.module.ts");
        fs::create_dir_all(root.join("src/asset")).unwrap();
        fs::write(&sub_module, CONTENT).unwrap();
        fs::write(
            &app_module,
            "import {Module} from 'framework';\n\n@Module({})\nexport class AppModule {}\n",
        )
        .unwrap();

        let config = ModwireConfig::default();
        let updater = ModuleUpdater::new(
            NearestModuleLocator::new(&root, config.module_suffix.clone()),
            LocalFileStreams::new(),
            &config,
        )
        .unwrap();

        let report = updater
            .update(&sub_module, "AssetModule", ArtifactCategory::Module)
            .unwrap();

        assert_eq!(report.module_path, app_module);
        assert_eq!(report.import_specifier, "./asset/asset.module");
        assert_eq!(fs::read_to_string(&sub_module).unwrap(), CONTENT);
        assert_eq!(
            fs::read_to_string(&app_module).unwrap(),
            "import {Module} from 'framework';\n\
             import {AssetModule} from './asset/asset.module';\n\
             \n\
             @Module({\n  modules: [\n    AssetModule\n  ]\n})\n\
             export class AppModule {}\n"
        );
    }
}
