pub mod decorator_patch;
pub mod module_locator;
pub mod module_transformer;
pub mod module_updater;
pub mod syntax;

pub use module_locator::{ModuleLocator, NearestModuleLocator};
pub use module_updater::{ModuleUpdater, UpdateReport};
