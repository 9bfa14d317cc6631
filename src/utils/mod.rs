pub mod import_path;
pub mod path_validator;

pub use import_path::import_specifier;
pub use path_validator::PathValidator;
