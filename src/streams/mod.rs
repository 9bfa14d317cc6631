use crate::error::Result;
use std::io::{Read, Write};
use std::path::Path;

pub mod local;
#[cfg(test)]
pub mod memory;

pub use local::LocalFileStreams;

/// Writable stream with an explicit completion point.
pub trait WriteStream: Write {
    /// Flushes buffered bytes and returns once the destination holds all of them.
    fn finish(self: Box<Self>) -> Result<()>;
}

/// Capability to open byte streams on paths and remove files.
///
/// The updater only touches the filesystem through this trait so tests can
/// substitute in-memory buffers.
pub trait FileStreams {
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read>>;

    /// Opens `path` for writing, truncating any existing content.
    fn open_write(&self, path: &Path) -> Result<Box<dyn WriteStream>>;

    fn remove(&self, path: &Path) -> Result<()>;
}
