//! In-memory `FileStreams` used by tests.

use super::{FileStreams, WriteStream};
use crate::error::Result;
use std::collections::HashMap;
use std::io::{self, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    OpenRead(PathBuf),
    OpenWrite(PathBuf),
    Finish(PathBuf),
    Remove(PathBuf),
}

#[derive(Default)]
struct MemoryState {
    files: HashMap<PathBuf, Vec<u8>>,
    events: Vec<StreamEvent>,
    fail_write: Option<(PathBuf, usize)>,
    fail_remove: bool,
}

/// Shared in-memory file table. Clones observe the same files.
#[derive(Clone, Default)]
pub struct MemoryStreams {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStreams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: impl Into<PathBuf>, content: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .files
            .insert(path.into(), content.as_bytes().to_vec());
        self
    }

    /// Writes to `path` fail once more than `limit` bytes have been accepted.
    pub fn failing_write(self, path: impl Into<PathBuf>, limit: usize) -> Self {
        self.state.lock().unwrap().fail_write = Some((path.into(), limit));
        self
    }

    pub fn failing_remove(self) -> Self {
        self.state.lock().unwrap().fail_remove = true;
        self
    }

    pub fn content(&self, path: impl AsRef<Path>) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .files
            .get(path.as_ref())
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.state.lock().unwrap().files.contains_key(path.as_ref())
    }

    pub fn events(&self) -> Vec<StreamEvent> {
        self.state.lock().unwrap().events.clone()
    }
}

impl FileStreams for MemoryStreams {
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read>> {
        let mut state = self.state.lock().unwrap();
        state.events.push(StreamEvent::OpenRead(path.to_path_buf()));
        let bytes = state.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display()))
        })?;
        Ok(Box::new(Cursor::new(bytes)))
    }

    fn open_write(&self, path: &Path) -> Result<Box<dyn WriteStream>> {
        let limit = {
            let mut state = self.state.lock().unwrap();
            state.events.push(StreamEvent::OpenWrite(path.to_path_buf()));
            state.files.insert(path.to_path_buf(), Vec::new());
            state
                .fail_write
                .as_ref()
                .filter(|(target, _)| target == path)
                .map(|(_, limit)| *limit)
        };
        Ok(Box::new(MemoryWriteStream {
            state: Arc::clone(&self.state),
            path: path.to_path_buf(),
            written: 0,
            limit,
        }))
    }

    fn remove(&self, path: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.events.push(StreamEvent::Remove(path.to_path_buf()));
        if state.fail_remove {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "remove refused").into());
        }
        state.files.remove(path);
        Ok(())
    }
}

struct MemoryWriteStream {
    state: Arc<Mutex<MemoryState>>,
    path: PathBuf,
    written: usize,
    limit: Option<usize>,
}

impl Write for MemoryWriteStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(limit) = self.limit {
            if self.written + buf.len() > limit {
                return Err(io::Error::other("injected write failure"));
            }
        }
        let mut state = self.state.lock().unwrap();
        state
            .files
            .entry(self.path.clone())
            .or_default()
            .extend_from_slice(buf);
        self.written += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl WriteStream for MemoryWriteStream {
    fn finish(self: Box<Self>) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .events
            .push(StreamEvent::Finish(self.path.clone()));
        Ok(())
    }
}
