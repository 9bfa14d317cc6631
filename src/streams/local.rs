use super::{FileStreams, WriteStream};
use crate::error::Result;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// `FileStreams` backed by the local disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileStreams;

impl LocalFileStreams {
    pub fn new() -> Self {
        Self
    }
}

impl FileStreams for LocalFileStreams {
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read>> {
        let file = File::open(path)?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn open_write(&self, path: &Path) -> Result<Box<dyn WriteStream>> {
        let file = File::create(path)?;
        Ok(Box::new(LocalWriteStream {
            inner: BufWriter::new(file),
        }))
    }

    fn remove(&self, path: &Path) -> Result<()> {
        fs::remove_file(path)?;
        Ok(())
    }
}

struct LocalWriteStream {
    inner: BufWriter<File>,
}

impl Write for LocalWriteStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl WriteStream for LocalWriteStream {
    fn finish(self: Box<Self>) -> Result<()> {
        let file = self.inner.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(())
    }
}
