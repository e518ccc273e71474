//! Append-only JSONL file sink.
//!
//! Each write is flushed immediately so that several processes can share one
//! log file and `tail -f` sees complete lines.

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;

/// Shared, line-flushed file writer.
#[derive(Clone)]
pub struct FileLogWriter {
    inner: Arc<Mutex<BufWriter<File>>>,
}

impl FileLogWriter {
    pub fn new(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            inner: Arc::new(Mutex::new(BufWriter::with_capacity(8192, file))),
        })
    }
}

impl Write for FileLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.inner.lock();
        let result = guard.write(buf);
        guard.flush()?;
        result
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().flush()
    }
}

impl<'a> MakeWriter<'a> for FileLogWriter {
    type Writer = FileLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::tempdir;

    #[test]
    fn test_file_log_writer_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dispatcher.jsonl");

        let mut writer = FileLogWriter::new(&path).unwrap();
        writer.write_all(b"first\n").unwrap();
        let mut again = FileLogWriter::new(&path).unwrap();
        again.write_all(b"second\n").unwrap();

        let mut content = String::new();
        File::open(&path)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "first\nsecond\n");
    }

    #[test]
    fn test_writer_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("deeply").join("nested").join("test.jsonl");

        assert!(FileLogWriter::new(&path).is_ok());
        assert!(path.parent().unwrap().exists());
    }
}
