//! Logging setup
//!
//! Console output always; with `logging.log_file` set, a plain-text copy is
//! appended to that file. The file keeps one backup: whenever it would grow
//! past `max_log_bytes` it is moved to `<file>.1` and a fresh file is opened.

use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub fn init(cfg: &LoggingConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.level));

    let file_layer = if cfg.log_file.is_empty() {
        None
    } else {
        let file = RotatingFile::open(Path::new(&cfg.log_file), cfg.max_log_bytes)?;
        Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .context("Failed to initialize logging")?;
    Ok(())
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".1");
    PathBuf::from(name)
}

/// Append-only log file that rolls over to a single `.1` backup
#[derive(Debug)]
pub struct RotatingFile {
    path: PathBuf,
    max_bytes: u64,
    file: File,
    size: u64,
}

impl RotatingFile {
    pub fn open(path: &Path, max_bytes: u64) -> Result<Self> {
        let file = append(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        let size = file.metadata().map(|m| m.len()).unwrap_or(0);
        let mut out = Self {
            path: path.to_path_buf(),
            max_bytes,
            file,
            size,
        };
        if out.size > max_bytes {
            out.rotate()
                .with_context(|| format!("Failed to rotate log file {}", path.display()))?;
        }
        Ok(out)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        let backup = backup_path(&self.path);
        match std::fs::remove_file(&backup) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        std::fs::rename(&self.path, &backup)?;
        self.file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        self.size = 0;
        Ok(())
    }
}

fn append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.size > 0 && self.size + buf.len() as u64 > self.max_bytes {
            self.rotate()?;
        }
        let n = self.file.write(buf)?;
        self.size += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotates_while_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("campnet.log");
        let mut log = RotatingFile::open(&path, 100).unwrap();

        log.write_all(&[b'a'; 80]).unwrap();
        log.write_all(&[b'b'; 80]).unwrap();
        log.flush().unwrap();

        assert_eq!(std::fs::read(dir.path().join("campnet.log.1")).unwrap(), vec![b'a'; 80]);
        assert_eq!(std::fs::read(&path).unwrap(), vec![b'b'; 80]);

        // A second rollover replaces the old backup.
        log.write_all(&[b'c'; 80]).unwrap();
        log.flush().unwrap();
        assert_eq!(std::fs::read(dir.path().join("campnet.log.1")).unwrap(), vec![b'b'; 80]);
        assert_eq!(std::fs::read(&path).unwrap(), vec![b'c'; 80]);
    }

    #[test]
    fn test_oversized_file_rotated_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("campnet.log");
        std::fs::write(&path, vec![b'x'; 2048]).unwrap();

        let log = RotatingFile::open(&path, 1024).unwrap();

        assert_eq!(log.size, 0);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
        assert_eq!(
            std::fs::metadata(dir.path().join("campnet.log.1")).unwrap().len(),
            2048
        );
    }

    #[test]
    fn test_small_file_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("campnet.log");
        std::fs::write(&path, b"short\n").unwrap();

        let mut log = RotatingFile::open(&path, 1024).unwrap();
        log.write_all(b"more\n").unwrap();
        log.flush().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "short\nmore\n");
        assert!(!dir.path().join("campnet.log.1").exists());
    }

    #[test]
    fn test_rotation_through_subscriber_writer() {
        use tracing_subscriber::fmt::MakeWriter;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("campnet.log");
        let writer = Mutex::new(RotatingFile::open(&path, 64).unwrap());

        for _ in 0..4 {
            writer.make_writer().write_all(&[b'z'; 40]).unwrap();
        }

        assert!(dir.path().join("campnet.log.1").exists());
        assert!(std::fs::metadata(&path).unwrap().len() <= 64);
    }
}
