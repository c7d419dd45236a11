//! # JSONL Telemetry Logger
//!
//! Appends one JSON object per line to `telemetry_<index>.jsonl` files in a
//! log directory. A new file is started once the current one holds
//! `max_records_per_file` records; only the newest `max_files_to_keep` files
//! are retained. Indices continue from files already in the directory.

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::types::TelemetryRecord;
use crate::config::TelemetryConfig;
use crate::error::Result;

const FILE_PREFIX: &str = "telemetry_";
const FILE_EXTENSION: &str = ".jsonl";

fn log_filename(index: u64) -> String {
    format!("{}{:06}{}", FILE_PREFIX, index, FILE_EXTENSION)
}

fn parse_log_filename(name: &str) -> Option<u64> {
    name.strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_EXTENSION)?
        .parse()
        .ok()
}

/// Rotating JSONL writer
#[derive(Debug)]
pub struct TelemetryLogger {
    dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: Option<BufWriter<File>>,
    records_in_file: usize,
    next_index: u64,
    files: VecDeque<(u64, PathBuf)>,
}

impl TelemetryLogger {
    /// Open the log directory, creating it if needed
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::SbrLinkError::Io`] if the directory cannot be
    /// created or listed
    pub fn new(config: &TelemetryConfig) -> Result<Self> {
        let dir = PathBuf::from(&config.log_dir);
        fs::create_dir_all(&dir)?;

        let files = list_log_files(&dir)?;
        let next_index = files.back().map_or(1, |(index, _)| index + 1);
        info!(
            "Telemetry log at {} ({} existing files)",
            dir.display(),
            files.len()
        );

        Ok(Self {
            dir,
            max_records_per_file: config.max_records_per_file.max(1),
            max_files_to_keep: config.max_files_to_keep.max(1),
            writer: None,
            records_in_file: 0,
            next_index,
            files,
        })
    }

    /// Append one record
    pub fn log(&mut self, record: &TelemetryRecord) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        if let Some(writer) = self.writer.as_mut() {
            serde_json::to_writer(&mut *writer, record)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
            self.records_in_file += 1;
        }

        Ok(())
    }

    /// File currently being written, if any record was logged yet
    pub fn current_file(&self) -> Option<&Path> {
        self.writer
            .as_ref()
            .and(self.files.back())
            .map(|(_, path)| path.as_path())
    }

    /// Flush buffered output
    pub fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    fn rotate(&mut self) -> Result<()> {
        self.flush()?;

        let index = self.next_index;
        let path = self.dir.join(log_filename(index));
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;

        self.writer = Some(BufWriter::new(file));
        self.records_in_file = 0;
        self.next_index += 1;
        self.files.push_back((index, path));
        debug!("Rotated telemetry log to {}", log_filename(index));

        self.enforce_retention();
        Ok(())
    }

    fn enforce_retention(&mut self) {
        while self.files.len() > self.max_files_to_keep {
            let Some((_, path)) = self.files.pop_front() else {
                break;
            };
            match fs::remove_file(&path) {
                Ok(()) => debug!("Removed old telemetry log {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
    }
}

/// Existing log files in index order
fn list_log_files(dir: &Path) -> Result<VecDeque<(u64, PathBuf)>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if let Some(index) = parse_log_filename(&name.to_string_lossy()) {
            files.push((index, entry.path()));
        }
    }

    files.sort();
    Ok(files.into())
}
