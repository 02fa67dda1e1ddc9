// System memory usage for the overlay label.
//
// Total memory comes from a meminfo-format text file whose first line is
// expected to carry `MemTotal: <n> kB`. Available memory is a separate
// platform query so hosts without the file can still provide both values.

use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

const MEM_TOTAL: &str = "MemTotal:";
const MEM_AVAILABLE: &str = "MemAvailable:";

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("`{0}` not found")]
    MissingField(&'static str),
    #[error("no numeric value after `{0}`")]
    BadValue(&'static str),
    #[error("total memory reported as zero")]
    ZeroTotal,
    #[error("memory query failed: {0}")]
    Query(String),
}

/// Source of total and available memory, both in kB.
pub trait MemorySource {
    fn total_kb(&self) -> Result<u64, MemoryError>;
    fn available_kb(&self) -> Result<u64, MemoryError>;
}

/// Reads `/proc/meminfo` (or any file in that format).
#[derive(Debug, Clone)]
pub struct ProcMeminfo {
    path: PathBuf,
}

impl ProcMeminfo {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read(&self) -> Result<String, MemoryError> {
        fs::read_to_string(&self.path).map_err(|source| MemoryError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl MemorySource for ProcMeminfo {
    fn total_kb(&self) -> Result<u64, MemoryError> {
        parse_mem_total(&self.read()?)
    }

    fn available_kb(&self) -> Result<u64, MemoryError> {
        parse_mem_available(&self.read()?)
    }
}

/// Extracts the `MemTotal:` value from the first line of meminfo text.
pub fn parse_mem_total(text: &str) -> Result<u64, MemoryError> {
    let first = text.lines().next().unwrap_or_default();
    number_after(first, MEM_TOTAL)
}

/// Extracts the `MemAvailable:` value from any line of meminfo text.
pub fn parse_mem_available(text: &str) -> Result<u64, MemoryError> {
    text.lines()
        .find(|line| line.contains(MEM_AVAILABLE))
        .ok_or(MemoryError::MissingField(MEM_AVAILABLE))
        .and_then(|line| number_after(line, MEM_AVAILABLE))
}

/// First run of ASCII digits following `label` on `line`.
fn number_after(line: &str, label: &'static str) -> Result<u64, MemoryError> {
    let idx = line.find(label).ok_or(MemoryError::MissingField(label))?;
    let rest = &line[idx + label.len()..];
    let digits: String = rest
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().map_err(|_| MemoryError::BadValue(label))
}

/// `floor((total - available) / total * 100)`. Available above total clamps to 0%.
pub fn used_percent(total_kb: u64, available_kb: u64) -> Result<u32, MemoryError> {
    if total_kb == 0 {
        return Err(MemoryError::ZeroTotal);
    }
    let used = total_kb.saturating_sub(available_kb) as u128;
    Ok((used * 100 / total_kb as u128) as u32)
}

pub fn format_percent(percent: u32) -> String {
    format!("{percent}%")
}

/// Turns a [`MemorySource`] into the overlay label, swallowing failures.
pub struct MemoryStatsReader<S> {
    source: S,
    fallback: String,
}

impl<S: MemorySource> MemoryStatsReader<S> {
    pub fn new(source: S, fallback: impl Into<String>) -> Self {
        Self {
            source,
            fallback: fallback.into(),
        }
    }

    pub fn used_percent(&self) -> Result<u32, MemoryError> {
        let total = self.source.total_kb()?;
        let available = self.source.available_kb()?;
        used_percent(total, available)
    }

    /// `"<n>%"`, or the fallback label when anything goes wrong.
    pub fn used_percent_label(&self) -> String {
        match self.used_percent() {
            Ok(percent) => format_percent(percent),
            Err(e) => {
                tracing::debug!(error = %e, "memory stats unavailable");
                self.fallback.clone()
            }
        }
    }
}
