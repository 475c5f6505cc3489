use std::fmt;
use std::time::Duration;

use serde_json::json;

/// Health verdict for one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockStatus {
    Ok,
    Error,
    Timeout,
    Uncorrectable,
    IdNotFound,
    Aborted,
}

impl BlockStatus {
    pub const ALL: [BlockStatus; 6] = [
        BlockStatus::Ok,
        BlockStatus::Error,
        BlockStatus::Timeout,
        BlockStatus::Uncorrectable,
        BlockStatus::IdNotFound,
        BlockStatus::Aborted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BlockStatus::Ok => "ok",
            BlockStatus::Error => "error",
            BlockStatus::Timeout => "timeout",
            BlockStatus::Uncorrectable => "unc",
            BlockStatus::IdNotFound => "idnf",
            BlockStatus::Aborted => "abrt",
        }
    }

    pub fn is_ok(self) -> bool {
        self == BlockStatus::Ok
    }

    fn index(self) -> usize {
        match self {
            BlockStatus::Ok => 0,
            BlockStatus::Error => 1,
            BlockStatus::Timeout => 2,
            BlockStatus::Uncorrectable => 3,
            BlockStatus::IdNotFound => 4,
            BlockStatus::Aborted => 5,
        }
    }
}

impl fmt::Display for BlockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single chunk submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkResult {
    pub elapsed_us: u64,
    pub status: BlockStatus,
    /// Native reads only: did the transfer length match the request.
    pub full_transfer: Option<bool>,
}

/// What the host sees after each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkReport {
    pub lba: u64,
    pub status: BlockStatus,
    pub elapsed_us: u64,
}

impl ChunkReport {
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "lba": self.lba,
            "status": self.status.as_str(),
            "elapsed_microseconds": self.elapsed_us,
        })
    }
}

/// Per-verdict tallies and access-time extremes for a whole scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    counts: [u64; 6],
    pub min_access_us: Option<u64>,
    pub max_access_us: Option<u64>,
    pub total_access_us: u64,
    pub submission_errors: u64,
    pub interrupted: bool,
}

impl ScanSummary {
    pub fn record(&mut self, report: &ChunkReport) {
        self.counts[report.status.index()] += 1;
        self.total_access_us = self.total_access_us.saturating_add(report.elapsed_us);
        self.min_access_us = Some(self.min_access_us.map_or(report.elapsed_us, |m| m.min(report.elapsed_us)));
        self.max_access_us = Some(self.max_access_us.map_or(report.elapsed_us, |m| m.max(report.elapsed_us)));
    }

    pub fn count(&self, status: BlockStatus) -> u64 {
        self.counts[status.index()]
    }

    pub fn chunks(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn bad_chunks(&self) -> u64 {
        self.chunks() - self.count(BlockStatus::Ok)
    }

    pub fn total_access_time(&self) -> Duration {
        Duration::from_micros(self.total_access_us)
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut counts = serde_json::Map::new();
        for status in BlockStatus::ALL {
            counts.insert(status.as_str().to_string(), json!(self.count(status)));
        }
        json!({
            "chunks": self.chunks(),
            "counts": counts,
            "min_access_us": self.min_access_us,
            "max_access_us": self.max_access_us,
            "total_access_us": self.total_access_us,
            "submission_errors": self.submission_errors,
            "interrupted": self.interrupted,
        })
    }
}
