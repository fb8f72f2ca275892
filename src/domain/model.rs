use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// One element of the top-level JSON array. Fields are opaque to the pipeline.
pub type Record = serde_json::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// Chunks always end on a character boundary; invalid UTF-8 is a parse error.
    #[default]
    Utf8,
    /// Raw bytes, chunk boundaries fall wherever the reader stops.
    Binary,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Utf8 => write!(f, "utf8"),
            Encoding::Binary => write!(f, "binary"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum TransformMode {
    /// Reassembles array elements across chunk boundaries; output is one document.
    #[default]
    Incremental,
    /// Every chunk is parsed on its own and becomes exactly one output chunk.
    PerChunk,
    /// Reads the whole file, maps it, then writes it in one go.
    Whole,
}

impl fmt::Display for TransformMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformMode::Incremental => write!(f, "incremental"),
            TransformMode::PerChunk => write!(f, "per-chunk"),
            TransformMode::Whole => write!(f, "whole"),
        }
    }
}

/// State transitions of a single pipeline run, in the order they are published.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    Started {
        source: PathBuf,
        destination: PathBuf,
        mode: TransformMode,
    },
    ChunkProcessed {
        index: usize,
        bytes_in: usize,
        bytes_out: usize,
    },
    EndOfRead {
        chunks: usize,
        bytes_read: u64,
    },
    /// The source stream has been released.
    Closed,
    Finished {
        bytes_written: u64,
        destination_closed: bool,
    },
    Failed {
        message: String,
    },
}

impl LifecycleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::Started { .. } => "start",
            LifecycleEvent::ChunkProcessed { .. } => "chunk",
            LifecycleEvent::EndOfRead { .. } => "end",
            LifecycleEvent::Closed => "close",
            LifecycleEvent::Finished { .. } => "finish",
            LifecycleEvent::Failed { .. } => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub mode: TransformMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub chunks_read: usize,
    /// Zero for whole-file runs, which never see the raw bytes.
    pub bytes_read: u64,
    pub bytes_written: u64,
    /// Top-level array elements that went through the transform stage.
    pub records_processed: usize,
}

impl RunSummary {
    pub fn elapsed(&self) -> chrono::TimeDelta {
        self.finished_at - self.started_at
    }
}
