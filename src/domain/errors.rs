// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Core error definitions for StreamXfer.
//!
//! This module provides a centralized `ExportError` enum and a `Result` type
//! used throughout the crate. Catalog errors are raised before any task is
//! started; everything from `ChannelNotCreatedError` down is raised only
//! after the orchestrator has terminated and reaped its tasks.

use std::path::PathBuf;
use thiserror::Error;

/// Error types encountered during an export.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Source metadata was unavailable (column listing or size estimate).
    #[error("Catalog error: {0}")]
    CatalogError(String),

    /// The rendezvous channel never appeared within the poll budget.
    #[error("Rendezvous channel {path:?} was not created after {waited_ms} ms")]
    ChannelNotCreatedError { path: PathBuf, waited_ms: u64 },

    #[error("Extraction task failed with exit code {code}")]
    ExtractionFailedError { code: i32 },

    #[error("Pipeline task failed with exit code {code}")]
    PipelineFailedError { code: i32 },

    /// A private sentinel separator leaked into a delimited record.
    #[error("Malformed record: {0}")]
    MalformedRecordError(String),

    #[error("Invalid JSON record: {0}")]
    InvalidJsonError(#[from] serde_json::Error),

    #[error("Executable {0:?} not found on PATH, please install it")]
    ExecutableNotFoundError(String),

    /// A stage command that cannot be serialized or spawned as given.
    #[error("Invalid stage command: {0}")]
    CommandError(String),

    #[error("Export cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<csv::Error> for ExportError {
    fn from(e: csv::Error) -> Self {
        match e.into_kind() {
            csv::ErrorKind::Io(io) => ExportError::IoError(io),
            other => ExportError::MalformedRecordError(format!("{:?}", other)),
        }
    }
}

impl From<nix::Error> for ExportError {
    fn from(e: nix::Error) -> Self {
        ExportError::IoError(std::io::Error::from(e))
    }
}

/// A specialized Result type for StreamXfer.
pub type Result<T> = std::result::Result<T, ExportError>;
