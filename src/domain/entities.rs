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

//! # Domain Entities
//!
//! The "Nouns" of an export: columns, formats, compression choices, the
//! export specification itself and the report handed back to the caller.
//!
//! Formats and compression kinds are closed enums that carry their fixed
//! metadata (extension, terminators, escape requirements) as data, so the
//! projection builder and pipeline composer can dispatch with a single
//! `match` each.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Field separator written by the extractor for DELIMITED exports.
///
/// SOH STX STX SOH: never present in real character data.
pub const DELIMITED_FIELD_SEPARATOR: &str = "\u{1}\u{2}\u{2}\u{1}";

/// Record separator written by the extractor for DELIMITED exports.
pub const DELIMITED_RECORD_SEPARATOR: &str = "\u{1}\u{3}\u{3}\u{1}";

/// Output shape of an export.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Format {
    /// Comma-separated, double-quoted fields.
    #[serde(alias = "CSV")]
    Delimited,
    /// Tab-separated values.
    Tsv,
    /// One JSON object per line.
    Json,
}

impl Format {
    /// Filename extension token, without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Delimited => "csv",
            Format::Tsv => "tsv",
            Format::Json => "json",
        }
    }

    /// `(field, row)` terminators the extractor must be told to use.
    ///
    /// JSON rows are a single column, so the extractor defaults apply.
    pub fn terminators(&self) -> Option<(&'static str, &'static str)> {
        match self {
            Format::Delimited => Some((DELIMITED_FIELD_SEPARATOR, DELIMITED_RECORD_SEPARATOR)),
            Format::Tsv => Some(("\t", "\n")),
            Format::Json => None,
        }
    }

    /// The escape codec that post-processes this format.
    pub fn escape_kind(&self) -> EscapeKind {
        match self {
            Format::Delimited => EscapeKind::Csv,
            Format::Tsv => EscapeKind::Tsv,
            Format::Json => EscapeKind::Json,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Delimited => write!(f, "DELIMITED"),
            Format::Tsv => write!(f, "TSV"),
            Format::Json => write!(f, "JSON"),
        }
    }
}

/// Compression applied to every chunk before it reaches the sink.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompressionKind {
    None,
    #[default]
    Lzop,
    Gzip,
}

impl CompressionKind {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, CompressionKind::None)
    }
}

impl fmt::Display for CompressionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionKind::None => write!(f, "NONE"),
            CompressionKind::Lzop => write!(f, "LZOP"),
            CompressionKind::Gzip => write!(f, "GZIP"),
        }
    }
}

/// Which escape codec a pipeline stage runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EscapeKind {
    Csv,
    Tsv,
    Json,
}

impl EscapeKind {
    /// Subcommand name under `stx escape`.
    pub fn subcommand(&self) -> &'static str {
        match self {
            EscapeKind::Csv => "csv",
            EscapeKind::Tsv => "tsv",
            EscapeKind::Json => "json",
        }
    }
}

/// When the composer inserts an escape stage for TSV and JSON exports.
///
/// DELIMITED exports are always escaped regardless of the policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EscapePolicy {
    /// TSV only with redshift escaping, JSON only with dotted column names.
    #[default]
    IfNeeded,
    Always,
}

/// A column as reported by catalog introspection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnDescriptor {
    /// Column name; a literal `.` is significant for JSON exports.
    pub name: String,
    /// Upper-cased SQL type name (e.g. "NVARCHAR").
    pub sql_type: String,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
        }
    }
}

/// Everything one export invocation needs. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSpec {
    /// Table identifier, e.g. `[dbo].[orders]`.
    pub table: String,
    pub format: Format,
    pub compression: CompressionKind,
    pub compress_level: u32,
    /// Lines per output chunk, at least 1.
    pub chunk_lines: u64,
    /// Destination directory: a local path or an `s3://` URI.
    pub destination: String,
    /// Filename prefix placed before the numeric chunk suffix.
    pub chunk_prefix: String,
    pub escape_policy: EscapePolicy,
    pub redshift_escape: bool,
    pub prevent_precision_loss: bool,
}

impl ExportSpec {
    /// Full filename extension, e.g. `.json.lzo`.
    pub fn file_extension(&self, codec_extension: Option<&str>) -> String {
        let mut ext = format!(".{}", self.format.extension());
        if let Some(codec) = codec_extension {
            ext.push_str(codec);
        }
        ext
    }
}

/// Lifecycle of the extraction task or the pipeline task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    NotStarted,
    Running,
    Succeeded,
    Failed(i32),
}

impl TaskState {
    pub fn from_exit_code(code: i32) -> Self {
        if code == 0 {
            TaskState::Succeeded
        } else {
            TaskState::Failed(code)
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::Failed(_))
    }
}

/// Outcome of an export that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportStatus {
    Succeeded,
    /// The catalog reported an empty table; no task was started.
    Skipped,
}

/// The "Report Card" for one export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportReport {
    pub table: String,
    pub format: Format,
    pub compression: CompressionKind,
    pub destination: String,
    pub status: ExportStatus,
    pub started_at: String,
    pub completed_at: String,
    pub duration_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(format: Format) -> ExportSpec {
        ExportSpec {
            table: "[dbo].[t]".into(),
            format,
            compression: CompressionKind::Lzop,
            compress_level: 6,
            chunk_lines: 10,
            destination: "/tmp/out".into(),
            chunk_prefix: "part-".into(),
            escape_policy: EscapePolicy::IfNeeded,
            redshift_escape: false,
            prevent_precision_loss: true,
        }
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(spec(Format::Json).file_extension(Some(".lzo")), ".json.lzo");
        assert_eq!(spec(Format::Delimited).file_extension(None), ".csv");
        assert_eq!(spec(Format::Tsv).file_extension(Some(".gz")), ".tsv.gz");
    }

    #[test]
    fn test_format_serde_names() {
        let f: Format = serde_yaml::from_str("CSV").unwrap();
        assert_eq!(f, Format::Delimited);
        let f: Format = serde_yaml::from_str("JSON").unwrap();
        assert_eq!(f, Format::Json);
        let p: EscapePolicy = serde_yaml::from_str("always").unwrap();
        assert_eq!(p, EscapePolicy::Always);
    }

    #[test]
    fn test_task_state_from_exit_code() {
        assert_eq!(TaskState::from_exit_code(0), TaskState::Succeeded);
        assert_eq!(TaskState::from_exit_code(7), TaskState::Failed(7));
        assert!(!TaskState::Running.is_finished());
    }
}
