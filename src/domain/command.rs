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

//! # Stage Commands
//!
//! External commands are kept as structured values (program, argument
//! list, optional stdout redirect) all the way to the OS boundary. Only
//! `infrastructure::shell` flattens them, either into a
//! `std::process::Command` or into a quoted shell string for the
//! chunk-splitter's filter.

use serde::{Deserialize, Serialize};

/// Placeholder the chunk-splitter replaces with each chunk's file name.
pub const CHUNK_PLACEHOLDER: &str = "$FILE";

/// Destination of one chunk: `{base}/{$FILE}{extension}`.
///
/// Templated once per export; the chunk-splitter resolves the placeholder
/// for every physical chunk since the chunk count is unknown up front.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationTemplate {
    /// Directory or object-store prefix, always ending in `/`.
    pub base: String,
    /// Extension appended after the chunk name, e.g. `.json.lzo`.
    pub extension: String,
}

impl DestinationTemplate {
    pub fn new(destination: &str, extension: &str) -> Self {
        let mut base = destination.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        Self {
            base,
            extension: extension.to_string(),
        }
    }

    /// The final URI for one chunk file name (prefix plus numeric suffix).
    pub fn resolve(&self, chunk_name: &str) -> String {
        format!("{}{}{}", self.base, chunk_name, self.extension)
    }
}

impl std::fmt::Display for DestinationTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.base, CHUNK_PLACEHOLDER, self.extension)
    }
}

/// One argument word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Arg {
    Literal(String),
    /// Only valid inside a shell-rendered filter, where `$FILE` is expanded.
    Destination(DestinationTemplate),
    /// A nested `a | b | c` chain, passed as a single shell-string argument.
    Filter(Vec<StageCommand>),
}

impl From<&str> for Arg {
    fn from(s: &str) -> Self {
        Arg::Literal(s.to_string())
    }
}

impl From<String> for Arg {
    fn from(s: String) -> Self {
        Arg::Literal(s)
    }
}

/// A program plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCommand {
    pub program: String,
    pub args: Vec<Arg>,
    /// Redirect stdout to this target (shell context only).
    pub stdout_to: Option<Arg>,
}

impl StageCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdout_to: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<Arg>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdout_to(mut self, target: impl Into<Arg>) -> Self {
        self.stdout_to = Some(target.into());
        self
    }

    /// Every program this command needs, nested filters included.
    pub fn programs(&self) -> Vec<&str> {
        let mut out = vec![self.program.as_str()];
        for arg in &self.args {
            if let Arg::Filter(chain) = arg {
                for cmd in chain {
                    out.extend(cmd.programs());
                }
            }
        }
        out
    }
}

/// What a pipeline stage does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageRole {
    /// Reads the rendezvous channel.
    Reader,
    Escape(crate::domain::entities::EscapeKind),
    /// Splits the stream into chunks, each fed through a compress/sink filter.
    ChunkSplitter,
}

/// One external command of the consumer pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStage {
    pub role: StageRole,
    pub command: StageCommand,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_template() {
        let t = DestinationTemplate::new("s3://bucket/path", ".json.lzo");
        assert_eq!(t.base, "s3://bucket/path/");
        assert_eq!(t.to_string(), "s3://bucket/path/$FILE.json.lzo");
        assert_eq!(
            t.resolve("part-00000001"),
            "s3://bucket/path/part-00000001.json.lzo"
        );

        let t = DestinationTemplate::new("/data/out/", ".csv");
        assert_eq!(t.resolve("part-00000000"), "/data/out/part-00000000.csv");
    }

    #[test]
    fn test_programs_include_nested_filters() {
        let cmd = StageCommand::new("split").arg("-l").arg(Arg::Filter(vec![
            StageCommand::new("gzip").arg("-6"),
            StageCommand::new("cat").stdout_to(Arg::Literal("/tmp/x".into())),
        ]));
        assert_eq!(cmd.programs(), vec!["split", "gzip", "cat"]);
    }
}
