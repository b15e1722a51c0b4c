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

//! # Pipeline Composer
//!
//! Builds the consumer side of an export as an ordered stage list:
//!
//! ```text
//! reader(fifo) -> [escape] -> chunk-splitter --filter '[compress |] sink > $FILE'
//! ```
//!
//! The destination is templated once; GNU `split` resolves `$FILE` for
//! every chunk it opens, so the chunk count never has to be known up front.

use crate::domain::command::{Arg, DestinationTemplate, PipelineStage, StageCommand, StageRole};
use crate::domain::entities::{EscapeKind, EscapePolicy, ExportSpec, Format};
use crate::domain::errors::{ExportError, Result};
use crate::infrastructure::shell::gnu_tool;
use crate::ports::codec_port::CodecPort;
use crate::ports::sink_port::SinkPort;
use std::path::Path;

/// Zero-padded width of the numeric chunk suffix.
pub const CHUNK_SUFFIX_LENGTH: u32 = 8;

/// Whether a format gets an escape stage.
///
/// DELIMITED always does: the raw stream has no newlines to split on.
/// TSV only for redshift-style escaping, JSON only to restore dotted
/// keys, unless the policy forces it.
pub fn needs_escape_stage(spec: &ExportSpec, has_masked_columns: bool) -> bool {
    let forced = spec.escape_policy == EscapePolicy::Always;
    match spec.format {
        Format::Delimited => true,
        Format::Tsv => spec.redshift_escape || forced,
        Format::Json => has_masked_columns || forced,
    }
}

/// Composes consumer pipelines. The escape stage runs `<program> <args..> <kind>`.
#[derive(Debug, Clone)]
pub struct PipelineComposer {
    escape_program: String,
    escape_args: Vec<String>,
}

impl PipelineComposer {
    pub fn new(escape_program: impl Into<String>, escape_args: Vec<String>) -> Self {
        Self {
            escape_program: escape_program.into(),
            escape_args,
        }
    }

    /// Points the escape stage at the running executable's `escape` command group.
    pub fn for_current_exe() -> Result<Self> {
        let exe = std::env::current_exe()?;
        let exe = exe.to_str().ok_or_else(|| {
            ExportError::ConfigError(format!("executable path {:?} is not UTF-8", exe))
        })?;
        Ok(Self::new(exe, vec!["escape".to_string()]))
    }

    fn escape_command(&self, kind: EscapeKind) -> StageCommand {
        StageCommand::new(self.escape_program.as_str())
            .args(self.escape_args.iter().map(String::as_str))
            .arg(kind.subcommand())
    }

    /// `[reader, escape?, chunk-splitter(filter = [compress?, sink])]`
    pub fn compose(
        &self,
        spec: &ExportSpec,
        has_masked_columns: bool,
        channel: &Path,
        destination: &DestinationTemplate,
        sink: &dyn SinkPort,
        codec: Option<&dyn CodecPort>,
    ) -> Result<Vec<PipelineStage>> {
        if spec.chunk_lines == 0 {
            return Err(ExportError::ConfigError(
                "chunk lines must be at least 1".to_string(),
            ));
        }
        let channel = channel.to_str().ok_or_else(|| {
            ExportError::CommandError(format!("channel path {:?} is not UTF-8", channel))
        })?;

        let mut stages = vec![PipelineStage {
            role: StageRole::Reader,
            command: StageCommand::new(gnu_tool("cat")).arg(channel),
        }];

        if needs_escape_stage(spec, has_masked_columns) {
            let kind = spec.format.escape_kind();
            stages.push(PipelineStage {
                role: StageRole::Escape(kind),
                command: self.escape_command(kind),
            });
        }

        let mut filter = Vec::with_capacity(2);
        if let Some(codec) = codec {
            filter.push(codec.compress_command(spec.compress_level));
        }
        filter.push(sink.write_command(destination));

        stages.push(PipelineStage {
            role: StageRole::ChunkSplitter,
            command: StageCommand::new(gnu_tool("split"))
                .arg("-l")
                .arg(spec.chunk_lines.to_string())
                .arg("--numeric-suffixes")
                .arg(format!("--suffix-length={}", CHUNK_SUFFIX_LENGTH))
                .arg("--filter")
                .arg(Arg::Filter(filter))
                .arg("-")
                .arg(spec.chunk_prefix.as_str()),
        });

        Ok(stages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::CompressionKind;
    use crate::infrastructure::codec_adapter::CliCodecAdapter;
    use crate::infrastructure::shell::render_chain;
    use crate::infrastructure::sinks::local_sink_adapter::LocalSinkAdapter;
    use crate::infrastructure::sinks::s3_sink_adapter::S3SinkAdapter;

    fn spec(format: Format) -> ExportSpec {
        ExportSpec {
            table: "[dbo].[orders]".into(),
            format,
            compression: CompressionKind::Lzop,
            compress_level: 6,
            chunk_lines: 1000,
            destination: "s3://bucket/orders".into(),
            chunk_prefix: "part-".into(),
            escape_policy: EscapePolicy::IfNeeded,
            redshift_escape: false,
            prevent_precision_loss: true,
        }
    }

    fn composer() -> PipelineComposer {
        PipelineComposer::new("/usr/local/bin/stx", vec!["escape".into()])
    }

    fn roles(stages: &[PipelineStage]) -> Vec<StageRole> {
        stages.iter().map(|s| s.role.clone()).collect()
    }

    fn compose(spec: &ExportSpec, masked: bool) -> Vec<PipelineStage> {
        let dest = DestinationTemplate::new(&spec.destination, ".json.lzo");
        composer()
            .compose(
                spec,
                masked,
                Path::new("/tmp/stx-1/fifo.json.lzo"),
                &dest,
                &S3SinkAdapter,
                Some(&CliCodecAdapter::LZOP),
            )
            .unwrap()
    }

    #[test]
    fn test_json_without_dots_has_no_escape_stage() {
        let stages = compose(&spec(Format::Json), false);
        assert_eq!(roles(&stages), vec![StageRole::Reader, StageRole::ChunkSplitter]);
    }

    #[test]
    fn test_json_with_dots_escapes() {
        let stages = compose(&spec(Format::Json), true);
        assert_eq!(
            roles(&stages),
            vec![
                StageRole::Reader,
                StageRole::Escape(EscapeKind::Json),
                StageRole::ChunkSplitter
            ]
        );
        assert_eq!(
            stages[1].command,
            StageCommand::new("/usr/local/bin/stx").args(["escape", "json"])
        );
    }

    #[test]
    fn test_delimited_always_escapes() {
        let stages = compose(&spec(Format::Delimited), false);
        assert_eq!(stages[1].role, StageRole::Escape(EscapeKind::Csv));
    }

    #[test]
    fn test_tsv_escape_triggers() {
        let mut s = spec(Format::Tsv);
        assert_eq!(compose(&s, false).len(), 2);

        s.redshift_escape = true;
        assert_eq!(compose(&s, false)[1].role, StageRole::Escape(EscapeKind::Tsv));

        s.redshift_escape = false;
        s.escape_policy = EscapePolicy::Always;
        assert_eq!(compose(&s, false).len(), 3);
    }

    #[test]
    fn test_always_policy_escapes_json() {
        let mut s = spec(Format::Json);
        s.escape_policy = EscapePolicy::Always;
        assert!(needs_escape_stage(&s, false));
    }

    #[test]
    fn test_reader_and_splitter_commands() {
        let stages = compose(&spec(Format::Json), false);
        assert_eq!(
            stages[0].command,
            StageCommand::new(gnu_tool("cat")).arg("/tmp/stx-1/fifo.json.lzo")
        );

        let splitter = &stages[1].command;
        assert_eq!(splitter.program, gnu_tool("split"));
        assert_eq!(splitter.args[0], Arg::from("-l"));
        assert_eq!(splitter.args[1], Arg::from("1000"));
        assert!(splitter.args.contains(&Arg::from("--suffix-length=8")));
        assert_eq!(splitter.args.last(), Some(&Arg::from("part-")));

        let filter = splitter
            .args
            .iter()
            .find_map(|a| match a {
                Arg::Filter(chain) => Some(chain),
                _ => None,
            })
            .unwrap();
        let rendered = render_chain(filter).unwrap();
        assert!(rendered.starts_with("lzop -6 | aws s3 cp "), "{}", rendered);
        assert!(rendered.ends_with("\"$FILE\".json.lzo"), "{}", rendered);
    }

    #[test]
    fn test_uncompressed_filter_is_sink_only() {
        let s = spec(Format::Tsv);
        let dest = DestinationTemplate::new("/data/out", ".tsv");
        let stages = composer()
            .compose(&s, false, Path::new("/tmp/f"), &dest, &LocalSinkAdapter, None)
            .unwrap();
        match &stages[1].command.args[5] {
            Arg::Filter(chain) => {
                assert_eq!(chain.len(), 1);
                assert_eq!(chain[0].program, gnu_tool("cat"));
            }
            other => panic!("expected filter, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_chunk_lines_rejected() {
        let mut s = spec(Format::Json);
        s.chunk_lines = 0;
        let dest = DestinationTemplate::new("/out", ".json");
        assert!(composer()
            .compose(&s, false, Path::new("/tmp/f"), &dest, &LocalSinkAdapter, None)
            .is_err());
    }
}
