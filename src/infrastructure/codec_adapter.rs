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

//! Compression codecs run as external stream compressors.

use crate::domain::command::StageCommand;
use crate::domain::entities::CompressionKind;
use crate::ports::codec_port::CodecPort;
use std::sync::Arc;

pub const DEFAULT_COMPRESS_LEVEL: u32 = 6;

/// A compressor binary that takes `-<level>` and filters stdin to stdout.
pub struct CliCodecAdapter {
    program: &'static str,
    extension: &'static str,
}

impl CliCodecAdapter {
    pub const LZOP: CliCodecAdapter = CliCodecAdapter {
        program: "lzop",
        extension: ".lzo",
    };

    pub const GZIP: CliCodecAdapter = CliCodecAdapter {
        program: "gzip",
        extension: ".gz",
    };
}

impl CodecPort for CliCodecAdapter {
    fn compress_command(&self, level: u32) -> StageCommand {
        StageCommand::new(self.program).arg(format!("-{}", level))
    }

    fn extension(&self) -> &'static str {
        self.extension
    }
}

/// The codec for a compression kind; `None` when compression is off.
pub fn codec_for(kind: CompressionKind) -> Option<Arc<dyn CodecPort>> {
    match kind {
        CompressionKind::None => None,
        CompressionKind::Lzop => Some(Arc::new(CliCodecAdapter::LZOP)),
        CompressionKind::Gzip => Some(Arc::new(CliCodecAdapter::GZIP)),
    }
}
