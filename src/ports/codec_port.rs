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

//! # Codec Port
//!
//! A stream compressor: reads stdin, writes compressed bytes to stdout.

use crate::domain::command::StageCommand;

pub trait CodecPort: Send + Sync {
    /// The compressor invocation at `level`.
    fn compress_command(&self, level: u32) -> StageCommand;

    /// Filename extension token including the dot, e.g. `.lzo`.
    fn extension(&self) -> &'static str;
}
