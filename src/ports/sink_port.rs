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

//! # Sink Port
//!
//! The final stage of every chunk: moves the bytes arriving on stdin to
//! the destination named by a `DestinationTemplate`.

use crate::domain::command::{DestinationTemplate, StageCommand};
use crate::domain::errors::Result;

pub trait SinkPort: Send + Sync {
    /// Short name for logs ("local", "s3").
    fn name(&self) -> &'static str;

    /// Side effects needed before any chunk is written (e.g. creating a directory).
    fn prepare(&self, _destination: &DestinationTemplate) -> Result<()> {
        Ok(())
    }

    /// The command that writes stdin to the chunk's destination.
    fn write_command(&self, destination: &DestinationTemplate) -> StageCommand;
}
