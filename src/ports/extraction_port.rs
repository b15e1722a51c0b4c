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

//! # Extraction Port
//!
//! This Port defines the contract for the "Data Mover" on the source side.
//!
//! Anything that implements `ExtractionPort` must be able to turn an
//! extraction statement into an external command that writes the result
//! rows into the rendezvous channel at `channel`.

use crate::domain::command::StageCommand;
use crate::domain::entities::Format;
use crate::domain::errors::Result;
use std::path::Path;

/// `ExtractionPort` builds the command for the Extraction Task.
pub trait ExtractionPort: Send + Sync {
    /// Builds the extractor invocation.
    ///
    /// The command opens `channel` for writing, so it blocks until the
    /// pipeline's reader stage has opened the other end.
    fn extraction_command(
        &self,
        statement: &str,
        format: Format,
        channel: &Path,
    ) -> Result<StageCommand>;
}
