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

//! Infrastructure adapter that exports query results with the `bcp` utility.

use crate::domain::command::StageCommand;
use crate::domain::entities::Format;
use crate::domain::errors::{ExportError, Result};
use crate::infrastructure::mssql::connection::SqlCreds;
use crate::ports::extraction_port::ExtractionPort;
use std::path::Path;

pub const DEFAULT_PACKET_SIZE: u32 = 65535;

/// Concrete implementation of `ExtractionPort` backed by `bcp queryout`.
///
/// Rows are written as UTF-8 character data (`-c -C 65001`). DELIMITED and
/// TSV exports get explicit field/row terminators; JSON rows are a single
/// column so the defaults apply.
pub struct BcpExtractionAdapter {
    creds: SqlCreds,
    packet_size: u32,
}

impl BcpExtractionAdapter {
    pub fn new(creds: SqlCreds, packet_size: u32) -> Self {
        Self { creds, packet_size }
    }
}

impl ExtractionPort for BcpExtractionAdapter {
    fn extraction_command(
        &self,
        statement: &str,
        format: Format,
        channel: &Path,
    ) -> Result<StageCommand> {
        let channel = channel.to_str().ok_or_else(|| {
            ExportError::CommandError(format!("channel path {:?} is not UTF-8", channel))
        })?;

        let mut cmd = StageCommand::new("bcp")
            .arg(statement)
            .arg("queryout")
            .arg(channel)
            .args(["-S", &self.creds.server_arg()])
            .args(["-d", &self.creds.database])
            // SET QUOTED_IDENTIFIER ON, needed for Azure SQL DW.
            .arg("-q")
            .args(["-c", "-C", "65001"])
            .args(["-a", &self.packet_size.to_string()])
            .args(["-U", &self.creds.username])
            .args(["-P", &self.creds.password]);

        if let Some((field, row)) = format.terminators() {
            cmd = cmd.args(["-t", field, "-r", row]);
        }
        Ok(cmd)
    }
}
