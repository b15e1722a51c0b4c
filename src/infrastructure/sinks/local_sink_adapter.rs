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

//! Sink adapter writing chunks to the local filesystem.

use crate::domain::command::{Arg, DestinationTemplate, StageCommand};
use crate::domain::errors::Result;
use crate::infrastructure::shell::gnu_tool;
use crate::ports::sink_port::SinkPort;
use log::debug;

/// `cat > <dir>/$FILE<ext>`
pub struct LocalSinkAdapter;

impl SinkPort for LocalSinkAdapter {
    fn name(&self) -> &'static str {
        "local"
    }

    fn prepare(&self, destination: &DestinationTemplate) -> Result<()> {
        debug!("Creating output directory {}", destination.base);
        std::fs::create_dir_all(&destination.base)?;
        Ok(())
    }

    fn write_command(&self, destination: &DestinationTemplate) -> StageCommand {
        StageCommand::new(gnu_tool("cat")).stdout_to(Arg::Destination(destination.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("a/b/c");
        let dest = DestinationTemplate::new(dir.to_str().unwrap(), ".csv");
        LocalSinkAdapter.prepare(&dest).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_write_command_redirects_to_destination() {
        let dest = DestinationTemplate::new("/data/out", ".tsv");
        let cmd = LocalSinkAdapter.write_command(&dest);
        assert!(cmd.args.is_empty());
        assert_eq!(cmd.stdout_to, Some(Arg::Destination(dest)));
    }
}
