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

//! Sink adapter streaming chunks to S3 with the AWS CLI.

use crate::domain::command::{Arg, DestinationTemplate, StageCommand};
use crate::ports::sink_port::SinkPort;

pub const S3_SCHEME: &str = "s3://";

/// `aws s3 cp - s3://bucket/prefix/$FILE<ext>`
pub struct S3SinkAdapter;

impl SinkPort for S3SinkAdapter {
    fn name(&self) -> &'static str {
        "s3"
    }

    fn write_command(&self, destination: &DestinationTemplate) -> StageCommand {
        StageCommand::new("aws")
            .args(["s3", "cp", "-"])
            .arg(Arg::Destination(destination.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_command() {
        let dest = DestinationTemplate::new("s3://bucket/exports", ".json.lzo");
        let cmd = S3SinkAdapter.write_command(&dest);
        assert_eq!(cmd.program, "aws");
        assert_eq!(
            cmd.args,
            vec![
                Arg::from("s3"),
                Arg::from("cp"),
                Arg::from("-"),
                Arg::Destination(dest)
            ]
        );
        assert!(cmd.stdout_to.is_none());
    }
}
