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

//! Destination sinks, chosen by URI prefix.

pub mod local_sink_adapter;
pub mod s3_sink_adapter;

use crate::ports::sink_port::SinkPort;
use local_sink_adapter::LocalSinkAdapter;
use s3_sink_adapter::{S3SinkAdapter, S3_SCHEME};
use std::sync::Arc;

/// `s3://...` goes to S3, anything else is a local path.
pub fn sink_for_uri(uri: &str) -> Arc<dyn SinkPort> {
    if uri.starts_with(S3_SCHEME) {
        Arc::new(S3SinkAdapter)
    } else {
        Arc::new(LocalSinkAdapter)
    }
}
