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

//! # StreamXfer
//!
//! Pipelined bulk export of SQL Server tables. `bcp` writes rows into a
//! named pipe while a separate chain of processes reads them back,
//! escapes each record for the target format, compresses, splits the
//! stream into fixed-line chunks and hands every chunk to a local or S3
//! sink.
//!
//! The crate follows the **Hexagonal Architecture** (Ports and Adapters):
//! `domain` holds the pure logic, `ports` the traits the orchestrator
//! depends on, `infrastructure` the process and SQL Server adapters.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ports;
