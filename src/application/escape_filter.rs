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

//! Streaming wrappers that run the escaping codecs as pipeline stages.
//!
//! Each filter reads records from `input` in arrival order and writes one
//! escaped line per record to `output`. The first bad record aborts the
//! filter, which surfaces as a non-zero exit of the escape stage.

use crate::domain::entities::{EscapeKind, DELIMITED_RECORD_SEPARATOR};
use crate::domain::errors::{ExportError, Result};
use crate::domain::escaping::{escape_delimited, escape_json, escape_tsv};
use log::debug;
use std::io::{BufRead, BufWriter, Write};

/// Runs the `kind` filter to completion and returns the number of records written.
pub fn run_escape<R: BufRead, W: Write>(kind: EscapeKind, input: R, output: W) -> Result<u64> {
    let count = match kind {
        EscapeKind::Csv => escape_csv_stream(input, output)?,
        EscapeKind::Tsv => escape_lines(input, output, |line| Ok(escape_tsv(line)))?,
        // Blank lines are not JSON objects and fail like any other bad line.
        EscapeKind::Json => escape_lines(input, output, |line| {
            escape_json(line.trim_end_matches(['\n', '\r']))
        })?,
    };
    debug!("{} escape filter wrote {} records", kind.subcommand(), count);
    Ok(count)
}

fn escape_lines<R, W, F>(mut input: R, output: W, escape: F) -> Result<u64>
where
    R: BufRead,
    W: Write,
    F: Fn(&str) -> Result<String>,
{
    let mut out = BufWriter::new(output);
    let mut line = String::new();
    let mut count = 0;
    while input.read_line(&mut line)? > 0 {
        out.write_all(escape(&line)?.as_bytes())?;
        count += 1;
        line.clear();
    }
    out.flush()?;
    Ok(count)
}

/// Reads records terminated by the private record separator.
struct RecordReader<R> {
    input: R,
    buf: Vec<u8>,
}

impl<R: BufRead> RecordReader<R> {
    fn new(input: R) -> Self {
        Self {
            input,
            buf: Vec::new(),
        }
    }

    /// The next record without its separator; a trailing unterminated record is returned as is.
    fn next_record(&mut self) -> Result<Option<String>> {
        let sep = DELIMITED_RECORD_SEPARATOR.as_bytes();
        let last = sep[sep.len() - 1];
        self.buf.clear();
        loop {
            let n = self.input.read_until(last, &mut self.buf)?;
            if n == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                break;
            }
            if self.buf.ends_with(sep) {
                self.buf.truncate(self.buf.len() - sep.len());
                break;
            }
        }
        let record = std::str::from_utf8(&self.buf).map_err(|e| {
            ExportError::MalformedRecordError(format!("record is not valid UTF-8: {}", e))
        })?;
        Ok(Some(record.to_string()))
    }
}

fn escape_csv_stream<R: BufRead, W: Write>(input: R, output: W) -> Result<u64> {
    let mut records = RecordReader::new(input);
    let mut out = BufWriter::new(output);
    let mut count = 0;
    while let Some(record) = records.next_record()? {
        out.write_all(escape_delimited(&record)?.as_bytes())?;
        count += 1;
    }
    out.flush()?;
    Ok(count)
}
