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

//! # Escaping Codecs
//!
//! Pure, stateless record transforms. Each function takes one logical
//! record (already split off the stream by its record separator) and
//! returns the correctly escaped output line, newline included.
//!
//! The streaming wrappers that run these as pipeline stages live in
//! `application::escape_filter`.

use crate::domain::entities::{
    ColumnDescriptor, DELIMITED_FIELD_SEPARATOR, DELIMITED_RECORD_SEPARATOR,
};
use crate::domain::errors::{ExportError, Result};
use serde_json::{Map, Value};

/// Stands in for a literal `.` in JSON column aliases.
pub const DOT_MASK: &str = "||";

const CONTROL_ESCAPES: [(char, &str); 5] = [
    ('\n', "\\\n"),
    ('\t', "\\\t"),
    ('\r', "\\\r"),
    ('\u{8}', "\\\u{8}"),
    ('\u{c}', "\\\u{c}"),
];

const TSV_ESCAPES: [(&str, &str); 5] = [
    ("\\t", "\\\\t"),
    ("\\n", "\\\\n"),
    ("\\r", "\\\\r"),
    ("\\f", "\\\\f"),
    ("\\b", "\\\\b"),
];

/// Prefixes newline, tab, carriage-return, backspace and form-feed with a backslash.
pub fn escape_control_chars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match CONTROL_ESCAPES.iter().find(|(raw, _)| *raw == c) {
            Some((_, escaped)) => out.push_str(escaped),
            None => out.push(c),
        }
    }
    out
}

/// Splits a raw DELIMITED record into its escaped field values.
///
/// Fails if the record separator is still inside the record, which means
/// the stream was split incorrectly upstream.
pub fn delimited_fields(record: &str) -> Result<Vec<String>> {
    if record.contains(DELIMITED_RECORD_SEPARATOR) {
        return Err(ExportError::MalformedRecordError(format!(
            "record separator found inside record of {} bytes",
            record.len()
        )));
    }
    Ok(escape_control_chars(record)
        .split(DELIMITED_FIELD_SEPARATOR)
        .map(str::to_string)
        .collect())
}

/// Delimited-escape: quote every field, double embedded quotes, join with `,`.
///
/// This is the only delimited codec; the `stx escape csv` stage writes its output.
pub fn escape_delimited(record: &str) -> Result<String> {
    let fields = delimited_fields(record)?;
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .flexible(true)
        .from_writer(Vec::with_capacity(record.len() + fields.len() * 3 + 1));
    writer.write_record(&fields)?;
    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::IoError(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| {
        ExportError::MalformedRecordError(format!("escaped record is not valid UTF-8: {}", e))
    })
}

/// TSV-escape: doubles the backslash of `\t`, `\n`, `\r`, `\f` and `\b` sequences.
///
/// Not idempotent; apply exactly once per record.
pub fn escape_tsv(line: &str) -> String {
    if !line.contains('\\') {
        return line.to_string();
    }
    TSV_ESCAPES
        .iter()
        .fold(line.to_string(), |acc, (from, to)| acc.replace(from, to))
}

pub fn mask_dot(name: &str) -> String {
    name.replace('.', DOT_MASK)
}

pub fn unmask_dot(name: &str) -> String {
    name.replace(DOT_MASK, ".")
}

/// True if any column name carries a literal `.`.
pub fn contains_dot(columns: &[ColumnDescriptor]) -> bool {
    columns.iter().any(|c| c.name.contains('.'))
}

/// JSON-escape: restores dotted keys in one JSON object and re-serializes it compactly.
pub fn escape_json(line: &str) -> Result<String> {
    let value: Value = serde_json::from_str(line)?;
    let object = match value {
        Value::Object(object) => object,
        other => {
            return Err(ExportError::InvalidJsonError(
                <serde_json::Error as serde::de::Error>::custom(format!(
                    "expected a JSON object, found {}",
                    json_kind(&other)
                )),
            ))
        }
    };

    let unmasked: Map<String, Value> = object
        .into_iter()
        .map(|(k, v)| {
            if k.contains(DOT_MASK) {
                (unmask_dot(&k), v)
            } else {
                (k, v)
            }
        })
        .collect();

    let mut out = serde_json::to_string(&Value::Object(unmasked))?;
    out.push('\n');
    Ok(out)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[&str]) -> String {
        fields.join(DELIMITED_FIELD_SEPARATOR)
    }

    #[test]
    fn test_escape_delimited_quotes_fields() {
        let line = escape_delimited(&record(&["1", "say \"hi\"", ""])).unwrap();
        assert_eq!(line, "\"1\",\"say \"\"hi\"\"\",\"\"\n");
    }

    #[test]
    fn test_escape_delimited_control_chars() {
        let line = escape_delimited(&record(&["a\nb", "c\td\r"])).unwrap();
        assert_eq!(line, "\"a\\\nb\",\"c\\\td\\\r\"\n");
    }

    #[test]
    fn test_escape_delimited_round_trips_through_csv_reader() {
        let fields = vec!["plain", "with,comma", "quote \" inside", "", "\"\""];
        let line = escape_delimited(&record(&fields)).unwrap();

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(line.as_bytes());
        let parsed: Vec<String> = reader
            .records()
            .next()
            .unwrap()
            .unwrap()
            .iter()
            .map(str::to_string)
            .collect();
        assert_eq!(parsed, fields);
    }

    #[test]
    fn test_escape_delimited_rejects_leaked_separator() {
        let bad = format!("a{}b", DELIMITED_RECORD_SEPARATOR);
        let err = escape_delimited(&bad).unwrap_err();
        assert!(matches!(err, ExportError::MalformedRecordError(_)));
    }

    #[test]
    fn test_escape_tsv() {
        assert_eq!(escape_tsv("a\\tb"), "a\\\\tb");
        assert_eq!(escape_tsv("x\\ny\\rz\\f\\b"), "x\\\\ny\\\\rz\\\\f\\\\b");
        assert_eq!(escape_tsv("no escapes\there\n"), "no escapes\there\n");
        // Applying twice escapes twice.
        assert_eq!(escape_tsv(&escape_tsv("\\t")), "\\\\\\t");
    }

    #[test]
    fn test_mask_unmask_round_trip() {
        for name in ["a.b", "a.b.c", "...", "plain", ".lead", "trail."] {
            assert_eq!(unmask_dot(&mask_dot(name)), name);
            assert!(!mask_dot(name).contains('.'));
        }
        assert_eq!(mask_dot("a.b"), "a||b");
    }

    #[test]
    fn test_escape_json_unmasks_keys() {
        let out = escape_json(r#"{"id":1,"name":"x","a||b":2}"#).unwrap();
        assert_eq!(out, "{\"id\":1,\"name\":\"x\",\"a.b\":2}\n");
    }

    #[test]
    fn test_escape_json_keeps_nulls_and_order() {
        let out = escape_json("{\"z\":null, \"a\": \"1.500\"}\n").unwrap();
        assert_eq!(out, "{\"z\":null,\"a\":\"1.500\"}\n");
    }

    #[test]
    fn test_escape_json_invalid() {
        assert!(matches!(
            escape_json("{not json"),
            Err(ExportError::InvalidJsonError(_))
        ));
        assert!(matches!(
            escape_json("[1,2]"),
            Err(ExportError::InvalidJsonError(_))
        ));
    }

    #[test]
    fn test_contains_dot() {
        let cols = vec![ColumnDescriptor::new("id", "INT")];
        assert!(!contains_dot(&cols));
        let cols = vec![
            ColumnDescriptor::new("id", "INT"),
            ColumnDescriptor::new("a.b", "INT"),
        ];
        assert!(contains_dot(&cols));
    }
}
