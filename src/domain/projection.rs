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

//! # Query / Projection Builder
//!
//! Decides, per column, how it must be projected for the target format
//! and assembles the single T-SQL statement handed to the extractor.
//!
//! Every statement scans with the `(nolock)` hint. Bulk export accepts
//! reading uncommitted or in-flight rows so that concurrent writers are
//! never blocked; transactional consistency of the exported snapshot is
//! not provided.

use crate::domain::entities::{ColumnDescriptor, Format};
use crate::domain::escaping::{contains_dot, mask_dot};
use serde::Serialize;

const STRING_TYPES: [&str; 8] = [
    "CHAR",
    "NCHAR",
    "NTEXT",
    "NVARCHAR",
    "SQL_VARIANT",
    "TEXT",
    "VARCHAR",
    "XML",
];
const LONG_TEXT_TYPES: [&str; 2] = ["NTEXT", "TEXT"];

/// Coarse SQL type buckets that drive projection rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlTypeClass {
    StringLike { long_text: bool },
    Float,
    Exact,
    Other,
}

impl SqlTypeClass {
    /// Classifies a catalog type name such as `nvarchar`, `DECIMAL(18,2)` or `float`.
    pub fn of(sql_type: &str) -> Self {
        let upper = sql_type.to_uppercase();
        let base = upper.split('(').next().unwrap_or("").trim();
        if STRING_TYPES.contains(&base) {
            SqlTypeClass::StringLike {
                long_text: LONG_TEXT_TYPES.contains(&base),
            }
        } else if base == "FLOAT" {
            SqlTypeClass::Float
        } else if base == "NUMERIC" || base == "DECIMAL" {
            SqlTypeClass::Exact
        } else {
            SqlTypeClass::Other
        }
    }
}

/// How one column is projected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectedColumn {
    pub source_expr: String,
    /// Unquoted alias; never contains a literal `.` for JSON exports.
    pub output_alias: String,
    pub needs_string_escape: bool,
    pub needs_numeric_widen: bool,
}

impl ProjectedColumn {
    /// `<expr> AS [alias]`
    pub fn render(&self) -> String {
        format!("{} AS {}", self.source_expr, quote_ident(&self.output_alias))
    }
}

/// Ordered projection for one export, one entry per column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectionPlan {
    pub columns: Vec<ProjectedColumn>,
    /// True when at least one alias was dot-masked.
    pub masked_dots: bool,
}

/// Brackets a T-SQL identifier, doubling any closing bracket.
pub fn quote_ident(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Builds the per-column projection for `format`.
pub fn build_projection(
    columns: &[ColumnDescriptor],
    format: Format,
    prevent_precision_loss: bool,
) -> ProjectionPlan {
    let mask = format == Format::Json && contains_dot(columns);

    let projected = columns
        .iter()
        .map(|c| project_column(c, format, mask, prevent_precision_loss))
        .collect();

    ProjectionPlan {
        columns: projected,
        masked_dots: mask,
    }
}

fn project_column(
    column: &ColumnDescriptor,
    format: Format,
    mask: bool,
    prevent_precision_loss: bool,
) -> ProjectedColumn {
    let reference = quote_ident(&column.name);
    let output_alias = if mask {
        mask_dot(&column.name)
    } else {
        column.name.clone()
    };
    let plain = ProjectedColumn {
        source_expr: reference.clone(),
        output_alias,
        needs_string_escape: false,
        needs_numeric_widen: false,
    };

    match (format, SqlTypeClass::of(&column.sql_type)) {
        (Format::Tsv, SqlTypeClass::StringLike { long_text }) => {
            let widened = if long_text {
                format!("CONVERT(NVARCHAR(MAX), {})", reference)
            } else {
                reference
            };
            ProjectedColumn {
                source_expr: format!("STRING_ESCAPE({}, 'json')", widened),
                needs_string_escape: true,
                ..plain
            }
        }
        (Format::Json, SqlTypeClass::Float) if prevent_precision_loss => ProjectedColumn {
            source_expr: format!(
                "CONVERT(VARCHAR(MAX), CONVERT(DECIMAL(38,15), {}))",
                reference
            ),
            needs_numeric_widen: true,
            ..plain
        },
        (Format::Json, SqlTypeClass::Exact) if prevent_precision_loss => ProjectedColumn {
            source_expr: format!("CONVERT(VARCHAR(MAX), {})", reference),
            needs_numeric_widen: true,
            ..plain
        },
        _ => plain,
    }
}

/// Assembles the single-line extraction statement for a projection.
pub fn build_statement(table: &str, format: Format, plan: &ProjectionPlan) -> String {
    let expr = plan
        .columns
        .iter()
        .map(ProjectedColumn::render)
        .collect::<Vec<_>>()
        .join(", ");

    match format {
        Format::Json => format!(
            "SELECT (SELECT {} FOR JSON PATH, INCLUDE_NULL_VALUES, WITHOUT_ARRAY_WRAPPER) FROM {} (nolock)",
            expr, table
        ),
        Format::Delimited | Format::Tsv => format!("SELECT {} FROM {} (nolock)", expr, table),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::new("id", "INT"),
            ColumnDescriptor::new("name", "NVARCHAR"),
            ColumnDescriptor::new("a.b", "INT"),
        ]
    }

    #[test]
    fn test_classify_types() {
        assert_eq!(
            SqlTypeClass::of("nvarchar"),
            SqlTypeClass::StringLike { long_text: false }
        );
        assert_eq!(
            SqlTypeClass::of("NTEXT"),
            SqlTypeClass::StringLike { long_text: true }
        );
        assert_eq!(SqlTypeClass::of("float"), SqlTypeClass::Float);
        assert_eq!(SqlTypeClass::of("DECIMAL(18,2)"), SqlTypeClass::Exact);
        assert_eq!(SqlTypeClass::of("NUMERIC"), SqlTypeClass::Exact);
        assert_eq!(SqlTypeClass::of("DATETIME2"), SqlTypeClass::Other);
    }

    #[test]
    fn test_delimited_is_plain() {
        let plan = build_projection(&cols(), Format::Delimited, true);
        let sql = build_statement("[dbo].[t]", Format::Delimited, &plan);
        assert_eq!(
            sql,
            "SELECT [id] AS [id], [name] AS [name], [a.b] AS [a.b] FROM [dbo].[t] (nolock)"
        );
        assert!(!plan.masked_dots);
    }

    #[test]
    fn test_json_masks_dotted_alias() {
        let plan = build_projection(&cols(), Format::Json, true);
        assert!(plan.masked_dots);
        assert_eq!(plan.columns[2].output_alias, "a||b");
        assert_eq!(plan.columns[2].source_expr, "[a.b]");
        assert_eq!(plan.columns[0].output_alias, "id");

        let sql = build_statement("[dbo].[t]", Format::Json, &plan);
        assert_eq!(
            sql,
            "SELECT (SELECT [id] AS [id], [name] AS [name], [a.b] AS [a||b] \
             FOR JSON PATH, INCLUDE_NULL_VALUES, WITHOUT_ARRAY_WRAPPER) FROM [dbo].[t] (nolock)"
        );
    }

    #[test]
    fn test_json_precision() {
        let columns = vec![
            ColumnDescriptor::new("f", "FLOAT"),
            ColumnDescriptor::new("d", "DECIMAL"),
            ColumnDescriptor::new("n", "NUMERIC"),
            ColumnDescriptor::new("i", "BIGINT"),
        ];
        let plan = build_projection(&columns, Format::Json, true);
        assert_eq!(
            plan.columns[0].render(),
            "CONVERT(VARCHAR(MAX), CONVERT(DECIMAL(38,15), [f])) AS [f]"
        );
        assert_eq!(plan.columns[1].render(), "CONVERT(VARCHAR(MAX), [d]) AS [d]");
        assert!(plan.columns[2].needs_numeric_widen);
        assert_eq!(plan.columns[3].render(), "[i] AS [i]");

        let plan = build_projection(&columns, Format::Json, false);
        assert!(plan.columns.iter().all(|c| !c.needs_numeric_widen));
        assert_eq!(plan.columns[0].render(), "[f] AS [f]");
    }

    #[test]
    fn test_tsv_string_escape() {
        let columns = vec![
            ColumnDescriptor::new("body", "NTEXT"),
            ColumnDescriptor::new("title", "VARCHAR"),
            ColumnDescriptor::new("n", "INT"),
        ];
        let plan = build_projection(&columns, Format::Tsv, true);
        assert_eq!(
            plan.columns[0].render(),
            "STRING_ESCAPE(CONVERT(NVARCHAR(MAX), [body]), 'json') AS [body]"
        );
        assert_eq!(
            plan.columns[1].render(),
            "STRING_ESCAPE([title], 'json') AS [title]"
        );
        assert!(plan.columns[1].needs_string_escape);
        assert_eq!(plan.columns[2].render(), "[n] AS [n]");
    }

    #[test]
    fn test_tsv_does_not_mask_dots() {
        let plan = build_projection(&cols(), Format::Tsv, true);
        assert_eq!(plan.columns[2].output_alias, "a.b");
        assert!(!plan.masked_dots);
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("weird]name"), "[weird]]name]");
    }
}
