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

//! Infrastructure adapter for reading SQL Server table metadata through `sqlcmd`.

use crate::domain::entities::ColumnDescriptor;
use crate::domain::errors::{ExportError, Result};
use crate::infrastructure::mssql::connection::SqlCreds;
use crate::ports::catalog_port::CatalogPort;
use log::debug;
use std::process::Command;

const FIELD_SEPARATOR: &str = "\t";

const SQL_GET_COLUMNS: &str = "
    SELECT c.column_name, UPPER(c.data_type)
    FROM information_schema.columns c
    JOIN sys.tables t ON c.table_name = t.name
    JOIN sys.schemas s ON t.schema_id = s.schema_id AND c.table_schema = s.name
    WHERE t.object_id = OBJECT_ID('{table}')
    ORDER BY c.ordinal_position
";

const SQL_SPACE_USED: &str = "EXEC sp_spaceused '{table}'";

/// Concrete implementation of `CatalogPort` for SQL Server.
///
/// Every call runs one `sqlcmd` batch without headers, tab-separated and
/// whitespace-trimmed, and parses stdout.
pub struct MssqlCatalogAdapter {
    creds: SqlCreds,
    program: String,
}

impl MssqlCatalogAdapter {
    pub fn new(creds: SqlCreds) -> Self {
        Self {
            creds,
            program: "sqlcmd".to_string(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn run_query(&self, sql: &str) -> Result<String> {
        let batch = format!("SET NOCOUNT ON; {}", one_line(sql));
        debug!("sqlcmd batch: {}", batch);

        let output = Command::new(&self.program)
            .args(["-S", &self.creds.server_arg()])
            .args(["-d", &self.creds.database])
            .args(["-U", &self.creds.username])
            .args(["-P", &self.creds.password])
            .args(["-h", "-1", "-W", "-b", "-s", FIELD_SEPARATOR])
            .args(["-Q", &batch])
            .output()
            .map_err(|e| ExportError::CatalogError(format!("failed to run sqlcmd: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            return Err(ExportError::CatalogError(format!(
                "sqlcmd failed: {} {}",
                stderr.trim(),
                stdout.trim()
            )));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| ExportError::CatalogError(format!("sqlcmd output is not UTF-8: {}", e)))
    }
}

impl CatalogPort for MssqlCatalogAdapter {
    fn columns_of(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        let sql = SQL_GET_COLUMNS.replace("{table}", &sql_literal(table));
        let columns = parse_columns(&self.run_query(&sql)?);
        if columns.is_empty() {
            return Err(ExportError::CatalogError(format!(
                "no columns found for table {}",
                table
            )));
        }
        Ok(columns)
    }

    fn estimated_data_bytes(&self, table: &str) -> Result<u64> {
        let sql = SQL_SPACE_USED.replace("{table}", &sql_literal(table));
        parse_space_used(&self.run_query(&sql)?)
    }
}

/// Escapes a value for use inside a single-quoted T-SQL literal.
fn sql_literal(value: &str) -> String {
    value.replace('\'', "''")
}

fn one_line(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_columns(stdout: &str) -> Vec<ColumnDescriptor> {
    stdout
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|l| {
            let (name, sql_type) = l.split_once(FIELD_SEPARATOR)?;
            Some(ColumnDescriptor::new(name, sql_type.trim().to_uppercase()))
        })
        .collect()
}

/// Reads the `data` column ("N KB") of `sp_spaceused` as bytes.
fn parse_space_used(stdout: &str) -> Result<u64> {
    let row = stdout
        .lines()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| ExportError::CatalogError("sp_spaceused returned no rows".to_string()))?;

    let data = row
        .split(FIELD_SEPARATOR)
        .nth(3)
        .ok_or_else(|| ExportError::CatalogError(format!("unexpected sp_spaceused row {:?}", row)))?;

    let kb = data
        .trim()
        .trim_end_matches("KB")
        .trim()
        .parse::<u64>()
        .map_err(|_| ExportError::CatalogError(format!("unexpected data size {:?}", data)))?;

    Ok(kb * 1024)
}
