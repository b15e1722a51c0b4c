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

//! # Catalog Port
//!
//! This Port defines what the export needs to know about a source table
//! before anything is started: its columns and a rough data size. It
//! doesn't care how the answers are obtained; the SQL Server adapter
//! shells out to `sqlcmd`, tests use a mock.

use crate::domain::entities::ColumnDescriptor;
use crate::domain::errors::Result;

/// `CatalogPort` answers shape and size questions about a table.
pub trait CatalogPort: Send + Sync {
    /// Returns the table's columns in ordinal order.
    ///
    /// A failure here is fatal: no projection can be built without columns.
    fn columns_of(&self, table: &str) -> Result<Vec<ColumnDescriptor>>;

    /// Returns the estimated size of the table data in bytes.
    ///
    /// Callers treat a failure as "size unknown" and carry on.
    fn estimated_data_bytes(&self, table: &str) -> Result<u64>;
}
