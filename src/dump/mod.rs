// ABOUTME: Schema-and-data export engine
// ABOUTME: Defines the database capability seam and drives script assembly

pub mod literal;
pub mod rows;
pub mod script;

pub use literal::{encode_literal, escape_into, Cell, TypeClass};
pub use rows::{export_rows, render_batch, RowStats};
pub use script::{write_script, ExportSummary, ScriptHeader};

use crate::error::Result;
use crate::filters::TableFilter;
use async_trait::async_trait;
use std::path::PathBuf;

/// One bounded window of rows, already classified per column
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub rows: Vec<Vec<Cell>>,
}

impl Page {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Read-only database capability the engine runs against
///
/// Every call is awaited to completion before the next one is issued.
#[async_trait]
pub trait DumpSource: Send {
    /// Table names in `schema`, in the order the server returns them
    async fn list_tables(&mut self, schema: &str) -> Result<Vec<String>>;

    /// DDL that recreates `table`, or `None` when the table no longer exists
    /// or is not a base table
    async fn create_table_statement(&mut self, table: &str) -> Result<Option<String>>;

    async fn count_rows(&mut self, table: &str) -> Result<u64>;

    /// Rows `offset..offset + limit` of `table`
    async fn fetch_page(&mut self, table: &str, limit: u64, offset: u64) -> Result<Page>;
}

/// Where the script is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    File(PathBuf),
    Stdout,
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Destination::File(path) => write!(f, "{}", path.display()),
            Destination::Stdout => write!(f, "<stdout>"),
        }
    }
}

/// A fully validated export job
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub schema: String,
    pub filter: TableFilter,
    /// Rows fetched per query, always greater than zero
    pub page_size: u64,
    pub destination: Destination,
}

/// Observer for per-table progress
pub trait DumpProgress {
    fn table_started(&mut self, _table: &str, _total_rows: u64) {}
    fn rows_written(&mut self, _rows: u64) {}
    fn table_finished(&mut self, _table: &str) {}
}

/// Progress observer that reports nothing
#[derive(Debug, Default)]
pub struct NoProgress;

impl DumpProgress for NoProgress {}
