// ABOUTME: MySQL introspection and paged data reading for backups
// ABOUTME: Implements the DumpSource capability on top of a single connection

use super::converter::{column_type_class, value_to_cell};
use super::quote_identifier;
use crate::dump::{DumpSource, Page, TypeClass};
use crate::error::{DumpError, Result};
use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{Conn, Row, Value};

/// Server error code for "Table doesn't exist"
const ER_NO_SUCH_TABLE: u16 = 1146;

/// `DumpSource` backed by one MySQL connection
///
/// Table names are resolved against the connection's default database.
pub struct MySqlSource {
    conn: Conn,
}

impl MySqlSource {
    pub fn new(conn: Conn) -> Self {
        Self { conn }
    }

    /// Closes the connection gracefully
    pub async fn disconnect(self) -> Result<()> {
        self.conn
            .disconnect()
            .await
            .map_err(|e| DumpError::connection("Failed to close MySQL connection", e))
    }
}

#[async_trait]
impl DumpSource for MySqlSource {
    async fn list_tables(&mut self, schema: &str) -> Result<Vec<String>> {
        tracing::info!("Listing tables from MySQL database '{}'", schema);

        let query = format!("SHOW TABLES FROM {}", quote_identifier(schema));
        let tables: Vec<String> = self.conn.query(query).await.map_err(|e| {
            DumpError::query(
                format!("Failed to list tables from database '{}'", schema),
                e,
            )
        })?;

        Ok(tables)
    }

    async fn create_table_statement(&mut self, table: &str) -> Result<Option<String>> {
        let query = format!("SHOW CREATE TABLE {}", quote_identifier(table));

        let row: Option<Row> = match self.conn.query_first(query).await {
            Ok(row) => row,
            Err(mysql_async::Error::Server(ref e)) if e.code == ER_NO_SUCH_TABLE => {
                tracing::debug!("Table '{}' disappeared before extraction", table);
                return Ok(None);
            }
            Err(e) => {
                return Err(DumpError::query(
                    format!("Failed to read CREATE TABLE for '{}'", table),
                    e,
                ))
            }
        };

        // Views answer with a `Create View` column instead.
        let ddl = row
            .and_then(|row| row.get_opt::<String, _>("Create Table"))
            .and_then(|value| value.ok())
            .filter(|ddl| !ddl.is_empty());

        Ok(ddl)
    }

    async fn count_rows(&mut self, table: &str) -> Result<u64> {
        let query = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));

        let count: Option<u64> = self
            .conn
            .query_first(query)
            .await
            .map_err(|e| DumpError::query(format!("Failed to count rows in '{}'", table), e))?;

        let count = count.unwrap_or(0);
        tracing::debug!("Table '{}' has {} rows", table, count);

        Ok(count)
    }

    async fn fetch_page(&mut self, table: &str, limit: u64, offset: u64) -> Result<Page> {
        let query = format!(
            "SELECT * FROM {} LIMIT {} OFFSET {}",
            quote_identifier(table),
            limit,
            offset
        );
        tracing::debug!("{}", query);

        let rows: Vec<Row> = self.conn.query(query).await.map_err(|e| {
            DumpError::query(
                format!("Failed to read rows of '{}' at offset {}", table, offset),
                e,
            )
        })?;

        let Some(first) = rows.first() else {
            return Ok(Page::default());
        };
        let classes: Vec<TypeClass> = first.columns_ref().iter().map(column_type_class).collect();

        let mut page = Page {
            rows: Vec::with_capacity(rows.len()),
        };
        for row in rows {
            let mut cells = Vec::with_capacity(classes.len());
            for (idx, class) in classes.iter().enumerate() {
                let value: Value = row.get(idx).ok_or_else(|| {
                    DumpError::query_msg(format!(
                        "Missing column {} in row of table '{}'",
                        idx, table
                    ))
                })?;
                cells.push(value_to_cell(value, *class));
            }
            page.rows.push(cells);
        }

        Ok(page)
    }
}
