// ABOUTME: Paginated row export for a single table
// ABOUTME: Fetches fixed-size windows and writes one INSERT statement per window

use super::{DumpProgress, DumpSource, Page};
use crate::error::{DumpError, Result};
use crate::mysql::quote_identifier;
use std::io::Write;

/// Rows and statements written for one table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowStats {
    pub rows: u64,
    pub statements: u64,
}

/// Renders a page as `(v1,v2),(v1,v2)`; an empty page renders to nothing
pub fn render_batch(page: &Page) -> Vec<u8> {
    let mut out = Vec::new();
    for (idx, row) in page.rows.iter().enumerate() {
        if idx > 0 {
            out.push(b',');
        }
        out.push(b'(');
        for (col, cell) in row.iter().enumerate() {
            if col > 0 {
                out.push(b',');
            }
            cell.write_literal(&mut out);
        }
        out.push(b')');
    }
    out
}

/// Streams every row of `table` into `sink`
///
/// The offset starts at 0 and advances by `page_size` after each page. The
/// only stop signal is a page that renders empty: a short page is written and
/// followed by one more query, so a row count that is an exact multiple of
/// `page_size` costs one extra empty query. Only one page is held in memory
/// at a time.
///
/// Without an `ORDER BY`, rows inserted or deleted by other sessions between
/// pages can be skipped or repeated.
pub async fn export_rows<S, W>(
    source: &mut S,
    table: &str,
    page_size: u64,
    sink: &mut W,
    progress: &mut dyn DumpProgress,
) -> Result<RowStats>
where
    S: DumpSource + ?Sized,
    W: Write + ?Sized,
{
    if page_size == 0 {
        return Err(DumpError::config("page size must be greater than zero"));
    }

    let prefix = format!("INSERT INTO {} VALUES ", quote_identifier(table));
    let mut stats = RowStats::default();
    let mut offset = 0u64;

    loop {
        let page = source.fetch_page(table, page_size, offset).await?;
        let batch = render_batch(&page);
        if batch.is_empty() {
            break;
        }

        tracing::debug!(
            "Writing {} row(s) of '{}' at offset {}",
            page.len(),
            table,
            offset
        );

        let mut statement = Vec::with_capacity(prefix.len() + batch.len() + 2);
        statement.extend_from_slice(prefix.as_bytes());
        statement.extend_from_slice(&batch);
        statement.extend_from_slice(b";\n");
        sink.write_all(&statement).map_err(|e| {
            DumpError::file(format!("Failed to write rows of table '{}'", table), e)
        })?;

        stats.rows += page.len() as u64;
        stats.statements += 1;
        progress.rows_written(page.len() as u64);
        offset += page_size;
    }

    Ok(stats)
}
