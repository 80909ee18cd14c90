// ABOUTME: Assembles the full backup script from discovered tables
// ABOUTME: Writes header, per-table DROP/CREATE blocks and row data in discovery order

use super::rows::export_rows;
use super::{DumpProgress, DumpSource, ExportRequest};
use crate::error::{DumpError, Result};
use crate::mysql::quote_identifier;
use chrono::NaiveDateTime;
use std::io::Write;

/// Attribution written into every script header
pub const SUPPORT: &str = concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"));

/// Values shown in the script's leading comment block
#[derive(Debug, Clone)]
pub struct ScriptHeader {
    pub host: String,
    pub schema: String,
    pub generated_at: NaiveDateTime,
}

/// Makes `text` safe to place on a `--` comment line
///
/// A line break inside a name would end the comment and turn the rest of the
/// name into live SQL on restore, so CR and LF are written as `\r` and `\n`.
fn comment_text(text: &str) -> String {
    text.replace('\r', "\\r").replace('\n', "\\n")
}

impl ScriptHeader {
    fn render(&self) -> String {
        format!(
            "-- Host: {}     Database: {} \n-- Date: {}     Support: {} \n\n\n",
            comment_text(&self.host),
            comment_text(&self.schema),
            self.generated_at.format("%Y-%m-%d %H:%M:%S"),
            SUPPORT
        )
    }
}

/// Totals for one export run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub tables_discovered: usize,
    /// Tables with a DROP/CREATE block in the script
    pub tables_written: usize,
    pub tables_with_data: usize,
    /// Tables excluded by the allow-list or gone before extraction
    pub tables_skipped: usize,
    pub rows_written: u64,
    pub statements_written: u64,
}

/// What happened to one discovered table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableOutcome {
    Excluded,
    Vanished,
    SchemaOnly,
    Empty,
    WithData { rows: u64, statements: u64 },
}

impl ExportSummary {
    fn record(&mut self, outcome: TableOutcome) {
        match outcome {
            TableOutcome::Excluded | TableOutcome::Vanished => self.tables_skipped += 1,
            TableOutcome::SchemaOnly | TableOutcome::Empty => self.tables_written += 1,
            TableOutcome::WithData { rows, statements } => {
                self.tables_written += 1;
                self.tables_with_data += 1;
                self.rows_written += rows;
                self.statements_written += statements;
            }
        }
    }
}

fn write_text<W: Write + ?Sized>(sink: &mut W, text: &str) -> Result<()> {
    sink.write_all(text.as_bytes())
        .map_err(|e| DumpError::file("Failed to write backup script", e))
}

/// Writes the complete script for `request` into `sink`
///
/// Tables are processed one at a time in the order the source lists them.
/// Each unit of output goes to the sink as soon as it is produced and the sink
/// is flushed once every table is done. On error the sink is left as-is; the
/// caller owns it and releases it on drop.
pub async fn write_script<S, W>(
    source: &mut S,
    sink: &mut W,
    request: &ExportRequest,
    header: &ScriptHeader,
    progress: &mut dyn DumpProgress,
) -> Result<ExportSummary>
where
    S: DumpSource + ?Sized,
    W: Write + ?Sized,
{
    write_text(sink, &header.render())?;
    write_text(sink, "SET FOREIGN_KEY_CHECKS=0;\n\n")?;

    let tables = source.list_tables(&request.schema).await?;
    tracing::info!(
        "Found {} table(s) in database '{}'",
        tables.len(),
        request.schema
    );

    let mut summary = ExportSummary {
        tables_discovered: tables.len(),
        ..Default::default()
    };

    for (table, decision) in request.filter.resolve(&tables) {
        if !decision.include {
            tracing::debug!("Skipping table '{}': not in table list", table);
            summary.record(TableOutcome::Excluded);
            continue;
        }

        let Some(create_table) = source.create_table_statement(table).await? else {
            tracing::warn!("Skipping '{}': no CREATE TABLE statement available", table);
            summary.record(TableOutcome::Vanished);
            continue;
        };

        let quoted = quote_identifier(table);
        write_text(sink, &format!("-- \n-- {} \n-- \n\n", comment_text(table)))?;
        write_text(sink, &format!("DROP TABLE IF EXISTS {};\n", quoted))?;
        write_text(sink, &format!("{};\n\n\n", create_table))?;

        if decision.suppress_data {
            tracing::debug!("Wrote schema of '{}' (data ignored)", table);
            summary.record(TableOutcome::SchemaOnly);
            continue;
        }

        let total = source.count_rows(table).await?;
        if total == 0 {
            tracing::debug!("Wrote schema of '{}' (empty table)", table);
            summary.record(TableOutcome::Empty);
            continue;
        }

        progress.table_started(table, total);
        let stats = export_rows(source, table, request.page_size, sink, progress).await?;
        progress.table_finished(table);
        write_text(sink, "\n\n\n\n")?;

        tracing::debug!(
            "Wrote '{}': {} row(s) in {} statement(s)",
            table,
            stats.rows,
            stats.statements
        );
        summary.record(TableOutcome::WithData {
            rows: stats.rows,
            statements: stats.statements,
        });
    }

    sink.flush()
        .map_err(|e| DumpError::file("Failed to flush backup script", e))?;

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dump::testing::{MemorySource, MemoryTable};
    use crate::dump::{Destination, NoProgress, TypeClass};
    use crate::filters::TableFilter;
    use chrono::NaiveDate;

    fn header() -> ScriptHeader {
        ScriptHeader {
            host: "db.internal".to_string(),
            schema: "shop".to_string(),
            generated_at: NaiveDate::from_ymd_opt(2024, 3, 9)
                .and_then(|d| d.and_hms_opt(14, 5, 7))
                .unwrap(),
        }
    }

    fn request(filter: TableFilter, page_size: u64) -> ExportRequest {
        ExportRequest {
            schema: "shop".to_string(),
            filter,
            page_size,
            destination: Destination::Stdout,
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn users() -> MemoryTable {
        MemoryTable::new("users", vec![TypeClass::Numeric, TypeClass::Textual]).with_rows(vec![
            vec![Some("1"), Some("O'Brien")],
            vec![Some("2"), None],
        ])
    }

    async fn run(source: &mut MemorySource, request: &ExportRequest) -> (String, ExportSummary) {
        let mut sink = Vec::new();
        let summary = write_script(source, &mut sink, request, &header(), &mut NoProgress)
            .await
            .unwrap();
        (String::from_utf8(sink).unwrap(), summary)
    }

    #[tokio::test]
    async fn test_full_script_shape() {
        let mut source = MemorySource::new(vec![users()]);
        let (script, summary) = run(&mut source, &request(TableFilter::default(), 1000)).await;

        let expected = format!(
            "-- Host: db.internal     Database: shop \n\
             -- Date: 2024-03-09 14:05:07     Support: {} \n\n\n\
             SET FOREIGN_KEY_CHECKS=0;\n\n\
             -- \n-- users \n-- \n\n\
             DROP TABLE IF EXISTS `users`;\n\
             CREATE TABLE `users` (\n  `id` int NOT NULL\n);\n\n\n\
             INSERT INTO `users` VALUES (1,'O\\'Brien'),(2,null);\n\
             \n\n\n\n",
            SUPPORT
        );
        assert_eq!(script, expected);
        assert_eq!(summary.tables_written, 1);
        assert_eq!(summary.rows_written, 2);
        assert_eq!(summary.statements_written, 1);
    }

    #[tokio::test]
    async fn test_allow_and_ignore_lists() {
        let mut source = MemorySource::new(vec![
            MemoryTable::new("a", vec![TypeClass::Numeric]).with_rows(vec![vec![Some("1")]]),
            MemoryTable::new("b", vec![TypeClass::Numeric]).with_rows(vec![vec![Some("2")]]),
            MemoryTable::new("c", vec![TypeClass::Numeric]).with_rows(vec![vec![Some("3")]]),
        ]);
        let filter = TableFilter::new(names(&["a", "b"]), names(&["b"]));

        let (script, summary) = run(&mut source, &request(filter, 10)).await;

        assert!(script.contains("DROP TABLE IF EXISTS `a`;"));
        assert!(script.contains("INSERT INTO `a` VALUES (1);"));
        assert!(script.contains("DROP TABLE IF EXISTS `b`;"));
        assert!(!script.contains("INSERT INTO `b`"));
        assert!(!script.contains("`c`"));
        assert!(!script.contains("-- c \n"));

        assert_eq!(summary.tables_discovered, 3);
        assert_eq!(summary.tables_written, 2);
        assert_eq!(summary.tables_with_data, 1);
        assert_eq!(summary.tables_skipped, 1);
        // Only `a` was paginated.
        assert!(source.page_requests.iter().all(|(t, _, _)| t == "a"));
    }

    #[tokio::test]
    async fn test_vanished_table_is_absent_even_when_allowed() {
        let mut source = MemorySource::new(vec![
            MemoryTable::new("gone", vec![TypeClass::Numeric]).vanished(),
            users(),
        ]);
        let filter = TableFilter::new(names(&["gone", "users"]), Vec::new());

        let (script, summary) = run(&mut source, &request(filter, 10)).await;

        assert!(!script.contains("gone"));
        assert!(script.contains("DROP TABLE IF EXISTS `users`;"));
        assert_eq!(summary.tables_skipped, 1);
        assert_eq!(summary.tables_written, 1);
    }

    #[tokio::test]
    async fn test_empty_table_gets_schema_only() {
        let mut source =
            MemorySource::new(vec![MemoryTable::new("empty", vec![TypeClass::Textual])]);

        let (script, summary) = run(&mut source, &request(TableFilter::default(), 10)).await;

        assert!(script.contains("DROP TABLE IF EXISTS `empty`;"));
        assert!(script.contains("CREATE TABLE `empty`"));
        assert!(!script.contains("INSERT INTO"));
        assert!(script.ends_with(");\n\n\n"));
        assert!(source.page_requests.is_empty());
        assert_eq!(summary.tables_with_data, 0);
    }

    #[tokio::test]
    async fn test_tables_keep_discovery_order() {
        let mut source = MemorySource::new(vec![
            MemoryTable::new("zeta", vec![TypeClass::Numeric]),
            MemoryTable::new("alpha", vec![TypeClass::Numeric]),
        ]);

        let (script, _) = run(&mut source, &request(TableFilter::default(), 10)).await;

        let zeta = script.find("`zeta`").unwrap();
        let alpha = script.find("`alpha`").unwrap();
        assert!(zeta < alpha);
    }

    #[tokio::test]
    async fn test_no_tables_still_writes_header() {
        let mut source = MemorySource::default();

        let (script, summary) = run(&mut source, &request(TableFilter::default(), 10)).await;

        assert!(script.starts_with("-- Host: db.internal     Database: shop \n"));
        assert!(script.ends_with("SET FOREIGN_KEY_CHECKS=0;\n\n"));
        assert_eq!(summary, ExportSummary::default());
    }

    #[tokio::test]
    async fn test_query_error_aborts_export() {
        let mut source = MemorySource::new(vec![users()]);
        source.fail_on_offset = Some(0);
        let mut sink = Vec::new();

        let result = write_script(
            &mut source,
            &mut sink,
            &request(TableFilter::default(), 10),
            &header(),
            &mut NoProgress,
        )
        .await;

        assert!(matches!(result, Err(DumpError::Query { .. })));
        // Everything before the failing page is kept.
        let partial = String::from_utf8(sink).unwrap();
        assert!(partial.contains("DROP TABLE IF EXISTS `users`;"));
        assert!(!partial.contains("INSERT INTO"));
    }

    #[tokio::test]
    async fn test_line_breaks_in_names_stay_inside_comments() {
        let name = "evil\nDROP DATABASE shop;\r\n";
        let mut source = MemorySource::new(vec![MemoryTable::new(name, vec![TypeClass::Numeric])]);
        let mut request = request(TableFilter::default(), 10);
        request.schema = "shop\nDROP DATABASE shop;".to_string();
        let mut header = header();
        header.schema = request.schema.clone();
        let mut sink = Vec::new();

        write_script(&mut source, &mut sink, &request, &header, &mut NoProgress)
            .await
            .unwrap();
        let script = String::from_utf8(sink).unwrap();

        assert!(script.contains("-- evil\\nDROP DATABASE shop;\\r\\n \n"));
        assert!(script.contains("Database: shop\\nDROP DATABASE shop; \n"));
        // Every line starting with the injected statement must come from inside a
        // backtick-quoted identifier, never from a comment that was cut short.
        let comments: Vec<&str> = script.lines().filter(|l| l.starts_with("--")).collect();
        assert_eq!(comments.len(), 5);
        assert!(comments.iter().all(|l| !l.contains('\r')));
        let mut in_identifier = false;
        for line in script.lines() {
            if line.starts_with("DROP DATABASE") {
                assert!(in_identifier, "statement escaped its comment: {:?}", line);
            }
            in_identifier ^= line.matches('`').count() % 2 == 1;
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        events: Vec<String>,
    }

    impl DumpProgress for RecordingProgress {
        fn table_started(&mut self, table: &str, total_rows: u64) {
            self.events.push(format!("start {} {}", table, total_rows));
        }

        fn rows_written(&mut self, rows: u64) {
            self.events.push(format!("rows {}", rows));
        }

        fn table_finished(&mut self, table: &str) {
            self.events.push(format!("done {}", table));
        }
    }

    #[tokio::test]
    async fn test_progress_is_reported_per_page() {
        let mut source = MemorySource::new(vec![users()]);
        let mut progress = RecordingProgress::default();
        let mut sink = Vec::new();

        write_script(
            &mut source,
            &mut sink,
            &request(TableFilter::default(), 1),
            &header(),
            &mut progress,
        )
        .await
        .unwrap();

        assert_eq!(
            progress.events,
            vec!["start users 2", "rows 1", "rows 1", "done users"]
        );
    }
}
