// ABOUTME: Backup command implementation
// ABOUTME: Owns the connection and output sink for one export and reports the result

use crate::config::BackupConfig;
use crate::dump::{
    write_script, Destination, DumpProgress, ExportSummary, NoProgress, ScriptHeader,
};
use crate::error::{DumpError, Result};
use crate::mysql::{connect_mysql, MySqlSource};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufWriter, IsTerminal, Write};

/// Per-table progress bar on stderr
struct BarProgress {
    bar: Option<ProgressBar>,
}

impl DumpProgress for BarProgress {
    fn table_started(&mut self, table: &str, total_rows: u64) {
        let bar = ProgressBar::new(total_rows);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} rows {msg}")
        {
            bar.set_style(style.progress_chars("##-"));
        }
        bar.set_message(table.to_string());
        self.bar = Some(bar);
    }

    fn rows_written(&mut self, rows: u64) {
        if let Some(bar) = &self.bar {
            bar.inc(rows);
        }
    }

    fn table_finished(&mut self, _table: &str) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

/// Whether the progress bar may draw on stderr
///
/// Log lines share stderr with the bar, so the bar stays off when the script
/// goes to stdout, when stderr is not a terminal, or when debug logging is on.
fn progress_enabled(
    destination: &Destination,
    stderr_is_terminal: bool,
    debug_logging: bool,
) -> bool {
    *destination != Destination::Stdout && stderr_is_terminal && !debug_logging
}

fn open_sink(destination: &Destination) -> Result<Box<dyn Write>> {
    match destination {
        Destination::Stdout => Ok(Box::new(BufWriter::new(std::io::stdout()))),
        Destination::File(path) => {
            let file = File::create(path).map_err(|e| {
                DumpError::file(format!("Failed to create {}", path.display()), e)
            })?;
            Ok(Box::new(BufWriter::new(file)))
        }
    }
}

/// Export the configured database into a single SQL script
///
/// Opens one connection and one output sink, writes the script, then closes
/// both. If anything fails midway the sink is dropped (and flushed) with
/// whatever was already written; nothing is rolled back.
///
/// # Errors
///
/// Returns the first fatal `DumpError`: invalid configuration, unreachable
/// server, failing query, or unwritable destination.
///
/// # Examples
///
/// ```no_run
/// # use mysql_backup::commands::backup;
/// # use mysql_backup::config::load_config_from_file;
/// # async fn example() -> mysql_backup::error::Result<()> {
/// let config = load_config_from_file(std::path::Path::new(".backup.toml"))?;
/// let summary = backup(&config).await?;
/// println!("wrote {} rows", summary.rows_written);
/// # Ok(())
/// # }
/// ```
pub async fn backup(config: &BackupConfig) -> Result<ExportSummary> {
    let request = config.export_request()?;
    tracing::info!(
        "Starting backup of database '{}' to {}",
        request.schema,
        request.destination
    );

    let conn = connect_mysql(&config.connection()).await?;
    let mut source = MySqlSource::new(conn);
    let mut sink = open_sink(&request.destination)?;

    let header = ScriptHeader {
        host: config.host.clone(),
        schema: request.schema.clone(),
        generated_at: chrono::Local::now().naive_local(),
    };

    if request.filter.is_empty() {
        tracing::info!("No table filters; exporting every table");
    }

    let show_progress = progress_enabled(
        &request.destination,
        std::io::stderr().is_terminal(),
        tracing::enabled!(tracing::Level::DEBUG),
    );
    let mut progress: Box<dyn DumpProgress> = if show_progress {
        Box::new(BarProgress { bar: None })
    } else {
        Box::new(NoProgress)
    };

    let summary = write_script(
        &mut source,
        &mut sink,
        &request,
        &header,
        progress.as_mut(),
    )
    .await?;
    drop(sink);

    if let Err(e) = source.disconnect().await {
        tracing::warn!("{}", e);
    }

    tracing::info!("========================================");
    tracing::info!("Backup Summary");
    tracing::info!("========================================");
    tracing::info!("Tables discovered: {}", summary.tables_discovered);
    tracing::info!("Tables written: {}", summary.tables_written);
    tracing::info!("Tables with data: {}", summary.tables_with_data);
    tracing::info!("Tables skipped: {}", summary.tables_skipped);
    tracing::info!(
        "Rows written: {} ({} INSERT statements)",
        summary.rows_written,
        summary.statements_written
    );
    tracing::info!("Output: {}", request.destination);
    tracing::info!("========================================");

    Ok(summary)
}
