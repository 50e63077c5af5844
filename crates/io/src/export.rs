// CSV export of time-indexed tables

use std::io::Write;
use std::path::{Path, PathBuf};

use dulog_recon::model::format_timestamp;
use dulog_recon::{DulogError, Tabular};

/// Name used when the caller does not pick one.
pub const DEFAULT_EXPORT_NAME: &str = "new_file";

/// Write `table` to `<dir>/<name>.csv` and return the path written.
///
/// With `index` set, the event time is emitted as a leading `datetime`
/// column, which is what R's `read.csv` users expect.
pub fn export_table<T: Tabular>(
    table: &T,
    dir: &Path,
    name: &str,
    index: bool,
) -> Result<PathBuf, DulogError> {
    let path = dir.join(format!("{name}.csv"));
    let file = std::fs::File::create(&path)
        .map_err(|e| DulogError::Io(format!("{}: {e}", path.display())))?;
    write_table(table, file, index)?;
    log::info!("wrote {} row(s) to {}", table.row_count(), path.display());
    Ok(path)
}

/// [`export_table`] into the process working directory.
pub fn export_to_cwd<T: Tabular>(table: &T, name: &str, index: bool) -> Result<PathBuf, DulogError> {
    let cwd = std::env::current_dir().map_err(|e| DulogError::Io(e.to_string()))?;
    export_table(table, &cwd, name, index)
}

/// Serialize `table` as comma-separated text into any writer.
pub fn write_table<T: Tabular, W: Write>(table: &T, out: W, index: bool) -> Result<(), DulogError> {
    let mut writer = csv::WriterBuilder::new().from_writer(out);
    let io_err = |e: csv::Error| DulogError::Io(e.to_string());

    let mut header: Vec<String> = Vec::new();
    if index {
        header.push(table.index_header().to_string());
    }
    header.extend(table.headers());
    writer.write_record(&header).map_err(io_err)?;

    for row in 0..table.row_count() {
        let mut record: Vec<String> = Vec::with_capacity(header.len());
        if index {
            record.push(format_timestamp(&table.index(row)));
        }
        record.extend(table.cells(row));
        writer.write_record(&record).map_err(io_err)?;
    }

    writer.flush().map_err(|e| DulogError::Io(e.to_string()))?;
    Ok(())
}
