// Range log (RANGE.CSV) loading for download and base stations

use std::path::Path;

use dulog_recon::model::{INDEX_HEADER, NODE_ID_HEADER};
use dulog_recon::{DulogError, RangeRecord, RangeTable, StationKind};

use crate::reader::{csv_error, node_at, open_reader, read_file_as_utf8, reading_at, timestamp_at, Headers};

/// Column of the node id, right after the six date/time parts.
const NODE_ID_COLUMN: usize = 6;

pub fn load_ranges(path: &Path, station: StationKind) -> Result<RangeTable, DulogError> {
    let content = read_file_as_utf8(path)?;
    let table = parse_ranges(&content, station)?;
    log::debug!(
        "loaded {} {station} station range row(s) from {}",
        table.len(),
        path.display()
    );
    Ok(table)
}

/// Parse range log text. The layout is checked against `station` before any
/// row is read, so a base-station file declared as download fails instead of
/// shifting columns.
pub fn parse_ranges(content: &str, station: StationKind) -> Result<RangeTable, DulogError> {
    let format = format!("{station} station range log");
    let mut reader = open_reader(content);
    let headers = Headers::read(&mut reader)?;

    if headers.len() < station.min_columns() {
        return Err(DulogError::Schema(format!(
            "{format}: expected at least {} columns, found {}",
            station.min_columns(),
            headers.len()
        )));
    }
    headers.expect_date_parts(0, &format)?;
    if !headers.name(NODE_ID_COLUMN).eq_ignore_ascii_case(NODE_ID_HEADER) {
        return Err(DulogError::Schema(format!(
            "{format}: column {NODE_ID_COLUMN} should be '{NODE_ID_HEADER}', found '{}'",
            headers.name(NODE_ID_COLUMN)
        )));
    }

    let measurement_columns = station.measurement_columns();
    let measurement_names: Vec<String> = measurement_columns
        .iter()
        .map(|&idx| headers.name(idx).to_string())
        .collect();

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;

        let event_time = timestamp_at(&record, 0, INDEX_HEADER)?;
        let measurements = measurement_columns
            .iter()
            .zip(&measurement_names)
            .map(|(&idx, name)| reading_at(&record, idx, name))
            .collect::<Result<Vec<_>, _>>()?;

        records.push(RangeRecord {
            event_time,
            node_id: node_at(&record, NODE_ID_COLUMN),
            measurements,
        });
    }

    RangeTable::from_records(station, measurement_names, records)
}
