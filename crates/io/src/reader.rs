// Shared CSV reading: decoding, delimiter sniffing, header lookup, cell parsing

use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use dulog_recon::DulogError;

/// Header names of the six date/time parts, in column order.
pub const DATE_PARTS: [&str; 6] = ["year", "month", "day", "hour", "minute", "second"];

/// Read file and convert to UTF-8 if needed (station firmware and Excel
/// round-trips both produce Windows-1252).
pub fn read_file_as_utf8(path: &Path) -> Result<String, DulogError> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| DulogError::Io(format!("{}: {e}", path.display())))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| DulogError::Io(format!("{}: {e}", path.display())))?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (comma, semicolon, tab), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub(crate) fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b',', b';', b'\t'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

pub(crate) fn open_reader(content: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(content))
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes())
}

pub(crate) fn csv_error(e: csv::Error) -> DulogError {
    match e.kind() {
        csv::ErrorKind::UnequalLengths { pos, expected_len, len } => DulogError::Schema(format!(
            "line {}: expected {expected_len} fields, found {len}",
            pos.as_ref().map(|p| p.line()).unwrap_or(0)
        )),
        _ => DulogError::Io(e.to_string()),
    }
}

/// Header row with name lookup.
pub(crate) struct Headers {
    names: Vec<String>,
}

impl Headers {
    pub(crate) fn read(reader: &mut csv::Reader<&[u8]>) -> Result<Self, DulogError> {
        let names = reader
            .headers()
            .map_err(csv_error)?
            .iter()
            .map(|h| h.to_string())
            .collect();
        Ok(Self { names })
    }

    pub(crate) fn len(&self) -> usize {
        self.names.len()
    }

    pub(crate) fn name(&self, idx: usize) -> &str {
        self.names.get(idx).map(String::as_str).unwrap_or("")
    }

    /// Position of `name`, matched case-insensitively.
    pub(crate) fn require(&self, name: &str, format: &str) -> Result<usize, DulogError> {
        self.names
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| DulogError::Schema(format!("{format}: missing column '{name}'")))
    }

    /// Fail unless the six date/time parts sit at `start..start + 6` in order.
    pub(crate) fn expect_date_parts(&self, start: usize, format: &str) -> Result<(), DulogError> {
        for (offset, part) in DATE_PARTS.iter().enumerate() {
            let found = self.name(start + offset);
            // Repeated groups may carry a suffix, e.g. "year.1" or "year_received"
            if !found.to_ascii_lowercase().starts_with(part) {
                return Err(DulogError::Schema(format!(
                    "{format}: column {} should be '{part}', found '{found}'",
                    start + offset
                )));
            }
        }
        Ok(())
    }
}

/// Combine year/month/day/hour/minute/second cells into one instant.
pub fn compose_timestamp(parts: [&str; 6]) -> Result<NaiveDateTime, String> {
    let mut values = [0i64; 6];
    for (i, raw) in parts.iter().enumerate() {
        values[i] = raw
            .trim()
            .parse()
            .map_err(|_| format!("{} '{}' is not an integer", DATE_PARTS[i], raw))?;
    }
    let [year, month, day, hour, minute, second] = values;

    let year = i32::try_from(year).map_err(|_| format!("year {year} out of range"))?;
    let to_u32 = |v: i64, part: &str| u32::try_from(v).map_err(|_| format!("{part} {v} out of range"));

    let date = NaiveDate::from_ymd_opt(year, to_u32(month, "month")?, to_u32(day, "day")?)
        .ok_or_else(|| format!("{year}-{month}-{day} is not a calendar date"))?;
    date.and_hms_opt(to_u32(hour, "hour")?, to_u32(minute, "minute")?, to_u32(second, "second")?)
        .ok_or_else(|| format!("{hour}:{minute}:{second} is not a time of day"))
}

pub(crate) fn line_of(record: &csv::StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

/// Parse the six cells starting at `start` into a timestamp.
pub(crate) fn timestamp_at(
    record: &csv::StringRecord,
    start: usize,
    column: &str,
) -> Result<NaiveDateTime, DulogError> {
    let parts = date_cells(record, start);
    compose_timestamp(parts).map_err(|reason| {
        DulogError::parse(line_of(record), column, &parts.join(" "), reason)
    })
}

/// Like [`timestamp_at`], but a group of six empty cells is `None`.
pub(crate) fn optional_timestamp_at(
    record: &csv::StringRecord,
    start: usize,
    column: &str,
) -> Result<Option<NaiveDateTime>, DulogError> {
    if date_cells(record, start).iter().all(|c| c.is_empty()) {
        return Ok(None);
    }
    timestamp_at(record, start, column).map(Some)
}

fn date_cells(record: &csv::StringRecord, start: usize) -> [&str; 6] {
    std::array::from_fn(|i| record.get(start + i).unwrap_or(""))
}

/// Empty (or pandas-style `nan`) is null; anything else must be numeric.
pub(crate) fn reading_at(
    record: &csv::StringRecord,
    idx: usize,
    column: &str,
) -> Result<Option<f64>, DulogError> {
    let raw = record.get(idx).unwrap_or("");
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|_| DulogError::parse(line_of(record), column, raw, "not a number"))
}

/// Node ids stay verbatim strings; "007" and "7" are different tags.
pub(crate) fn node_at(record: &csv::StringRecord, idx: usize) -> String {
    record.get(idx).unwrap_or("").to_string()
}
