// Mobile-node contact log (MN_DATA.CSV) loading

use std::path::Path;

use dulog_recon::model::{
    INDEX_HEADER, RECEIVED_RSSI_HEADER, RECEIVED_TIME_HEADER, RSSI_HEADER, RX_NODE_HEADER, TX_NODE_HEADER,
};
use dulog_recon::{ContactRecord, ContactTable, DulogError};

use crate::reader::{
    csv_error, node_at, open_reader, optional_timestamp_at, read_file_as_utf8, reading_at, timestamp_at,
    Headers,
};

const FORMAT: &str = "contact log";
pub const CONTACT_COLUMNS: usize = 16;
const EVENT_TIME_START: usize = 0;
const RECEIVED_TIME_START: usize = 9;

pub fn load_contacts(path: &Path) -> Result<ContactTable, DulogError> {
    let content = read_file_as_utf8(path)?;
    let table = parse_contacts(&content)?;
    log::debug!(
        "loaded {} contact row(s) from {} ({} duplicate(s) dropped)",
        table.len(),
        path.display(),
        table.duplicates_dropped()
    );
    Ok(table)
}

/// Parse contact log text into a deduplicated, time-ordered table.
pub fn parse_contacts(content: &str) -> Result<ContactTable, DulogError> {
    let mut reader = open_reader(content);
    let headers = Headers::read(&mut reader)?;

    if headers.len() < CONTACT_COLUMNS {
        return Err(DulogError::Schema(format!(
            "{FORMAT}: expected {CONTACT_COLUMNS} columns, found {}",
            headers.len()
        )));
    }
    headers.expect_date_parts(EVENT_TIME_START, FORMAT)?;
    headers.expect_date_parts(RECEIVED_TIME_START, FORMAT)?;

    let rx_idx = headers.require(RX_NODE_HEADER, FORMAT)?;
    let tx_idx = headers.require(TX_NODE_HEADER, FORMAT)?;
    let rssi_idx = headers.require(RSSI_HEADER, FORMAT)?;
    let received_rssi_idx = headers.require(RECEIVED_RSSI_HEADER, FORMAT)?;

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;

        records.push(ContactRecord {
            event_time: timestamp_at(&record, EVENT_TIME_START, INDEX_HEADER)?,
            receiver_id: node_at(&record, rx_idx),
            sender_id: node_at(&record, tx_idx),
            signal_strength: reading_at(&record, rssi_idx, RSSI_HEADER)?,
            received_time: optional_timestamp_at(&record, RECEIVED_TIME_START, RECEIVED_TIME_HEADER)?,
            received_signal_strength: reading_at(&record, received_rssi_idx, RECEIVED_RSSI_HEADER)?,
        });
    }

    Ok(ContactTable::from_records(records))
}
