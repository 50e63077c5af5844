use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::error::DulogError;
use crate::window::TimeWindow;

/// Rendering used for every timestamp cell written out.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Name of the leading time-index column.
pub const INDEX_HEADER: &str = "datetime";

pub const NODE_ID_HEADER: &str = "Node ID";
pub const RX_NODE_HEADER: &str = "RX Node";
pub const TX_NODE_HEADER: &str = "TX Node";
pub const RSSI_HEADER: &str = "RSSI";
pub const RECEIVED_TIME_HEADER: &str = "datetime_received";
pub const RECEIVED_RSSI_HEADER: &str = "Received RSSI";
pub const MAX_RSSI_HEADER: &str = "RSSI_max";
pub const DYAD_HEADER: &str = "dyad";

// ---------------------------------------------------------------------------
// Tabular output
// ---------------------------------------------------------------------------

/// A time-indexed table that can be written out cell by cell.
///
/// `headers` and `cells` exclude the index column; the writer decides whether
/// to prepend it.
pub trait Tabular {
    fn headers(&self) -> Vec<String>;
    fn row_count(&self) -> usize;
    fn index(&self, row: usize) -> NaiveDateTime;
    fn cells(&self, row: usize) -> Vec<String>;

    fn index_header(&self) -> &str {
        INDEX_HEADER
    }
}

pub fn format_timestamp(t: &NaiveDateTime) -> String {
    t.format(TIMESTAMP_FORMAT).to_string()
}

fn format_reading(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Range logs
// ---------------------------------------------------------------------------

/// Fixed station that produced a range log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationKind {
    Download,
    Base,
}

impl StationKind {
    /// Positions of the measurement columns kept after the node id.
    /// Download stations skip column 8.
    pub fn measurement_columns(&self) -> &'static [usize] {
        match self {
            Self::Download => &[7, 9],
            Self::Base => &[7],
        }
    }

    /// Smallest column count a file of this kind can have.
    pub fn min_columns(&self) -> usize {
        match self {
            Self::Download => 10,
            Self::Base => 8,
        }
    }
}

impl std::fmt::Display for StationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Download => write!(f, "download"),
            Self::Base => write!(f, "base"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeRecord {
    pub event_time: NaiveDateTime,
    pub node_id: String,
    /// One entry per `RangeTable::measurement_names`.
    pub measurements: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeTable {
    station: StationKind,
    measurement_names: Vec<String>,
    rows: Vec<RangeRecord>,
}

impl RangeTable {
    /// Build a table sorted by event time. Rows with equal times keep input order.
    pub fn from_records(
        station: StationKind,
        measurement_names: Vec<String>,
        mut records: Vec<RangeRecord>,
    ) -> Result<Self, DulogError> {
        let expected = station.measurement_columns().len();
        if measurement_names.len() != expected {
            return Err(DulogError::Schema(format!(
                "{station} station expects {expected} measurement column(s), got {}",
                measurement_names.len()
            )));
        }
        if let Some(bad) = records.iter().find(|r| r.measurements.len() != expected) {
            return Err(DulogError::Schema(format!(
                "node '{}' at {}: expected {expected} measurement(s), got {}",
                bad.node_id,
                format_timestamp(&bad.event_time),
                bad.measurements.len()
            )));
        }

        records.sort_by_key(|r| r.event_time);
        Ok(Self {
            station,
            measurement_names,
            rows: records,
        })
    }

    pub fn station(&self) -> StationKind {
        self.station
    }

    pub fn measurement_names(&self) -> &[String] {
        &self.measurement_names
    }

    pub fn rows(&self) -> &[RangeRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Tabular for RangeTable {
    fn headers(&self) -> Vec<String> {
        std::iter::once(NODE_ID_HEADER.to_string())
            .chain(self.measurement_names.iter().cloned())
            .collect()
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn index(&self, row: usize) -> NaiveDateTime {
        self.rows[row].event_time
    }

    fn cells(&self, row: usize) -> Vec<String> {
        let r = &self.rows[row];
        std::iter::once(r.node_id.clone())
            .chain(r.measurements.iter().map(|m| format_reading(*m)))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Contact logs
// ---------------------------------------------------------------------------

/// One mobile-node contact: `receiver_id` heard `sender_id` at `event_time`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactRecord {
    pub event_time: NaiveDateTime,
    pub receiver_id: String,
    pub sender_id: String,
    pub signal_strength: Option<f64>,
    pub received_time: Option<NaiveDateTime>,
    pub received_signal_strength: Option<f64>,
}

/// Contact log with at most one row per (receiver, sender, event_time),
/// ordered by event time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactTable {
    rows: Vec<ContactRecord>,
    duplicates_dropped: usize,
}

impl ContactTable {
    /// Drop repeated (receiver, sender, event_time) rows keeping the first
    /// occurrence in input order, then sort by event time.
    pub fn from_records(records: Vec<ContactRecord>) -> Self {
        let total = records.len();
        let mut seen: HashSet<(String, String, NaiveDateTime)> = HashSet::with_capacity(total);
        let mut rows: Vec<ContactRecord> = records
            .into_iter()
            .filter(|r| seen.insert((r.receiver_id.clone(), r.sender_id.clone(), r.event_time)))
            .collect();
        let duplicates_dropped = total - rows.len();

        rows.sort_by_key(|r| r.event_time);
        Self {
            rows,
            duplicates_dropped,
        }
    }

    pub fn rows(&self) -> &[ContactRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows discarded as duplicates when the table was built.
    pub fn duplicates_dropped(&self) -> usize {
        self.duplicates_dropped
    }

    /// Rows where `receiver` heard `sender` inside `window`, in time order.
    pub fn stream<'a>(
        &'a self,
        receiver: &'a str,
        sender: &'a str,
        window: &'a TimeWindow,
    ) -> impl Iterator<Item = &'a ContactRecord> + 'a {
        self.rows.iter().filter(move |r| {
            r.receiver_id == receiver && r.sender_id == sender && window.contains(&r.event_time)
        })
    }

    /// Every unordered pair of distinct nodes that appears in the log, each
    /// once, members in ascending order.
    pub fn dyads(&self) -> Vec<Dyad> {
        let pairs: BTreeSet<(&str, &str)> = self
            .rows
            .iter()
            .filter(|r| r.receiver_id != r.sender_id)
            .map(|r| {
                let (a, b) = (r.receiver_id.as_str(), r.sender_id.as_str());
                if a <= b { (a, b) } else { (b, a) }
            })
            .collect();
        pairs.into_iter().map(|(a, b)| Dyad::new(a, b)).collect()
    }
}

impl Tabular for ContactTable {
    fn headers(&self) -> Vec<String> {
        [
            RX_NODE_HEADER,
            TX_NODE_HEADER,
            RSSI_HEADER,
            RECEIVED_TIME_HEADER,
            RECEIVED_RSSI_HEADER,
        ]
        .iter()
        .map(|h| h.to_string())
        .collect()
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn index(&self, row: usize) -> NaiveDateTime {
        self.rows[row].event_time
    }

    fn cells(&self, row: usize) -> Vec<String> {
        let r = &self.rows[row];
        vec![
            r.receiver_id.clone(),
            r.sender_id.clone(),
            format_reading(r.signal_strength),
            r.received_time.as_ref().map(format_timestamp).unwrap_or_default(),
            format_reading(r.received_signal_strength),
        ]
    }
}

// ---------------------------------------------------------------------------
// Dyads
// ---------------------------------------------------------------------------

/// A pair of nodes in caller order. `first` plays the Node1 role when reconciling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Dyad {
    pub first: String,
    pub second: String,
}

impl Dyad {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
        }
    }

    /// `"first-second"`, exactly as supplied.
    pub fn label(&self) -> String {
        format!("{}-{}", self.first, self.second)
    }
}

impl std::fmt::Display for Dyad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.first, self.second)
    }
}

// ---------------------------------------------------------------------------
// Reconciled output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledContact {
    pub event_time: NaiveDateTime,
    pub receiver_id: String,
    pub sender_id: String,
    /// `None` only when neither direction carried a reading.
    pub max_signal_strength: Option<f64>,
    pub dyad: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciledTable {
    rows: Vec<ReconciledContact>,
}

impl ReconciledTable {
    /// Rows must already be in event-time order.
    pub(crate) fn from_sorted(rows: Vec<ReconciledContact>) -> Self {
        debug_assert!(rows.windows(2).all(|w| w[0].event_time <= w[1].event_time));
        Self { rows }
    }

    /// Merge several reconciled tables into one, ordered by event time.
    /// Rows sharing a time keep the order of `tables`.
    pub fn concat(tables: impl IntoIterator<Item = ReconciledTable>) -> Self {
        let mut rows: Vec<ReconciledContact> =
            tables.into_iter().flat_map(|t| t.rows).collect();
        rows.sort_by_key(|r| r.event_time);
        Self { rows }
    }

    pub fn rows(&self) -> &[ReconciledContact] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Tabular for ReconciledTable {
    fn headers(&self) -> Vec<String> {
        [RX_NODE_HEADER, TX_NODE_HEADER, MAX_RSSI_HEADER, DYAD_HEADER]
            .iter()
            .map(|h| h.to_string())
            .collect()
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn index(&self, row: usize) -> NaiveDateTime {
        self.rows[row].event_time
    }

    fn cells(&self, row: usize) -> Vec<String> {
        let r = &self.rows[row];
        vec![
            r.receiver_id.clone(),
            r.sender_id.clone(),
            format_reading(r.max_signal_strength),
            r.dyad.clone(),
        ]
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
