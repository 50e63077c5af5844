use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::model::{ContactRecord, ContactTable, Dyad, ReconciledContact, ReconciledTable};
use crate::window::TimeWindow;

/// Merge the two directional views of a dyad into one timeline.
///
/// Stream A holds rows where `node1` heard `node2`, stream B rows where
/// `node2` heard `node1`. Every event time present in either stream yields
/// exactly one output row; when both streams logged the same second, the
/// stronger reading wins.
pub fn reconcile_dyad(
    table: &ContactTable,
    node1: &str,
    node2: &str,
    window: &TimeWindow,
) -> ReconciledTable {
    let mut joined: BTreeMap<NaiveDateTime, Joined<'_>> = BTreeMap::new();

    let mut from_a = 0usize;
    for rec in table.stream(node1, node2, window) {
        joined.entry(rec.event_time).or_default().a = Some(rec);
        from_a += 1;
    }
    let mut from_b = 0usize;
    for rec in table.stream(node2, node1, window) {
        joined.entry(rec.event_time).or_default().b = Some(rec);
        from_b += 1;
    }

    let label = format!("{node1}-{node2}");
    log::debug!(
        "dyad {label}: {from_a} row(s) heard by {node1}, {from_b} heard by {node2}, {} merged",
        joined.len()
    );

    let rows = joined
        .into_iter()
        .map(|(event_time, j)| j.resolve(event_time, node1, node2, &label))
        .collect();
    ReconciledTable::from_sorted(rows)
}

/// Reconcile several dyads and merge them into one time-ordered table.
pub fn reconcile_all(table: &ContactTable, dyads: &[Dyad], window: &TimeWindow) -> ReconciledTable {
    ReconciledTable::concat(
        dyads
            .iter()
            .map(|d| reconcile_dyad(table, &d.first, &d.second, window)),
    )
}

/// Outer-join slot for one event time.
#[derive(Default)]
struct Joined<'a> {
    a: Option<&'a ContactRecord>,
    b: Option<&'a ContactRecord>,
}

impl Joined<'_> {
    fn resolve(self, event_time: NaiveDateTime, node1: &str, node2: &str, label: &str) -> ReconciledContact {
        // Receiver/sender come from stream A; a B-only row was heard by node2.
        // The receiver fill is always node2, never node1.
        let receiver_id = self
            .a
            .map(|r| r.receiver_id.clone())
            .unwrap_or_else(|| node2.to_string());
        let sender_id = self
            .a
            .map(|r| r.sender_id.clone())
            .unwrap_or_else(|| node1.to_string());

        let sig_a = self.a.and_then(|r| r.signal_strength);
        let sig_b = self.b.and_then(|r| r.signal_strength);
        // Each side backstops the other
        let (sig_a, sig_b) = (sig_a.or(sig_b), sig_b.or(sig_a));
        let max_signal_strength = match (sig_a, sig_b) {
            (Some(x), Some(y)) => Some(x.max(y)),
            (x, y) => x.or(y),
        };

        ReconciledContact {
            event_time,
            receiver_id,
            sender_id,
            max_signal_strength,
            dyad: label.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2019, 5, 3)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn contact(t: NaiveDateTime, rx: &str, tx: &str, rssi: Option<f64>) -> ContactRecord {
        ContactRecord {
            event_time: t,
            receiver_id: rx.into(),
            sender_id: tx.into(),
            signal_strength: rssi,
            received_time: None,
            received_signal_strength: None,
        }
    }

    #[test]
    fn both_directions_same_second_collapse() {
        let table = ContactTable::from_records(vec![
            contact(at(10, 0, 0), "Node1", "Node2", Some(-70.0)),
            contact(at(10, 0, 0), "Node2", "Node1", Some(-65.0)),
        ]);
        let out = reconcile_dyad(&table, "Node1", "Node2", &TimeWindow::unbounded());
        assert_eq!(out.len(), 1);
        let row = &out.rows()[0];
        assert_eq!(row.event_time, at(10, 0, 0));
        assert_eq!(row.receiver_id, "Node1");
        assert_eq!(row.sender_id, "Node2");
        assert_eq!(row.max_signal_strength, Some(-65.0));
        assert_eq!(row.dyad, "Node1-Node2");
    }

    #[test]
    fn only_second_direction_fills_roles() {
        let table = ContactTable::from_records(vec![contact(
            at(10, 5, 0),
            "Node2",
            "Node1",
            Some(-90.0),
        )]);
        let out = reconcile_dyad(&table, "Node1", "Node2", &TimeWindow::unbounded());
        assert_eq!(out.len(), 1);
        let row = &out.rows()[0];
        assert_eq!(row.receiver_id, "Node2");
        assert_eq!(row.sender_id, "Node1");
        assert_eq!(row.max_signal_strength, Some(-90.0));
    }

    #[test]
    fn picks_stronger_reading() {
        let table = ContactTable::from_records(vec![
            contact(at(11, 0, 0), "a", "b", Some(-80.0)),
            contact(at(11, 0, 0), "b", "a", Some(-72.0)),
        ]);
        let out = reconcile_dyad(&table, "a", "b", &TimeWindow::unbounded());
        assert_eq!(out.rows()[0].max_signal_strength, Some(-72.0));
    }

    #[test]
    fn null_reading_backstopped_by_other_side() {
        let table = ContactTable::from_records(vec![
            contact(at(11, 0, 0), "a", "b", None),
            contact(at(11, 0, 0), "b", "a", Some(-75.0)),
            contact(at(11, 0, 5), "a", "b", None),
        ]);
        let out = reconcile_dyad(&table, "a", "b", &TimeWindow::unbounded());
        assert_eq!(out.rows()[0].max_signal_strength, Some(-75.0));
        // No reading anywhere at 11:00:05
        assert_eq!(out.rows()[1].max_signal_strength, None);
    }

    #[test]
    fn interleaved_streams_keep_every_time_once() {
        let table = ContactTable::from_records(vec![
            contact(at(10, 0, 0), "a", "b", Some(-70.0)),
            contact(at(10, 0, 2), "b", "a", Some(-71.0)),
            contact(at(10, 0, 4), "a", "b", Some(-72.0)),
            contact(at(10, 0, 4), "b", "a", Some(-69.0)),
            contact(at(10, 0, 6), "a", "c", Some(-50.0)),
        ]);
        let out = reconcile_dyad(&table, "a", "b", &TimeWindow::unbounded());
        let times: Vec<_> = out.rows().iter().map(|r| r.event_time).collect();
        assert_eq!(times, vec![at(10, 0, 0), at(10, 0, 2), at(10, 0, 4)]);
        let rx: Vec<_> = out.rows().iter().map(|r| r.receiver_id.as_str()).collect();
        assert_eq!(rx, vec!["a", "b", "a"]);
        assert_eq!(out.rows()[2].max_signal_strength, Some(-69.0));
    }

    #[test]
    fn unknown_pair_is_empty() {
        let table = ContactTable::from_records(vec![contact(at(10, 0, 0), "a", "b", Some(-70.0))]);
        let out = reconcile_dyad(&table, "x", "y", &TimeWindow::unbounded());
        assert!(out.is_empty());
    }

    #[test]
    fn window_is_inclusive_both_ends() {
        let table = ContactTable::from_records(vec![
            contact(at(9, 59, 59), "a", "b", Some(-70.0)),
            contact(at(10, 0, 0), "a", "b", Some(-70.0)),
            contact(at(10, 30, 0), "b", "a", Some(-70.0)),
            contact(at(11, 0, 0), "b", "a", Some(-70.0)),
            contact(at(11, 0, 1), "a", "b", Some(-70.0)),
        ]);
        let window = TimeWindow::new(Some(at(10, 0, 0)), Some(at(11, 0, 0)));
        let out = reconcile_dyad(&table, "a", "b", &window);
        let times: Vec<_> = out.rows().iter().map(|r| r.event_time).collect();
        assert_eq!(times, vec![at(10, 0, 0), at(10, 30, 0), at(11, 0, 0)]);
    }

    #[test]
    fn window_excluding_everything_is_empty() {
        let table = ContactTable::from_records(vec![contact(at(10, 0, 0), "a", "b", Some(-70.0))]);
        let window = TimeWindow::new(Some(at(12, 0, 0)), None);
        assert!(reconcile_dyad(&table, "a", "b", &window).is_empty());
    }

    #[test]
    fn reconcile_all_labels_each_dyad() {
        let table = ContactTable::from_records(vec![
            contact(at(10, 0, 0), "a", "b", Some(-70.0)),
            contact(at(10, 0, 0), "c", "a", Some(-60.0)),
        ]);
        let dyads = table.dyads();
        let out = reconcile_all(&table, &dyads, &TimeWindow::unbounded());
        let labels: Vec<_> = out.rows().iter().map(|r| r.dyad.as_str()).collect();
        assert_eq!(labels, vec!["a-b", "a-c"]);
        // a-c: only c heard a, so the row is attributed to c as receiver
        assert_eq!(out.rows()[1].receiver_id, "c");
        assert_eq!(out.rows()[1].sender_id, "a");
    }
}
