//! `dulog-recon` — contact-log data model and dyad redundancy reconciliation.
//!
//! Pure engine crate: receives loaded tables, returns reconciled tables.
//! No file IO.

pub mod config;
pub mod dyad;
pub mod error;
pub mod model;
pub mod window;

pub use config::PipelineConfig;
pub use dyad::{reconcile_all, reconcile_dyad};
pub use error::DulogError;
pub use model::{
    ContactRecord, ContactTable, Dyad, RangeRecord, RangeTable, ReconciledContact, ReconciledTable,
    StationKind, Tabular,
};
pub use window::TimeWindow;
