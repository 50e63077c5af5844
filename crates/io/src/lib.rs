//! `dulog-io` — file side of the pipeline: range and contact log loaders,
//! CSV export, and the TOML-driven batch runner.

pub mod contact;
pub mod export;
pub mod pipeline;
pub mod range;
pub mod reader;

pub use contact::{load_contacts, parse_contacts};
pub use export::{export_table, export_to_cwd, write_table, DEFAULT_EXPORT_NAME};
pub use pipeline::{run_pipeline, run_pipeline_file, PipelineReport, WrittenTable};
pub use range::{load_ranges, parse_ranges};
pub use reader::compose_timestamp;
