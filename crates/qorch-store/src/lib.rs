//! SQLite-backed ledger for batches, variants, raw results and metrics.

pub mod export;
pub mod gateway;
pub mod query;
pub mod schema;

pub use export::{export_metrics_csv, export_metrics_json};
pub use gateway::Store;
pub use query::MetricExportRow;
pub use schema::{init_schema, SCHEMA_VERSION};
