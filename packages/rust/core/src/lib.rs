//! Enrichment pipeline: table parsing, roster aggregation, and column
//! injection for league stats pages.

pub mod aggregator;
pub mod controller;
pub mod enhancer;
pub mod heuristics;
pub mod sink;
pub mod sort;
pub mod table;

pub use aggregator::{AggregateReport, aggregate};
pub use controller::{EnrichReport, Enricher, RunSummary, SkipReason};
pub use enhancer::{EnhanceOutcome, TableDescriptor, enhance};
pub use sink::{NotificationSink, SilentSink};
pub use sort::{SortDirection, sort_by_column};
pub use table::{Cell, HeaderCell, LeaguePage, TableModel, TableRow};
