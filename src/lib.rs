//! Sighting Flux - Location analytics for tracked-subject sightings
//!
//! Flux turns a subject's raw sighting list into location analytics through a
//! deterministic pipeline: record decoding → validation → counting and visit
//! segmentation → report encoding.
//!
//! ## Modules
//!
//! - **Schema**: Decode sighting records (ISO-8601 or extended-JSON dates)
//! - **Analyzer**: Daily and per-coordinate counts, most frequent day and place
//! - **Dwell**: Visit segmentation and average dwell time per coordinate

pub mod analyzer;
pub mod config;
pub mod dwell;
pub mod encoder;
pub mod error;
pub mod histogram;
pub mod pipeline;
pub mod schema;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use analyzer::{analyze, LocationAnalyzer};
pub use config::{AnalyzerConfig, InvalidRecordPolicy, TieBreak};
pub use error::AnalyticsError;
pub use pipeline::{sightings_to_report, subject_to_report, SightingProcessor};
pub use types::{AnalysisResult, Coordinates, CoordinateKey, DayKey, Sighting};

// Schema exports
pub use schema::{SightingRecord, SightingRecordAdapter, SCHEMA_VERSION};

/// Flux version embedded in all reports
pub const FLUX_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "sighting-flux";
