//! Pipeline orchestration
//!
//! This module provides the public API for Sighting Flux.
//! It orchestrates the full pipeline from raw sighting JSON to the analysis report.

use crate::analyzer::LocationAnalyzer;
use crate::config::AnalyzerConfig;
use crate::encoder::ReportEncoder;
use crate::error::AnalyticsError;
use crate::schema::{SightingRecord, SightingRecordAdapter};
use crate::types::AnalysisResult;

/// Convert a JSON array of sighting records to a report, using default settings.
///
/// # Arguments
/// * `raw_json` - JSON array of `{coordinates, date}` records
///
/// # Returns
/// Pretty-printed report JSON
///
/// # Example
/// ```ignore
/// let report = sightings_to_report(records_json)?;
/// ```
pub fn sightings_to_report(raw_json: String) -> Result<String, AnalyticsError> {
    SightingProcessor::new().process_array(&raw_json)
}

/// Convert a subject document (`{"fullName": ..., "locations": [...]}`) to a
/// report, using default settings.
///
/// # Example
/// ```ignore
/// let report = subject_to_report(subject_json)?;
/// ```
pub fn subject_to_report(raw_json: String) -> Result<String, AnalyticsError> {
    SightingProcessor::new().process_subject(&raw_json)
}

/// Processor bundling analyzer settings with a report encoder.
///
/// Holds no state between calls; every request is analyzed from scratch.
#[derive(Debug, Clone, Default)]
pub struct SightingProcessor {
    analyzer: LocationAnalyzer,
    encoder: ReportEncoder,
}

impl SightingProcessor {
    /// Create a new processor with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a processor with specific analyzer settings
    pub fn with_config(config: AnalyzerConfig) -> Self {
        Self {
            analyzer: LocationAnalyzer::new(config),
            encoder: ReportEncoder::new(),
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        self.analyzer.config()
    }

    /// Process a JSON array of records
    pub fn process_array(&self, raw_json: &str) -> Result<String, AnalyticsError> {
        let records = SightingRecordAdapter::parse_array(raw_json)?;
        self.encode_records(&records, None)
    }

    /// Process NDJSON records
    pub fn process_ndjson(&self, raw_ndjson: &str) -> Result<String, AnalyticsError> {
        let records = SightingRecordAdapter::parse_ndjson(raw_ndjson)?;
        self.encode_records(&records, None)
    }

    /// Process a subject document
    pub fn process_subject(&self, raw_json: &str) -> Result<String, AnalyticsError> {
        let doc = SightingRecordAdapter::parse_subject(raw_json)?;
        self.encode_records(&doc.locations, doc.subject())
    }

    /// Validate and analyze already-parsed records
    pub fn analyze_records(
        &self,
        records: &[SightingRecord],
    ) -> Result<AnalysisResult, AnalyticsError> {
        let sightings =
            SightingRecordAdapter::to_sightings(records, self.config().invalid_records)?;
        Ok(self.analyzer.analyze(&sightings))
    }

    fn encode_records(
        &self,
        records: &[SightingRecord],
        subject: Option<&str>,
    ) -> Result<String, AnalyticsError> {
        let result = self.analyze_records(records)?;
        self.encoder.encode_to_json(&result, subject, self.config())
    }
}
