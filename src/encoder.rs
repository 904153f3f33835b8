//! Report encoding
//!
//! This module encodes an analysis result into the JSON report consumed by the
//! rendering layer: a summary panel, a per-location dwell table, and bar charts
//! of sightings by day and by coordinate. Histograms stay in first-seen order.

use crate::config::AnalyzerConfig;
use crate::error::AnalyticsError;
use crate::types::{
    AnalysisReport, AnalysisResult, ReportCount, ReportDwell, ReportMostFrequent, ReportProducer,
    ReportProvenance,
};
use crate::{FLUX_VERSION, PRODUCER_NAME};
use chrono::Utc;
use uuid::Uuid;

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Encoder producing analysis reports
#[derive(Debug, Clone)]
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Encode an analysis result into a report
    pub fn encode(
        &self,
        result: &AnalysisResult,
        subject: Option<&str>,
        config: &AnalyzerConfig,
    ) -> Result<AnalysisReport, AnalyticsError> {
        let producer = ReportProducer {
            name: PRODUCER_NAME.to_string(),
            version: FLUX_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        };

        let first_sighting = result.dwell.iter().map(|d| d.first_seen).min();
        let last_sighting = result.dwell.iter().map(|d| d.last_seen).max();

        let provenance = ReportProvenance {
            subject: subject.map(str::to_string),
            first_sighting_utc: first_sighting.map(|t| t.to_rfc3339()),
            last_sighting_utc: last_sighting.map(|t| t.to_rfc3339()),
            computed_at_utc: Utc::now().to_rfc3339(),
            visit_gap_secs: config.visit_gap_secs,
        };

        let most_frequent = result.most_frequent.as_ref().map(|m| ReportMostFrequent {
            date: m.date.to_string(),
            coordinates: m.coordinates.to_string(),
            date_occurrences: m.date_occurrences,
            coordinate_occurrences: m.coordinate_occurrences,
        });

        let dates = result
            .dates
            .iter()
            .map(|e| ReportCount {
                key: e.key.to_string(),
                count: e.count,
            })
            .collect();

        let coordinates = result
            .coordinates
            .iter()
            .map(|e| ReportCount {
                key: e.key.to_string(),
                count: e.count,
            })
            .collect();

        let avg_time_per_location = result
            .dwell
            .iter()
            .map(|d| {
                if !d.average_dwell_secs.is_finite() {
                    return Err(AnalyticsError::EncodingError(format!(
                        "non-finite dwell time for {}",
                        d.coordinates
                    )));
                }
                Ok(ReportDwell {
                    location: d.coordinates.to_string(),
                    average_time: d.average_dwell_secs,
                    visit_count: d.visit_count,
                    sightings: d.sightings,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(AnalysisReport {
            report_version: REPORT_VERSION.to_string(),
            producer,
            provenance,
            total_entries: result.total_entries,
            unique_coordinates_count: result.unique_coordinates_count,
            unique_dates_count: result.unique_dates_count,
            most_frequent,
            dates,
            coordinates,
            avg_time_per_location,
        })
    }

    /// Encode to a pretty-printed JSON string
    pub fn encode_to_json(
        &self,
        result: &AnalysisResult,
        subject: Option<&str>,
        config: &AnalyzerConfig,
    ) -> Result<String, AnalyticsError> {
        let report = self.encode(result, subject, config)?;
        serde_json::to_string_pretty(&report).map_err(AnalyticsError::JsonError)
    }
}
