//! Core types for the Sighting Flux pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: validated sightings, grouping keys, the analysis result, and the
//! JSON report handed to the rendering layer.

use crate::error::AnalyticsError;
use crate::histogram::Histogram;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Exact-match grouping key for these coordinates
    pub fn key(&self) -> CoordinateKey {
        CoordinateKey::from(*self)
    }
}

/// One timestamped location observation of a tracked subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sighting {
    pub coordinates: Coordinates,
    pub timestamp: DateTime<Utc>,
}

impl Sighting {
    pub fn new(coordinates: Coordinates, timestamp: DateTime<Utc>) -> Self {
        Self {
            coordinates,
            timestamp,
        }
    }

    pub fn coordinate_key(&self) -> CoordinateKey {
        self.coordinates.key()
    }

    pub fn day_key(&self) -> DayKey {
        DayKey::from(self.timestamp)
    }
}

/// Coordinates reduced to a string identity, formatted as `"{lat}, {lng}"`.
///
/// Two sightings share a key only when both floats format identically. No
/// distance-based merging is performed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoordinateKey(String);

impl CoordinateKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<Coordinates> for CoordinateKey {
    fn from(c: Coordinates) -> Self {
        CoordinateKey(format!("{}, {}", c.lat, c.lng))
    }
}

impl fmt::Display for CoordinateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// UTC calendar day of a sighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayKey(NaiveDate);

impl DayKey {
    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl From<DateTime<Utc>> for DayKey {
    fn from(ts: DateTime<Utc>) -> Self {
        DayKey(ts.date_naive())
    }
}

impl From<NaiveDate> for DayKey {
    fn from(date: NaiveDate) -> Self {
        DayKey(date)
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Most frequent day and coordinate with their occurrence counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MostFrequent {
    pub date: DayKey,
    pub date_occurrences: u32,
    pub coordinates: CoordinateKey,
    pub coordinate_occurrences: u32,
}

/// Visit breakdown for one distinct coordinate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationDwell {
    pub coordinates: CoordinateKey,
    /// Number of sightings at this coordinate
    pub sightings: u32,
    /// Number of visits after gap segmentation
    pub visit_count: u32,
    /// Sum of all visit durations (seconds)
    pub total_dwell_secs: f64,
    /// Average visit duration (seconds), 0 for a single sighting
    pub average_dwell_secs: f64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Derived analytics for one sighting list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub total_entries: usize,
    pub unique_dates_count: usize,
    pub unique_coordinates_count: usize,
    /// Absent when there are no sightings
    pub most_frequent: Option<MostFrequent>,
    /// Sightings per day, in first-seen order
    pub dates: Histogram<DayKey>,
    /// Sightings per coordinate, in first-seen order
    pub coordinates: Histogram<CoordinateKey>,
    /// Dwell breakdown per coordinate, in first-seen order
    pub dwell: Vec<LocationDwell>,
}

impl AnalysisResult {
    /// Neutral result: zero counts, no most-frequent fields
    pub fn empty() -> Self {
        Self {
            total_entries: 0,
            unique_dates_count: 0,
            unique_coordinates_count: 0,
            most_frequent: None,
            dates: Histogram::default(),
            coordinates: Histogram::default(),
            dwell: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_entries == 0
    }

    /// Most frequent fields, or `EmptyInput` when nothing was analyzed
    pub fn require_most_frequent(&self) -> Result<&MostFrequent, AnalyticsError> {
        self.most_frequent.as_ref().ok_or(AnalyticsError::EmptyInput)
    }

    /// Average dwell time (seconds) for a coordinate, if it was sighted
    pub fn average_dwell(&self, key: &CoordinateKey) -> Option<f64> {
        self.dwell
            .iter()
            .find(|d| &d.coordinates == key)
            .map(|d| d.average_dwell_secs)
    }
}

/// Report producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Report provenance information
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportProvenance {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_sighting_utc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sighting_utc: Option<String>,
    pub computed_at_utc: String,
    pub visit_gap_secs: u64,
}

/// Most frequent block in the report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMostFrequent {
    pub date: String,
    pub coordinates: String,
    pub date_occurrences: u32,
    pub coordinate_occurrences: u32,
}

/// One histogram bar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportCount {
    pub key: String,
    pub count: u32,
}

/// One row of the per-location dwell table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDwell {
    pub location: String,
    pub average_time: f64,
    pub visit_count: u32,
    pub sightings: u32,
}

/// JSON report consumed by the rendering layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub provenance: ReportProvenance,
    pub total_entries: usize,
    pub unique_coordinates_count: usize,
    pub unique_dates_count: usize,
    pub most_frequent: Option<ReportMostFrequent>,
    pub dates: Vec<ReportCount>,
    pub coordinates: Vec<ReportCount>,
    pub avg_time_per_location: Vec<ReportDwell>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_coordinate_key_format() {
        let key = Coordinates::new(32.0853, 34.781768).key();
        assert_eq!(key.as_str(), "32.0853, 34.781768");

        // Whole numbers format without a trailing fraction
        let key = Coordinates::new(32.0, -5.0).key();
        assert_eq!(key.as_str(), "32, -5");
    }

    #[test]
    fn test_coordinate_key_exact_match() {
        let a = Coordinates::new(32.0853, 34.7818).key();
        let b = Coordinates::new(32.0853, 34.7818).key();
        let c = Coordinates::new(32.08531, 34.7818).key();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_day_key_truncates_time() {
        let morning = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 1).unwrap();
        let night = Utc.with_ymd_and_hms(2024, 3, 10, 23, 59, 59).unwrap();
        assert_eq!(DayKey::from(morning), DayKey::from(night));
        assert_eq!(DayKey::from(morning).to_string(), "2024-03-10");
    }

    #[test]
    fn test_empty_result_requires_most_frequent() {
        let result = AnalysisResult::empty();
        assert!(result.is_empty());
        assert!(matches!(
            result.require_most_frequent(),
            Err(AnalyticsError::EmptyInput)
        ));
    }
}
