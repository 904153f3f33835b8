//! Location analytics engine
//!
//! Aggregates one subject's sightings into daily and per-coordinate counts,
//! picks the most frequent day and coordinate, and estimates the average dwell
//! time at every coordinate.

use crate::config::AnalyzerConfig;
use crate::dwell::summarize_location;
use crate::histogram::FrequencyCounter;
use crate::types::{AnalysisResult, MostFrequent, Sighting};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Stateless analyzer carrying only its configuration.
///
/// Safe to share between threads; every call works on its own accumulators.
#[derive(Debug, Clone, Default)]
pub struct LocationAnalyzer {
    config: AnalyzerConfig,
}

impl LocationAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyze a sighting list. Input order only affects first-seen ordering.
    pub fn analyze(&self, sightings: &[Sighting]) -> AnalysisResult {
        if sightings.is_empty() {
            return AnalysisResult::empty();
        }

        let mut dates = FrequencyCounter::new();
        let mut coordinates = FrequencyCounter::new();
        // Parallel to `coordinates`: timestamps per first-seen position
        let mut timestamps: Vec<Vec<DateTime<Utc>>> = Vec::new();

        for sighting in sightings {
            dates.increment(sighting.day_key());

            let idx = coordinates.increment(sighting.coordinate_key());
            if idx == timestamps.len() {
                timestamps.push(Vec::new());
            }
            timestamps[idx].push(sighting.timestamp);
        }

        let dates = dates.finish();
        let coordinates = coordinates.finish();

        let tie_break = self.config.tie_break;
        let most_frequent = match (
            dates.most_frequent(tie_break),
            coordinates.most_frequent(tie_break),
        ) {
            (Some(day), Some(coord)) => Some(MostFrequent {
                date: day.key,
                date_occurrences: day.count,
                coordinates: coord.key.clone(),
                coordinate_occurrences: coord.count,
            }),
            _ => None,
        };

        let max_gap = self.config.visit_gap();
        let dwell = coordinates
            .keys()
            .zip(&timestamps)
            .filter_map(|(key, group)| summarize_location(key.clone(), group, max_gap))
            .collect();

        debug!(
            total = sightings.len(),
            days = dates.len(),
            locations = coordinates.len(),
            "analyzed sightings"
        );

        AnalysisResult {
            total_entries: sightings.len(),
            unique_dates_count: dates.len(),
            unique_coordinates_count: coordinates.len(),
            most_frequent,
            dates,
            coordinates,
            dwell,
        }
    }
}

/// Analyze with the default configuration (900 s visit gap, first-seen ties)
pub fn analyze(sightings: &[Sighting]) -> AnalysisResult {
    LocationAnalyzer::default().analyze(sightings)
}
