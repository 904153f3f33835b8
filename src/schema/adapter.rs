//! Adapter for converting sighting.record.v1 payloads into validated sightings
//!
//! Parsing accepts a JSON array of records, NDJSON (one record per line), or a
//! subject document with a `locations` array. Only the outer JSON structure
//! can fail parsing; an element that does not fit the record shape is kept
//! as a malformed record at its index. Conversion applies the configured
//! invalid-record policy and always returns a complete batch.

use crate::config::InvalidRecordPolicy;
use crate::error::AnalyticsError;
use crate::schema::record::*;
use crate::types::Sighting;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// Adapter for converting wire records to sightings
pub struct SightingRecordAdapter;

impl SightingRecordAdapter {
    /// Parse a JSON string containing an array of records
    pub fn parse_array(json: &str) -> Result<Vec<SightingRecord>, AnalyticsError> {
        let values: Vec<Value> = serde_json::from_str(json)?;
        Ok(values.iter().map(SightingRecord::from_json_value).collect())
    }

    /// Parse NDJSON (newline-delimited JSON) containing records
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<SightingRecord>, AnalyticsError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let value = serde_json::from_str::<Value>(trimmed).map_err(|e| {
                AnalyticsError::ParseError(format!("Failed to parse line {}: {}", line_num + 1, e))
            })?;
            let record = SightingRecord::deserialize(&value).unwrap_or_else(|e| {
                SightingRecord::malformed(format!("line {}: {}", line_num + 1, e))
            });
            records.push(record);
        }
        Ok(records)
    }

    /// Parse a subject document (`{"fullName": ..., "locations": [...]}`)
    pub fn parse_subject(json: &str) -> Result<SubjectDocument, AnalyticsError> {
        let doc: SubjectDocument = serde_json::from_str(json)?;
        Ok(doc)
    }

    /// Convert records to sightings under `policy`.
    ///
    /// `RejectBatch` fails on the first invalid record and reports its index.
    /// `SkipInvalid` drops invalid records with a warning.
    pub fn to_sightings(
        records: &[SightingRecord],
        policy: InvalidRecordPolicy,
    ) -> Result<Vec<Sighting>, AnalyticsError> {
        let mut sightings = Vec::with_capacity(records.len());

        for (index, record) in records.iter().enumerate() {
            match record.to_sighting() {
                Ok(sighting) => sightings.push(sighting),
                Err(e) => match policy {
                    InvalidRecordPolicy::RejectBatch => {
                        return Err(AnalyticsError::InvalidInput {
                            index,
                            reason: e.to_string(),
                        });
                    }
                    InvalidRecordPolicy::SkipInvalid => {
                        warn!(index, error = %e, "skipping invalid sighting record");
                    }
                },
            }
        }

        Ok(sightings)
    }

    /// Validate a batch of records, returning only the failures
    pub fn validate_records(records: &[SightingRecord]) -> Vec<ValidationResult> {
        records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                record
                    .validate()
                    .err()
                    .map(|error| ValidationResult { index, error })
            })
            .collect()
    }
}

/// A record that failed validation
#[derive(Debug)]
pub struct ValidationResult {
    pub index: usize,
    pub error: ValidationError,
}
