//! sighting.record.v1 wire format
//!
//! One record per sighting, as stored by the upstream subject tracker:
//!
//! ```json
//! { "coordinates": { "lat": 32.0853, "lng": 34.7818 }, "date": "2024-01-15T08:30:00Z" }
//! ```
//!
//! `date` is normally an ISO-8601 instant. Records exported through the
//! database driver's extended JSON wrap it instead:
//! - `{"$date": "2024-01-15T08:30:00Z"}` (relaxed)
//! - `{"$date": 1705307400000}` (legacy, epoch milliseconds)
//! - `{"$date": {"$numberLong": "1705307400000"}}` (canonical)
//!
//! A bare integer is read as epoch milliseconds.
//!
//! `lat` and `lng` may be JSON numbers or numeric strings (`"32.0853"`).

use crate::types::{Coordinates, Sighting};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Current record schema version
pub const SCHEMA_VERSION: &str = "sighting.record.v1";

/// Coordinates as they appear on the wire; either field may be missing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCoordinates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<RawNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<RawNumber>,
}

/// A coordinate component, numeric or textual
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Num(f64),
    Text(String),
}

impl RawNumber {
    fn to_f64(&self, field: &str) -> Result<f64, ValidationError> {
        match self {
            RawNumber::Num(n) => Ok(*n),
            RawNumber::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| ValidationError::InvalidCoordinate(format!("{field}: {s:?}"))),
        }
    }
}

impl From<f64> for RawNumber {
    fn from(n: f64) -> Self {
        RawNumber::Num(n)
    }
}

/// Sighting instant in any of the accepted encodings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordDate {
    Iso(String),
    Millis(i64),
    Extended(ExtendedDate),
}

/// Driver extended-JSON `{"$date": ...}` wrapper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendedDate {
    #[serde(rename = "$date")]
    pub date: ExtendedDateValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtendedDateValue {
    Iso(String),
    Millis(i64),
    NumberLong {
        #[serde(rename = "$numberLong")]
        number_long: String,
    },
}

impl RecordDate {
    /// Resolve to a UTC instant
    pub fn to_utc(&self) -> Result<DateTime<Utc>, ValidationError> {
        match self {
            RecordDate::Iso(s) => parse_iso(s),
            RecordDate::Millis(ms) => from_millis(*ms),
            RecordDate::Extended(ExtendedDate { date }) => match date {
                ExtendedDateValue::Iso(s) => parse_iso(s),
                ExtendedDateValue::Millis(ms) => from_millis(*ms),
                ExtendedDateValue::NumberLong { number_long } => {
                    let ms = number_long
                        .trim()
                        .parse::<i64>()
                        .map_err(|_| ValidationError::InvalidDate(number_long.clone()))?;
                    from_millis(ms)
                }
            },
        }
    }
}

impl From<DateTime<Utc>> for RecordDate {
    fn from(ts: DateTime<Utc>) -> Self {
        RecordDate::Iso(ts.to_rfc3339())
    }
}

fn parse_iso(s: &str) -> Result<DateTime<Utc>, ValidationError> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ValidationError::InvalidDate(format!("{s}: {e}")))
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>, ValidationError> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| ValidationError::InvalidDate(format!("{ms} ms out of range")))
}

/// One sighting record on the wire
///
/// A batch element whose JSON does not fit this shape is kept as a
/// malformed record, so batch policies still see it at its index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SightingRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<RawCoordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<RecordDate>,
    #[serde(skip)]
    malformed: Option<String>,
}

impl SightingRecord {
    pub fn new(lat: f64, lng: f64, date: DateTime<Utc>) -> Self {
        Self {
            coordinates: Some(RawCoordinates {
                lat: Some(lat.into()),
                lng: Some(lng.into()),
            }),
            date: Some(date.into()),
            malformed: None,
        }
    }

    /// A record that could not be decoded, with the decoder's reason
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self {
            malformed: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Decode one batch element. Never fails; shape errors become a
    /// malformed record.
    pub fn from_json_value(value: &Value) -> Self {
        Self::deserialize(value).unwrap_or_else(|e| Self::malformed(e.to_string()))
    }

    pub fn is_malformed(&self) -> bool {
        self.malformed.is_some()
    }

    /// Validate the record without converting it
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.to_sighting().map(|_| ())
    }

    /// Convert into a validated sighting
    pub fn to_sighting(&self) -> Result<Sighting, ValidationError> {
        if let Some(reason) = &self.malformed {
            return Err(ValidationError::Malformed(reason.clone()));
        }

        let raw = self
            .coordinates
            .as_ref()
            .ok_or(ValidationError::MissingField("coordinates"))?;
        let lat = raw
            .lat
            .as_ref()
            .ok_or(ValidationError::MissingField("coordinates.lat"))?
            .to_f64("lat")?;
        let lng = raw
            .lng
            .as_ref()
            .ok_or(ValidationError::MissingField("coordinates.lng"))?
            .to_f64("lng")?;

        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(ValidationError::LatitudeOutOfRange(lat));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(ValidationError::LongitudeOutOfRange(lng));
        }

        let timestamp = self
            .date
            .as_ref()
            .ok_or(ValidationError::MissingField("date"))?
            .to_utc()?;

        Ok(Sighting::new(Coordinates::new(lat, lng), timestamp))
    }
}

impl From<&Sighting> for SightingRecord {
    fn from(s: &Sighting) -> Self {
        SightingRecord::new(s.coordinates.lat, s.coordinates.lng, s.timestamp)
    }
}

/// Decode an array of records element by element
pub fn decode_records<'de, D>(deserializer: D) -> Result<Vec<SightingRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<Value>::deserialize(deserializer)?;
    Ok(values.iter().map(SightingRecord::from_json_value).collect())
}

/// Document identifier, `{"$oid": "<hex>"}` in extended JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjectId {
    Extended {
        #[serde(rename = "$oid")]
        oid: String,
    },
    Plain(String),
    Other(Value),
}

impl ObjectId {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ObjectId::Extended { oid } => Some(oid.as_str()),
            ObjectId::Plain(s) => Some(s.as_str()),
            ObjectId::Other(_) => None,
        }
    }
}

/// Subject document returned by the upstream lookup, carrying its sightings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<ObjectId>,
    #[serde(default, deserialize_with = "decode_records")]
    pub locations: Vec<SightingRecord>,
}

impl SubjectDocument {
    /// Display label: full name, then `id`, then the `_id` hex string
    pub fn subject(&self) -> Option<&str> {
        self.full_name
            .as_deref()
            .or(self.id.as_deref())
            .or_else(|| self.object_id.as_ref().and_then(ObjectId::as_str))
    }
}

/// Validation errors for sighting records
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Latitude out of range: {0}")]
    LatitudeOutOfRange(f64),

    #[error("Longitude out of range: {0}")]
    LongitudeOutOfRange(f64),

    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Malformed record: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap()
    }

    #[test]
    fn test_deserialize_iso_record() {
        let json = r#"{"coordinates": {"lat": 32.0853, "lng": 34.7818}, "date": "2024-01-15T08:30:00Z"}"#;
        let record: SightingRecord = serde_json::from_str(json).unwrap();
        let sighting = record.to_sighting().unwrap();
        assert_eq!(sighting.timestamp, expected());
        assert_eq!(sighting.coordinates, Coordinates::new(32.0853, 34.7818));
    }

    #[test]
    fn test_offset_normalized_to_utc() {
        let json = r#"{"coordinates": {"lat": 1, "lng": 2}, "date": "2024-01-15T10:30:00+02:00"}"#;
        let record: SightingRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.to_sighting().unwrap().timestamp, expected());
    }

    #[test]
    fn test_extended_date_variants_agree() {
        let millis = expected().timestamp_millis();
        let variants = [
            r#"{"$date": "2024-01-15T08:30:00Z"}"#.to_string(),
            format!(r#"{{"$date": {millis}}}"#),
            format!(r#"{{"$date": {{"$numberLong": "{millis}"}}}}"#),
            format!("{millis}"),
        ];

        for date in variants {
            let json = format!(r#"{{"coordinates": {{"lat": 1.5, "lng": 2.5}}, "date": {date}}}"#);
            let record: SightingRecord = serde_json::from_str(&json).unwrap();
            assert_eq!(record.to_sighting().unwrap().timestamp, expected(), "{date}");
        }
    }

    #[test]
    fn test_missing_fields() {
        let record: SightingRecord = serde_json::from_str(r#"{"date": "2024-01-15T08:30:00Z"}"#).unwrap();
        assert_eq!(record.validate(), Err(ValidationError::MissingField("coordinates")));

        let record: SightingRecord =
            serde_json::from_str(r#"{"coordinates": {"lat": 1.0}, "date": "2024-01-15T08:30:00Z"}"#).unwrap();
        assert_eq!(record.validate(), Err(ValidationError::MissingField("coordinates.lng")));

        let record: SightingRecord =
            serde_json::from_str(r#"{"coordinates": {"lat": 1.0, "lng": 2.0}}"#).unwrap();
        assert_eq!(record.validate(), Err(ValidationError::MissingField("date")));
    }

    #[test]
    fn test_out_of_range_coordinates() {
        let record = SightingRecord::new(91.0, 0.0, expected());
        assert_eq!(record.validate(), Err(ValidationError::LatitudeOutOfRange(91.0)));

        let record = SightingRecord::new(0.0, -180.5, expected());
        assert_eq!(record.validate(), Err(ValidationError::LongitudeOutOfRange(-180.5)));
    }

    #[test]
    fn test_unparseable_date() {
        let json = r#"{"coordinates": {"lat": 1, "lng": 2}, "date": "yesterday"}"#;
        let record: SightingRecord = serde_json::from_str(json).unwrap();
        assert!(matches!(record.validate(), Err(ValidationError::InvalidDate(_))));

        let json = r#"{"coordinates": {"lat": 1, "lng": 2}, "date": {"$date": {"$numberLong": "soon"}}}"#;
        let record: SightingRecord = serde_json::from_str(json).unwrap();
        assert!(matches!(record.validate(), Err(ValidationError::InvalidDate(_))));
    }

    #[test]
    fn test_sighting_round_trip_through_record() {
        let sighting = Sighting::new(Coordinates::new(-33.8688, 151.2093), expected());
        let record = SightingRecord::from(&sighting);
        assert_eq!(record.to_sighting().unwrap(), sighting);
    }

    #[test]
    fn test_string_coordinates() {
        let json = r#"{"coordinates": {"lat": "32.0800", "lng": " 34.7818"}, "date": "2024-01-15T08:30:00Z"}"#;
        let record: SightingRecord = serde_json::from_str(json).unwrap();
        let sighting = record.to_sighting().unwrap();
        assert_eq!(sighting.coordinates, Coordinates::new(32.08, 34.7818));
        assert_eq!(sighting.coordinate_key().as_str(), "32.08, 34.7818");
    }

    #[test]
    fn test_unparseable_string_coordinate() {
        let json = r#"{"coordinates": {"lat": "x", "lng": "2"}, "date": "2024-01-15T08:30:00Z"}"#;
        let record: SightingRecord = serde_json::from_str(json).unwrap();
        assert!(matches!(record.validate(), Err(ValidationError::InvalidCoordinate(_))));

        let json = r#"{"coordinates": {"lat": "NaN", "lng": "2"}, "date": "2024-01-15T08:30:00Z"}"#;
        let record: SightingRecord = serde_json::from_str(json).unwrap();
        assert!(matches!(record.validate(), Err(ValidationError::LatitudeOutOfRange(_))));
    }

    #[test]
    fn test_wrong_json_type_becomes_malformed() {
        let value = serde_json::json!({"coordinates": {"lat": 1, "lng": 2}, "date": true});
        let record = SightingRecord::from_json_value(&value);
        assert!(record.is_malformed());
        assert!(matches!(record.validate(), Err(ValidationError::Malformed(_))));

        let value = serde_json::json!({"coordinates": {"lat": 1, "lng": 2}, "date": 1.7e12});
        assert!(SightingRecord::from_json_value(&value).is_malformed());

        let value = serde_json::json!("not a record");
        assert!(SightingRecord::from_json_value(&value).is_malformed());
    }

    #[test]
    fn test_subject_falls_back_to_object_id() {
        let json = r#"{"_id": {"$oid": "65a4f0c2e4b0a1b2c3d4e5f6"}, "locations": []}"#;
        let doc: SubjectDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.subject(), Some("65a4f0c2e4b0a1b2c3d4e5f6"));

        let doc: SubjectDocument = serde_json::from_str(r#"{"_id": 42}"#).unwrap();
        assert_eq!(doc.subject(), None);
    }

    #[test]
    fn test_subject_document_with_string_coordinates() {
        let json = r#"{
            "fullName": "John Doe",
            "locations": [
                {"coordinates": {"lat": "32.0853", "lng": "34.7818"}, "date": {"$date": "2024-01-15T08:30:00Z"}},
                {"coordinates": {"lat": 1, "lng": 2}, "date": false}
            ]
        }"#;
        let doc: SubjectDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.locations.len(), 2);
        assert_eq!(
            doc.locations[0].to_sighting().unwrap().coordinates,
            Coordinates::new(32.0853, 34.7818)
        );
        assert!(doc.locations[1].is_malformed());
    }

    #[test]
    fn test_subject_document() {
        let json = r#"{
            "_id": {"$oid": "65a4f0c2e4b0a1b2c3d4e5f6"},
            "fullName": "John Doe",
            "embeddings_ids": [3, 7],
            "locations": [
                {"coordinates": {"lat": 1, "lng": 2}, "date": {"$date": 1705307400000}}
            ]
        }"#;
        let doc: SubjectDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.subject(), Some("John Doe"));
        assert_eq!(doc.locations.len(), 1);
        assert_eq!(doc.locations[0].to_sighting().unwrap().timestamp, expected());
    }
}
