use chrono::{Duration, NaiveDate, TimeZone, Utc};
use pretty_assertions::assert_eq;
use sighting_flux::dwell::segment_visits;
use sighting_flux::{
    analyze, AnalyticsError, AnalyzerConfig, CoordinateKey, Coordinates, LocationAnalyzer,
    Sighting, SightingProcessor, SightingRecordAdapter, TieBreak,
};

fn at(secs: i64) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap() + Duration::seconds(secs)
}

#[test]
fn end_to_end_subject_document() {
    let json = r#"{
        "fullName": "Jane Roe",
        "locations": [
            {"coordinates": {"lat": 40.7128, "lng": -74.006}, "date": {"$date": "2024-03-10T09:00:00Z"}},
            {"coordinates": {"lat": 40.7128, "lng": -74.006}, "date": {"$date": {"$numberLong": "1710061800000"}}},
            {"coordinates": {"lat": 40.7306, "lng": -73.9352}, "date": 1710075600000},
            {"coordinates": {"lat": 40.7128, "lng": -74.006}, "date": "2024-03-11T09:00:00+00:00"}
        ]
    }"#;

    let report: serde_json::Value =
        serde_json::from_str(&SightingProcessor::new().process_subject(json).unwrap()).unwrap();

    assert_eq!(report["provenance"]["subject"], "Jane Roe");
    assert_eq!(report["totalEntries"], 4);
    assert_eq!(report["uniqueCoordinatesCount"], 2);
    assert_eq!(report["uniqueDatesCount"], 2);
    assert_eq!(report["mostFrequent"]["date"], "2024-03-10");
    assert_eq!(report["mostFrequent"]["coordinates"], "40.7128, -74.006");
    assert_eq!(report["dates"][1]["key"], "2024-03-11");

    // 09:00 and 09:10 form one 600 s visit, the next day is a second visit
    let first = &report["avgTimePerLocation"][0];
    assert_eq!(first["location"], "40.7128, -74.006");
    assert_eq!(first["visitCount"], 2);
    assert_eq!(first["averageTime"], 300.0);
    assert_eq!(report["avgTimePerLocation"][1]["averageTime"], 0.0);
}

#[test]
fn counts_sum_to_total() {
    let a = Coordinates::new(1.0, 2.0);
    let b = Coordinates::new(3.0, 4.0);
    let sightings: Vec<Sighting> = (0..25)
        .map(|i| {
            let coords = if i % 3 == 0 { a } else { b };
            Sighting::new(coords, at(i * 7_200))
        })
        .collect();

    let result = analyze(&sightings);
    assert_eq!(result.dates.total(), 25);
    assert_eq!(result.coordinates.total(), 25);
    assert_eq!(result.unique_dates_count, result.dates.len());
    assert_eq!(result.dwell.len(), result.unique_coordinates_count);
}

#[test]
fn repeated_runs_are_identical() {
    let sightings = vec![
        Sighting::new(Coordinates::new(5.5, 6.5), at(0)),
        Sighting::new(Coordinates::new(7.5, 8.5), at(100)),
        Sighting::new(Coordinates::new(5.5, 6.5), at(400)),
    ];
    let analyzer = LocationAnalyzer::default();
    assert_eq!(analyzer.analyze(&sightings), analyzer.analyze(&sightings));
}

#[test]
fn day_key_ignores_time_of_day() {
    let coords = Coordinates::new(0.0, 0.0);
    let result = analyze(&[
        Sighting::new(coords, Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap()),
        Sighting::new(coords, Utc.with_ymd_and_hms(2024, 3, 10, 23, 59, 59).unwrap()),
    ]);

    assert_eq!(result.unique_dates_count, 1);
    let most = result.require_most_frequent().unwrap();
    assert_eq!(most.date.date(), NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
    assert_eq!(most.date_occurrences, 2);
}

#[test]
fn gap_threshold_is_configurable() {
    let coords = Coordinates::new(9.0, 9.0);
    let sightings = vec![
        Sighting::new(coords, at(0)),
        Sighting::new(coords, at(1_200)),
    ];

    let default = analyze(&sightings);
    assert_eq!(default.average_dwell(&coords.key()), Some(0.0));

    let wide = LocationAnalyzer::new(AnalyzerConfig::default().with_visit_gap_secs(1_800))
        .analyze(&sightings);
    assert_eq!(wide.average_dwell(&coords.key()), Some(1_200.0));
}

#[test]
fn lexicographic_ties_pick_smallest_key() {
    let sightings = vec![
        Sighting::new(Coordinates::new(9.0, 9.0), at(0)),
        Sighting::new(Coordinates::new(1.0, 1.0), at(10)),
    ];

    let first_seen = analyze(&sightings);
    assert_eq!(
        first_seen.most_frequent.unwrap().coordinates,
        CoordinateKey::from(Coordinates::new(9.0, 9.0))
    );

    let lexicographic =
        LocationAnalyzer::new(AnalyzerConfig::default().with_tie_break(TieBreak::Lexicographic))
            .analyze(&sightings);
    assert_eq!(lexicographic.most_frequent.unwrap().coordinates.as_str(), "1, 1");
}

#[test]
fn empty_input_has_no_most_frequent() {
    let result = analyze(&[]);
    assert!(result.is_empty());
    assert!(matches!(
        result.require_most_frequent(),
        Err(AnalyticsError::EmptyInput)
    ));
}

#[test]
fn segment_visits_matches_dwell_average() {
    let visits = segment_visits(&[at(20_000), at(0), at(600)], Duration::seconds(900));
    assert_eq!(visits.len(), 2);
    assert_eq!(visits[0].duration_secs(), 600.0);
    assert_eq!(visits[1].sightings, 1);
}

#[test]
fn validation_reports_every_bad_record() {
    let records = SightingRecordAdapter::parse_array(
        r#"[
            {"coordinates": {"lat": 95.0, "lng": 0.0}, "date": "2024-03-10T00:00:00Z"},
            {"coordinates": {"lat": 1.0, "lng": 1.0}, "date": "2024-03-10T00:00:00Z"},
            {"coordinates": {"lat": 1.0, "lng": 1.0}, "date": "yesterday"}
        ]"#,
    )
    .unwrap();

    let failures = SightingRecordAdapter::validate_records(&records);
    let indices: Vec<usize> = failures.iter().map(|f| f.index).collect();
    assert_eq!(indices, vec![0, 2]);
}
