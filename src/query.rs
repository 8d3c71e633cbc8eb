//! The two read operations served from a [`DatasetTable`].
//!
//! Both are pure functions of the table and their arguments. Results are
//! freshly built values, so any number of queries can run side by side on
//! the same shared table.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::debug;

use crate::dataset::timestamp::parse_query_date;
use crate::dataset::{DatasetTable, ObservationRecord};
use crate::error::QueryError;
use crate::zone::Zone;

/// One hourly row of a pedestrian data response.
///
/// Field names are the public column names of the response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyRecord {
    pub timestamp: DateTime<Utc>,
    pub date: NaiveDate,
    pub hour: u32,
    pub location_name: String,
    pub ltr_label: Option<String>,
    pub rtl_label: Option<String>,
    pub weather_condition: Option<String>,
    pub temperature: Option<f64>,
    pub collection_type: String,
    pub pedestrians_count: Option<u64>,
    pub ltr_pedestrians_count: Option<u64>,
    pub rtl_pedestrians_count: Option<u64>,
    pub ltr_rtl_diff: Option<u64>,
    pub adult_ltr_pedestrians_count: Option<u64>,
    pub adult_rtl_pedestrians_count: Option<u64>,
    pub child_ltr_pedestrians_count: Option<u64>,
    pub child_rtl_pedestrians_count: Option<u64>,
}

impl HourlyRecord {
    /// Projects `record` as seen through `zone`.
    ///
    /// For a specific zone the directional counts come from that zone's
    /// columns and the total is their sum. The source record is untouched.
    fn project(record: &ObservationRecord, zone: Zone) -> Self {
        let directions = zone.counts(record);
        let pedestrians_count = match zone {
            Zone::All => record.pedestrians_count,
            _ => directions.total(),
        };

        HourlyRecord {
            timestamp: record.timestamp(),
            date: record.date(),
            hour: record.hour(),
            location_name: record.location_name.clone(),
            ltr_label: record.ltr_label.clone(),
            rtl_label: record.rtl_label.clone(),
            weather_condition: record.weather_condition.clone(),
            temperature: record.temperature,
            collection_type: record.collection_type.clone(),
            pedestrians_count,
            ltr_pedestrians_count: directions.ltr,
            rtl_pedestrians_count: directions.rtl,
            ltr_rtl_diff: directions.imbalance(),
            adult_ltr_pedestrians_count: record.adult.ltr,
            adult_rtl_pedestrians_count: record.adult.rtl,
            child_ltr_pedestrians_count: record.child.ltr,
            child_rtl_pedestrians_count: record.child.rtl,
        }
    }
}

/// Locations with measured data on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationGroup {
    pub date: NaiveDate,
    pub locations: Vec<String>,
}

/// Hourly records for `location` on `date`, optionally narrowed to a zone.
///
/// `date` accepts the usual date spellings; `zone` must be one of
/// `all`, `1`, `2`, `3`. No matching rows is an empty result, not an error.
pub fn pedestrian_data(
    table: &DatasetTable,
    location: &str,
    date: &str,
    zone: &str,
) -> Result<Vec<HourlyRecord>, QueryError> {
    let date = parse_query_date(date)?;
    let zone: Zone = zone.parse()?;
    Ok(pedestrian_data_on(table, location, date, zone))
}

/// Typed form of [`pedestrian_data`] for already validated arguments.
pub fn pedestrian_data_on(
    table: &DatasetTable,
    location: &str,
    date: NaiveDate,
    zone: Zone,
) -> Vec<HourlyRecord> {
    let mut rows: Vec<HourlyRecord> = table
        .on_date(date)
        .filter(|r| r.location_name == location)
        .map(|r| HourlyRecord::project(r, zone))
        .collect();

    // Stable: duplicate hours keep their source order.
    rows.sort_by_key(|r| r.hour);

    debug!(location, %date, %zone, rows = rows.len(), "Pedestrian data query");
    rows
}

/// Locations with measured rows on `date`, grouped by date.
pub fn locations(table: &DatasetTable, date: &str) -> Result<Vec<LocationGroup>, QueryError> {
    let date = parse_query_date(date)?;
    Ok(locations_on(table, date))
}

/// Typed form of [`locations`].
pub fn locations_on(table: &DatasetTable, date: NaiveDate) -> Vec<LocationGroup> {
    let mut seen: HashSet<(NaiveDate, &str)> = HashSet::new();
    let mut groups: Vec<LocationGroup> = Vec::new();

    for record in table.on_date(date).filter(|r| r.is_measured()) {
        if !seen.insert((record.date(), record.location_name.as_str())) {
            continue;
        }

        match groups.iter_mut().find(|g| g.date == record.date()) {
            Some(group) => group.locations.push(record.location_name.clone()),
            None => groups.push(LocationGroup {
                date: record.date(),
                locations: vec![record.location_name.clone()],
            }),
        }
    }

    debug!(%date, groups = groups.len(), "Locations query");
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{DirectionCounts, MEASURED};
    use chrono::TimeZone;

    fn record(day: u32, hour: u32, minute: u32, location: &str, kind: &str) -> ObservationRecord {
        let ts = Utc.with_ymd_and_hms(2021, 9, day, hour, minute, 0).unwrap();
        let mut r = ObservationRecord::new(ts, location, kind);
        r.pedestrians_count = Some(100);
        r.directions = DirectionCounts::new(Some(60), Some(40));
        r.zone_1 = DirectionCounts::new(Some(10), Some(15));
        r.zone_2 = DirectionCounts::new(Some(5), Some(3));
        r
    }

    fn table() -> DatasetTable {
        DatasetTable::from_records(vec![
            record(29, 12, 0, "Bahnhofstrasse", MEASURED),
            record(29, 9, 0, "Bahnhofstrasse", MEASURED),
            record(29, 9, 0, "Limmatquai", MEASURED),
            record(30, 9, 0, "Bahnhofstrasse", MEASURED),
            record(29, 23, 0, "Rennweg", "forecast"),
            record(29, 9, 30, "Bahnhofstrasse", "interpolated"),
            record(29, 15, 0, "Limmatquai", MEASURED),
        ])
    }

    #[test]
    fn test_filters_by_location_and_date() {
        let rows = pedestrian_data(&table(), "Bahnhofstrasse", "2021-09-29", "all").unwrap();
        assert_eq!(rows.len(), 3);
        let date = NaiveDate::from_ymd_opt(2021, 9, 29).unwrap();
        assert!(rows.iter().all(|r| r.location_name == "Bahnhofstrasse" && r.date == date));
    }

    #[test]
    fn test_location_match_is_case_sensitive() {
        let rows = pedestrian_data(&table(), "bahnhofstrasse", "2021-09-29", "all").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_sorted_by_hour_with_stable_ties() {
        let rows = pedestrian_data(&table(), "Bahnhofstrasse", "2021-09-29", "all").unwrap();
        let hours: Vec<_> = rows.iter().map(|r| r.hour).collect();
        assert_eq!(hours, vec![9, 9, 12]);
        // Both 09:xx rows keep their source order.
        assert_eq!(rows[0].collection_type, MEASURED);
        assert_eq!(rows[1].collection_type, "interpolated");
    }

    #[test]
    fn test_all_zone_keeps_source_totals() {
        let rows = pedestrian_data(&table(), "Limmatquai", "2021-09-29", "all").unwrap();
        let r = &rows[0];
        assert_eq!(r.pedestrians_count, Some(100));
        assert_eq!(r.ltr_pedestrians_count, Some(60));
        assert_eq!(r.rtl_pedestrians_count, Some(40));
        assert_eq!(r.ltr_rtl_diff, Some(20));
    }

    #[test]
    fn test_zone_substitution_does_not_touch_table() {
        let table = table();
        let rows = pedestrian_data(&table, "Limmatquai", "2021-09-29", "2").unwrap();
        for r in &rows {
            assert_eq!(r.ltr_pedestrians_count, Some(5));
            assert_eq!(r.rtl_pedestrians_count, Some(3));
            assert_eq!(r.pedestrians_count, Some(8));
            assert_eq!(r.ltr_rtl_diff, Some(2));
        }

        let source = table
            .records()
            .iter()
            .find(|r| r.location_name == "Limmatquai")
            .unwrap();
        assert_eq!(source.directions, DirectionCounts::new(Some(60), Some(40)));
        assert_eq!(source.pedestrians_count, Some(100));
        assert_eq!(source.zone_2, DirectionCounts::new(Some(5), Some(3)));
    }

    #[test]
    fn test_zone_without_data_yields_nulls() {
        let rows = pedestrian_data(&table(), "Limmatquai", "2021-09-29", "3").unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.pedestrians_count.is_none()));
        assert!(rows.iter().all(|r| r.ltr_rtl_diff.is_none()));
    }

    #[test]
    fn test_unknown_zone_is_rejected() {
        let err = pedestrian_data(&table(), "Limmatquai", "2021-09-29", "4").unwrap_err();
        assert_eq!(err, QueryError::UnknownZone("4".to_string()));
    }

    #[test]
    fn test_no_match_is_empty_not_error() {
        let rows = pedestrian_data(&table(), "Nowhere", "2099-01-01", "all").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_invalid_date() {
        assert_eq!(
            pedestrian_data(&table(), "Limmatquai", "yesterday", "all").unwrap_err(),
            QueryError::InvalidDate("yesterday".to_string())
        );
        assert_eq!(
            locations(&table(), "not-a-date").unwrap_err(),
            QueryError::InvalidDate("not-a-date".to_string())
        );
    }

    #[test]
    fn test_locations_measured_and_deduplicated() {
        let groups = locations(&table(), "2021-09-29").unwrap();
        assert_eq!(
            groups,
            vec![LocationGroup {
                date: NaiveDate::from_ymd_opt(2021, 9, 29).unwrap(),
                locations: vec!["Bahnhofstrasse".to_string(), "Limmatquai".to_string()],
            }]
        );
    }

    #[test]
    fn test_locations_exclude_forecast_only_sites() {
        let groups = locations(&table(), "2021-09-29").unwrap();
        assert!(groups[0].locations.iter().all(|l| l != "Rennweg"));
    }

    #[test]
    fn test_locations_empty_when_nothing_measured() {
        let table = DatasetTable::from_records(vec![record(29, 9, 0, "Rennweg", "forecast")]);
        assert!(locations(&table, "2021-09-29").unwrap().is_empty());
        assert!(locations(&table, "2099-01-01").unwrap().is_empty());
    }
}
