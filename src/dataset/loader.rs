use std::io::Read;

use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, info};

use super::timestamp::parse_timestamp;
use super::{DatasetTable, DirectionCounts, ObservationRecord};
use crate::error::DatasetError;

/// Columns the loader projects the source onto. Anything else is ignored.
pub const RELEVANT_COLUMNS: [&str; 20] = [
    "timestamp",
    "location_name",
    "weather_condition",
    "temperature",
    "pedestrians_count",
    "ltr_pedestrians_count",
    "rtl_pedestrians_count",
    "adult_ltr_pedestrians_count",
    "adult_rtl_pedestrians_count",
    "child_ltr_pedestrians_count",
    "child_rtl_pedestrians_count",
    "rtl_label",
    "ltr_label",
    "collection_type",
    "zone_1_ltr_pedestrians_count",
    "zone_1_rtl_pedestrians_count",
    "zone_2_ltr_pedestrians_count",
    "zone_2_rtl_pedestrians_count",
    "zone_3_ltr_pedestrians_count",
    "zone_3_rtl_pedestrians_count",
];

/// A relevant column, in the same order as [`RELEVANT_COLUMNS`].
#[derive(Debug, Clone, Copy)]
enum Col {
    Timestamp,
    LocationName,
    WeatherCondition,
    Temperature,
    PedestriansCount,
    Ltr,
    Rtl,
    AdultLtr,
    AdultRtl,
    ChildLtr,
    ChildRtl,
    RtlLabel,
    LtrLabel,
    CollectionType,
    Zone1Ltr,
    Zone1Rtl,
    Zone2Ltr,
    Zone2Rtl,
    Zone3Ltr,
    Zone3Rtl,
}

/// Header position of every relevant column, resolved once per file.
struct Projection([usize; RELEVANT_COLUMNS.len()]);

impl Projection {
    fn from_headers(headers: &StringRecord) -> Result<Self, DatasetError> {
        let mut positions = [0; RELEVANT_COLUMNS.len()];
        let mut missing = Vec::new();

        for (slot, name) in positions.iter_mut().zip(RELEVANT_COLUMNS) {
            match headers.iter().position(|h| h.trim() == name) {
                Some(pos) => *slot = pos,
                None => missing.push(name.to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(DatasetError::Schema { missing });
        }
        Ok(Self(positions))
    }

    fn field<'r>(&self, row: &'r StringRecord, col: Col) -> &'r str {
        row.get(self.0[col as usize]).unwrap_or("")
    }

    fn count(&self, row: &StringRecord, col: Col) -> Option<u64> {
        parse_count(self.field(row, col))
    }

    fn counts(&self, row: &StringRecord, ltr: Col, rtl: Col) -> DirectionCounts {
        DirectionCounts::new(self.count(row, ltr), self.count(row, rtl))
    }

    fn text(&self, row: &StringRecord, col: Col) -> Option<String> {
        let value = self.field(row, col);
        (!value.is_empty()).then(|| value.to_string())
    }
}

/// Parses a non-negative count. Nullable integer columns are often exported
/// as floats (`"12.0"`), which are accepted when integral.
fn parse_count(raw: &str) -> Option<u64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(n) = s.parse::<u64>() {
        return Some(n);
    }
    let f: f64 = s.parse().ok()?;
    (f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64).then(|| f as u64)
}

fn parse_temperature(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|t| t.is_finite())
}

fn to_record(p: &Projection, row: &StringRecord) -> Option<ObservationRecord> {
    let timestamp = parse_timestamp(p.field(row, Col::Timestamp))?;

    let mut record = ObservationRecord::new(
        timestamp,
        p.field(row, Col::LocationName),
        p.field(row, Col::CollectionType),
    );
    record.weather_condition = p.text(row, Col::WeatherCondition);
    record.temperature = parse_temperature(p.field(row, Col::Temperature));
    record.ltr_label = p.text(row, Col::LtrLabel);
    record.rtl_label = p.text(row, Col::RtlLabel);

    record.pedestrians_count = p.count(row, Col::PedestriansCount);
    record.directions = p.counts(row, Col::Ltr, Col::Rtl);
    record.adult = p.counts(row, Col::AdultLtr, Col::AdultRtl);
    record.child = p.counts(row, Col::ChildLtr, Col::ChildRtl);
    record.zone_1 = p.counts(row, Col::Zone1Ltr, Col::Zone1Rtl);
    record.zone_2 = p.counts(row, Col::Zone2Ltr, Col::Zone2Rtl);
    record.zone_3 = p.counts(row, Col::Zone3Ltr, Col::Zone3Rtl);

    Some(record)
}

/// Builds a [`DatasetTable`] from CSV with a header row.
///
/// Rows whose timestamp cannot be parsed are dropped. Structural CSV errors
/// and missing columns fail the whole load.
pub fn load_from_reader<R: Read>(reader: R) -> Result<DatasetTable, DatasetError> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let projection = Projection::from_headers(rdr.headers()?)?;

    let mut records = Vec::new();
    let mut dropped = 0usize;

    for result in rdr.records() {
        let row = result?;
        match to_record(&projection, &row) {
            Some(record) => records.push(record),
            None => {
                dropped += 1;
                debug!(
                    line = row.position().map(|p| p.line()),
                    timestamp = projection.field(&row, Col::Timestamp),
                    "Dropping row with unparsable timestamp"
                );
            }
        }
    }

    let table = DatasetTable::from_records(records);
    info!(rows = table.len(), dropped, "Dataset loaded");
    Ok(table)
}

pub fn load_from_bytes(bytes: &[u8]) -> Result<DatasetTable, DatasetError> {
    load_from_reader(bytes)
}
