//! The in-memory dataset: observation records and the table that holds them.
//!
//! A [`DatasetTable`] is built once by the loader and never mutated
//! afterwards. Queries borrow it (or share it through an `Arc`) and build
//! their own output values.

mod loader;
pub mod source;
pub mod timestamp;

pub use loader::{RELEVANT_COLUMNS, load_from_bytes, load_from_reader};
pub use source::{DatasetSource, load};

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// `collection_type` value for rows that were actually counted on site.
pub const MEASURED: &str = "measured";

/// A pair of left-to-right / right-to-left counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectionCounts {
    pub ltr: Option<u64>,
    pub rtl: Option<u64>,
}

impl DirectionCounts {
    pub fn new(ltr: Option<u64>, rtl: Option<u64>) -> Self {
        Self { ltr, rtl }
    }

    /// `ltr + rtl`, absent if either side is absent.
    pub fn total(&self) -> Option<u64> {
        self.ltr?.checked_add(self.rtl?)
    }

    /// `|ltr - rtl|`, absent if either side is absent.
    pub fn imbalance(&self) -> Option<u64> {
        Some(self.ltr?.abs_diff(self.rtl?))
    }
}

/// One row of the dataset: counts at one location for one timestamp.
///
/// `date` and `hour` are always derived from `timestamp` in UTC, which is why
/// those three fields are only reachable through accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRecord {
    timestamp: DateTime<Utc>,
    date: NaiveDate,
    hour: u32,

    pub location_name: String,
    pub collection_type: String,
    pub weather_condition: Option<String>,
    pub temperature: Option<f64>,
    pub ltr_label: Option<String>,
    pub rtl_label: Option<String>,

    pub pedestrians_count: Option<u64>,
    pub directions: DirectionCounts,
    pub adult: DirectionCounts,
    pub child: DirectionCounts,

    pub zone_1: DirectionCounts,
    pub zone_2: DirectionCounts,
    pub zone_3: DirectionCounts,
}

impl ObservationRecord {
    /// Creates a record with every count and metadata field absent.
    pub fn new(
        timestamp: DateTime<Utc>,
        location_name: impl Into<String>,
        collection_type: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            date: timestamp.date_naive(),
            hour: timestamp.hour(),
            location_name: location_name.into(),
            collection_type: collection_type.into(),
            weather_condition: None,
            temperature: None,
            ltr_label: None,
            rtl_label: None,
            pedestrians_count: None,
            directions: DirectionCounts::default(),
            adult: DirectionCounts::default(),
            child: DirectionCounts::default(),
            zone_1: DirectionCounts::default(),
            zone_2: DirectionCounts::default(),
            zone_3: DirectionCounts::default(),
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn is_measured(&self) -> bool {
        self.collection_type == MEASURED
    }
}

/// Overview of a loaded table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub measured_rows: usize,
    pub locations: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

/// The full, immutable set of observation records.
#[derive(Debug, Default)]
pub struct DatasetTable {
    records: Vec<ObservationRecord>,
    // Row positions per date, in source order.
    by_date: BTreeMap<NaiveDate, Vec<usize>>,
}

impl DatasetTable {
    pub fn from_records(records: Vec<ObservationRecord>) -> Self {
        let mut by_date: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
        for (idx, record) in records.iter().enumerate() {
            by_date.entry(record.date()).or_default().push(idx);
        }
        Self { records, by_date }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ObservationRecord] {
        &self.records
    }

    /// All records on `date`, in source order.
    pub fn on_date(&self, date: NaiveDate) -> impl Iterator<Item = &ObservationRecord> + '_ {
        self.by_date
            .get(&date)
            .into_iter()
            .flatten()
            .map(|&idx| &self.records[idx])
    }

    pub fn summary(&self) -> DatasetSummary {
        let locations: HashSet<&str> = self
            .records
            .iter()
            .map(|r| r.location_name.as_str())
            .collect();

        DatasetSummary {
            rows: self.records.len(),
            measured_rows: self.records.iter().filter(|r| r.is_measured()).count(),
            locations: locations.len(),
            first_date: self.by_date.keys().next().copied(),
            last_date: self.by_date.keys().next_back().copied(),
        }
    }
}
