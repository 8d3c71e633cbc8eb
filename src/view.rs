//! Audience-facing refinements of a pedestrian data response: totals per
//! person group and filtering by weather.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::QueryError;
use crate::query::HourlyRecord;

/// Keyword that disables the weather filter.
pub const ANY_WEATHER: &str = "all";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonGroup {
    #[default]
    All,
    Adults,
    Children,
}

impl FromStr for PersonGroup {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(PersonGroup::All),
            "adults" => Ok(PersonGroup::Adults),
            "children" => Ok(PersonGroup::Children),
            _ => Err(QueryError::UnknownGroup(s.to_string())),
        }
    }
}

impl fmt::Display for PersonGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PersonGroup::All => "all",
            PersonGroup::Adults => "adults",
            PersonGroup::Children => "children",
        })
    }
}

/// People counted in `record` for `group`. Absent counts contribute zero;
/// sums saturate at `u64::MAX`.
pub fn people(record: &HourlyRecord, group: PersonGroup) -> u64 {
    let n = |v: Option<u64>| v.unwrap_or(0);
    match group {
        PersonGroup::All => n(record.pedestrians_count),
        PersonGroup::Adults => n(record.adult_ltr_pedestrians_count)
            .saturating_add(n(record.adult_rtl_pedestrians_count)),
        PersonGroup::Children => n(record.child_ltr_pedestrians_count)
            .saturating_add(n(record.child_rtl_pedestrians_count)),
    }
}

/// Keeps rows whose weather matches `weather` after trimming both sides.
/// [`ANY_WEATHER`] keeps everything.
pub fn filter_weather(records: Vec<HourlyRecord>, weather: &str) -> Vec<HourlyRecord> {
    let wanted = weather.trim();
    if wanted == ANY_WEATHER {
        return records;
    }
    records
        .into_iter()
        .filter(|r| r.weather_condition.as_deref().map(str::trim) == Some(wanted))
        .collect()
}

/// A row reduced to what an hourly people chart needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyPoint {
    pub hour: u32,
    pub people: u64,
    pub temperature: f64,
    pub weather_condition: Option<String>,
}

/// Chart points for `group`. Rows without a temperature are left out.
pub fn hourly_points(records: &[HourlyRecord], group: PersonGroup) -> Vec<HourlyPoint> {
    records
        .iter()
        .filter_map(|r| {
            Some(HourlyPoint {
                hour: r.hour,
                people: people(r, group),
                temperature: r.temperature?,
                weather_condition: r.weather_condition.clone(),
            })
        })
        .collect()
}
