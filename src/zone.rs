//! Sub-zones of an observation point.

use std::fmt;
use std::str::FromStr;

use crate::dataset::{DirectionCounts, ObservationRecord};
use crate::error::QueryError;

/// Which part of an observation point a query looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Zone {
    /// The whole observation point.
    #[default]
    All,
    One,
    Two,
    Three,
}

impl Zone {
    /// The directional counts this zone contributes for `record`.
    pub fn counts(self, record: &ObservationRecord) -> DirectionCounts {
        match self {
            Zone::All => record.directions,
            Zone::One => record.zone_1,
            Zone::Two => record.zone_2,
            Zone::Three => record.zone_3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Zone::All => "all",
            Zone::One => "1",
            Zone::Two => "2",
            Zone::Three => "3",
        }
    }
}

impl FromStr for Zone {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Zone::All),
            "1" => Ok(Zone::One),
            "2" => Ok(Zone::Two),
            "3" => Ok(Zone::Three),
            _ => Err(QueryError::UnknownZone(s.to_string())),
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
