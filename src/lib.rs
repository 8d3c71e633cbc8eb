pub mod dataset;
pub mod error;
pub mod fetch;
pub mod output;
pub mod query;
pub mod service;
pub mod view;
pub mod zone;

pub use dataset::{DatasetSource, DatasetTable, ObservationRecord};
pub use error::{DatasetError, QueryError};
pub use query::{HourlyRecord, LocationGroup, locations, pedestrian_data};
pub use service::{DatasetService, ServiceError};
pub use zone::Zone;
