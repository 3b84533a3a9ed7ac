pub mod data_type;
pub mod observation;

pub use data_type::{DataType, Frequency, DATE_HEADER, STATION_HEADER};
pub use observation::ObservationRow;
