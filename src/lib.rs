//! Read a CSV file into records.
//!
//! Every row becomes one [`Record`]: your own type when a [`RecordType`] is
//! configured, a map keyed by the (normalized) header names when the file has
//! a header row, or the raw row otherwise.
//!
//! ```
//! use csv_mapper::{ParseConfig, Record};
//!
//! let config = ParseConfig::builder("test/AB.csv").has_header_row(true).build();
//! let records = csv_mapper::parse_blocking(&config).unwrap();
//!
//! match &records[0] {
//! 	Record::Keyed(map) => assert_eq!(map["a"], "1"),
//! 	_ => panic!("Expected a keyed record"),
//! }
//! ```

mod config;
mod headers;
mod mapper;
mod parse;
mod record;
mod source;

pub use config::{parse_flag, HeaderStyle, ParseConfig, ParseConfigBuilder};
pub use headers::{normalize_header, Headers};
pub use mapper::{map_rows, map_stream, Mode, Records, RowMapper};
pub use parse::{parse, parse_blocking};
pub use record::{CsvRecord, Record, RecordType};
pub use source::{RowIter, RowStream};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid configuration: {0}")]
	Configuration(String),
	#[error("CSV error: {0}")]
	Source(#[from] csv::Error),
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Could not build record from row {row}: {source}")]
	Mapping {
		/// 1-based position of the row in the file
		row: usize,
		source: BoxError,
	},
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub type Row = csv::StringRecord;
pub type RowResult = Result<Row>;
