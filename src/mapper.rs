use crate::config::{HeaderStyle, ParseConfig};
use crate::headers::Headers;
use crate::record::{Record, RecordType};
use crate::{Error, Result, Row, RowResult};
use futures::{Stream, StreamExt};
use tracing::{debug, trace};

/// How every row of one parse is mapped, decided from the configuration
/// before the first row is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
	/// Rows are returned as read
	Raw,
	/// The first row names the fields of every later row
	Keyed,
	/// Every row goes to the record type
	Typed,
	/// The first row is dropped, every later row goes to the record type
	TypedSkipHeader,
}

impl Mode {
	pub fn resolve(has_header_row: bool, has_record_type: bool) -> Self {
		match (has_header_row, has_record_type) {
			(true, true) => Mode::TypedSkipHeader,
			(true, false) => Mode::Keyed,
			(false, true) => Mode::Typed,
			(false, false) => Mode::Raw,
		}
	}
}

enum Strategy<'a, T> {
	Raw,
	Keyed {
		style: HeaderStyle,
		/// `None` until the header row is seen
		headers: Option<Headers>,
	},
	Typed {
		record_type: &'a RecordType<T>,
		skip_header: bool,
	},
}

/// Maps rows into records one at a time, in file order.
pub struct RowMapper<'a, T> {
	mode: Mode,
	strategy: Strategy<'a, T>,
	/// 1-based number of the last row received
	row_number: usize,
}

impl<'a, T> RowMapper<'a, T> {
	/// Fails if the configured record type can't report its field names.
	pub fn new(config: &'a ParseConfig<T>) -> Result<Self> {
		let mode = Mode::resolve(config.has_header_row, config.record_type.is_some());
		let strategy = match mode {
			Mode::Raw => Strategy::Raw,
			Mode::Keyed => Strategy::Keyed {
				style: config.header_style,
				headers: None,
			},
			Mode::Typed | Mode::TypedSkipHeader => {
				let record_type = match &config.record_type {
					Some(record_type) => record_type,
					None => unreachable!("typed modes are only resolved with a record type"),
				};
				record_type.verify()?;
				Strategy::Typed {
					record_type,
					skip_header: mode == Mode::TypedSkipHeader,
				}
			}
		};
		debug!(?mode, path = %config.source_path.display(), "resolved mapping mode");
		Ok(RowMapper {
			mode,
			strategy,
			row_number: 0,
		})
	}

	pub fn mode(&self) -> Mode {
		self.mode
	}

	/// The header names, once the header row has been read in [`Mode::Keyed`]
	pub fn headers(&self) -> Option<&Headers> {
		match &self.strategy {
			Strategy::Keyed { headers, .. } => headers.as_ref(),
			_ => None,
		}
	}

	/// Maps the next row. Returns `None` for a header row.
	pub fn map_row(&mut self, row: Row) -> Result<Option<Record<T>>> {
		self.row_number += 1;
		let row_number = self.row_number;
		match &mut self.strategy {
			Strategy::Raw => Ok(Some(Record::Raw(row))),
			Strategy::Keyed { style, headers } => match headers {
				Some(headers) => Ok(Some(Record::Keyed(headers.map_row(&row)))),
				None => {
					let new_headers = Headers::from_row(&row, *style);
					debug!(columns = new_headers.len(), "read header row");
					*headers = Some(new_headers);
					Ok(None)
				}
			},
			Strategy::Typed {
				record_type,
				skip_header,
			} => {
				if *skip_header {
					*skip_header = false;
					trace!(fields = row.len(), "skipped header row");
					return Ok(None);
				}
				let fields = row.iter().map(String::from).collect();
				let record = record_type.build(fields).map_err(|source| Error::Mapping {
					row: row_number,
					source,
				})?;
				Ok(Some(Record::Typed(record)))
			}
		}
	}

	/// Adapts an iterator of rows into an iterator of records
	pub fn records<I>(self, rows: I) -> Records<'a, I, T>
	where
		I: Iterator<Item = RowResult>,
	{
		Records {
			mapper: self,
			iterator: rows,
			failed: false,
		}
	}
}

/// Iterator returned by [`RowMapper::records`]. Stops after the first error.
pub struct Records<'a, I, T> {
	mapper: RowMapper<'a, T>,
	iterator: I,
	failed: bool,
}

impl<'a, I, T> Iterator for Records<'a, I, T>
where
	I: Iterator<Item = RowResult>,
{
	type Item = Result<Record<T>>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.failed {
			return None;
		}
		loop {
			let result = self
				.iterator
				.next()?
				.and_then(|row| self.mapper.map_row(row));
			match result {
				Ok(Some(record)) => return Some(Ok(record)),
				Ok(None) => continue,
				Err(e) => {
					self.failed = true;
					return Some(Err(e));
				}
			}
		}
	}
}

/// Maps every row, returning the records or the first error.
///
/// ## Example
///
/// ```
/// use csv_mapper::{map_rows, ParseConfig, Row, RowMapper};
///
/// let config = ParseConfig::builder("in-memory.csv").has_header_row(true).build();
/// let rows = vec![Row::from(vec!["Country Name"]), Row::from(vec!["Norway"])];
///
/// let records = map_rows(RowMapper::new(&config).unwrap(), rows.into_iter().map(Ok)).unwrap();
/// assert_eq!(records[0].keyed().unwrap()["countryName"], "Norway");
/// ```
pub fn map_rows<T, I>(mapper: RowMapper<'_, T>, rows: I) -> Result<Vec<Record<T>>>
where
	I: IntoIterator<Item = RowResult>,
{
	let records = mapper.records(rows.into_iter()).collect::<Result<Vec<_>>>()?;
	debug!(records = records.len(), "mapped rows");
	Ok(records)
}

/// Like [`map_rows`], for rows that arrive asynchronously.
pub async fn map_stream<T, S>(mut mapper: RowMapper<'_, T>, rows: S) -> Result<Vec<Record<T>>>
where
	S: Stream<Item = RowResult>,
{
	let mut rows = Box::pin(rows);
	let mut records = Vec::new();
	while let Some(row) = rows.next().await {
		if let Some(record) = mapper.map_row(row?)? {
			records.push(record);
		}
	}
	debug!(records = records.len(), "mapped rows");
	Ok(records)
}

#[cfg(test)]
#[derive(Debug, PartialEq)]
struct Echo(Vec<String>);

#[cfg(test)]
impl crate::CsvRecord for Echo {
	fn field_names() -> &'static [&'static str] {
		&["a", "b"]
	}
	fn from_fields(fields: Vec<String>) -> Result<Self, crate::BoxError> {
		Ok(Echo(fields))
	}
}

#[cfg(test)]
fn rows(rows: &[&[&str]]) -> Vec<RowResult> {
	rows.iter().map(|row| Ok(Row::from(row.to_vec()))).collect()
}

#[cfg(test)]
fn echo(fields: &[&str]) -> Record<Echo> {
	Record::Typed(Echo(fields.iter().map(|field| field.to_string()).collect()))
}

#[test]
fn resolves_every_mode() {
	assert_eq!(Mode::resolve(true, true), Mode::TypedSkipHeader);
	assert_eq!(Mode::resolve(true, false), Mode::Keyed);
	assert_eq!(Mode::resolve(false, true), Mode::Typed);
	assert_eq!(Mode::resolve(false, false), Mode::Raw);

	let config = ParseConfig::builder("x.csv")
		.has_header_row(true)
		.record_type(RecordType::<Echo>::of())
		.build();
	assert_eq!(RowMapper::new(&config).unwrap().mode(), Mode::TypedSkipHeader);

	let config = ParseConfig::builder("x.csv")
		.record_type(RecordType::<Echo>::of())
		.build();
	assert_eq!(RowMapper::new(&config).unwrap().mode(), Mode::Typed);
	let keyed = ParseConfig::builder("x.csv").has_header_row(true).build();
	let mut mapper = RowMapper::new(&keyed).unwrap();
	assert_eq!(mapper.mode(), Mode::Keyed);
	assert!(mapper.map_row(Row::from(vec!["a"])).unwrap().is_none());
	assert!(mapper.headers().is_some());
	let raw = ParseConfig::builder("x.csv").build();
	assert_eq!(RowMapper::new(&raw).unwrap().mode(), Mode::Raw);
}

#[test]
fn keyed_by_header() {
	let config = ParseConfig::builder("x.csv").has_header_row(true).build();
	let mapper = RowMapper::new(&config).unwrap();
	let records = map_rows(mapper, rows(&[&["a", "b"], &["1", "2"], &["3", "4"]])).unwrap();

	assert_eq!(records.len(), 2);
	let first = records[0].keyed().unwrap();
	assert_eq!(first.keys().collect::<Vec<_>>(), vec!["a", "b"]);
	assert_eq!(first["a"], "1");
	assert_eq!(first["b"], "2");
	let second = records[1].keyed().unwrap();
	assert_eq!(second["a"], "3");
	assert_eq!(second["b"], "4");
}

#[test]
fn header_names_are_normalized() {
	let config = ParseConfig::builder("x.csv").has_header_row(true).build();
	let mut mapper = RowMapper::new(&config).unwrap();
	assert!(mapper.headers().is_none());
	assert!(mapper
		.map_row(Row::from(vec!["First Name", "", "ZIP"]))
		.unwrap()
		.is_none());
	assert_eq!(
		mapper.headers().unwrap().get_row(),
		&Row::from(vec!["firstName", "1", "zip"])
	);

	let record = mapper.map_row(Row::from(vec!["Ada", "x", "0150"])).unwrap().unwrap();
	let map = record.keyed().unwrap();
	assert_eq!(map["firstName"], "Ada");
	assert_eq!(map["1"], "x");
	assert!(!map.contains_key(""));
}

#[test]
fn ragged_rows_against_header() {
	let config = ParseConfig::builder("x.csv").has_header_row(true).build();
	let mapper = RowMapper::new(&config).unwrap();
	let records = map_rows(mapper, rows(&[&["a", "b", "c"], &["1"], &["1", "2", "3", "4"]])).unwrap();

	let short = records[0].keyed().unwrap();
	assert_eq!(short.len(), 1);
	assert_eq!(short["a"], "1");
	assert!(!short.contains_key("b"));

	let long = records[1].keyed().unwrap();
	assert_eq!(long.values().collect::<Vec<_>>(), vec!["1", "2", "3"]);
}

#[test]
fn raw_rows_unchanged() {
	let config = ParseConfig::builder("x.csv").build();
	let mapper = RowMapper::new(&config).unwrap();
	let records = map_rows(mapper, rows(&[&["a", "b"], &["1"], &["3", "4", "5"]])).unwrap();
	assert_eq!(
		records,
		vec![
			Record::Raw(Row::from(vec!["a", "b"])),
			Record::Raw(Row::from(vec!["1"])),
			Record::Raw(Row::from(vec!["3", "4", "5"])),
		]
	);
}

#[test]
fn typed_rows() {
	let config = ParseConfig::builder("x.csv")
		.record_type(RecordType::<Echo>::of())
		.build();
	let records = map_rows(RowMapper::new(&config).unwrap(), rows(&[&["a", "b"], &["1"]])).unwrap();
	assert_eq!(records, vec![echo(&["a", "b"]), echo(&["1"])]);

	let config = ParseConfig::builder("x.csv")
		.has_header_row(true)
		.record_type(RecordType::<Echo>::of())
		.build();
	let records = map_rows(
		RowMapper::new(&config).unwrap(),
		rows(&[&["not", "checked", "at all"], &["1", "2"], &["3", "4", "5"]]),
	)
	.unwrap();
	assert_eq!(records, vec![echo(&["1", "2"]), echo(&["3", "4", "5"])]);
}

#[test]
fn empty_input() {
	let keyed = ParseConfig::builder("x.csv").has_header_row(true).build();
	let raw = ParseConfig::builder("x.csv").build();
	let typed = ParseConfig::builder("x.csv")
		.record_type(RecordType::<Echo>::of())
		.build();
	let typed_header = ParseConfig::builder("x.csv")
		.has_header_row(true)
		.record_type(RecordType::<Echo>::of())
		.build();

	assert!(map_rows(RowMapper::new(&keyed).unwrap(), vec![]).unwrap().is_empty());
	assert!(map_rows(RowMapper::new(&raw).unwrap(), vec![]).unwrap().is_empty());
	assert!(map_rows(RowMapper::new(&typed).unwrap(), vec![]).unwrap().is_empty());
	assert!(map_rows(RowMapper::new(&typed_header).unwrap(), vec![])
		.unwrap()
		.is_empty());

	// Only a header row
	assert!(map_rows(RowMapper::new(&keyed).unwrap(), rows(&[&["a", "b"]]))
		.unwrap()
		.is_empty());
	assert!(map_rows(RowMapper::new(&typed_header).unwrap(), rows(&[&["a", "b"]]))
		.unwrap()
		.is_empty());
}

#[test]
fn source_error_discards_records() {
	let config = ParseConfig::builder("x.csv").has_header_row(true).build();
	let mut input = rows(&[&["a"], &["1"], &["2"]]);
	input.push(Err(Error::Io(std::io::Error::new(
		std::io::ErrorKind::Other,
		"disk on fire",
	))));
	input.extend(rows(&[&["3"]]));

	match map_rows(RowMapper::new(&config).unwrap(), input) {
		Err(Error::Io(e)) => assert_eq!(e.to_string(), "disk on fire"),
		other => panic!("Expected the source error, got {:?}", other),
	}
}

#[test]
fn records_stop_after_error() {
	let config = ParseConfig::builder("x.csv").build();
	let mut input = rows(&[&["1"]]);
	input.push(Err(Error::Configuration("boom".to_string())));
	input.extend(rows(&[&["2"]]));

	let mut records = RowMapper::new(&config).unwrap().records(input.into_iter());
	assert!(records.next().unwrap().is_ok());
	assert!(records.next().unwrap().is_err());
	assert!(records.next().is_none());
}

#[test]
fn mapping_error_names_row() {
	let record_type = RecordType::from_fn(|fields: Vec<String>| {
		fields[0].parse::<u32>().map_err(crate::BoxError::from)
	})
	.with_field_names(["n"]);
	let config = ParseConfig::builder("x.csv")
		.has_header_row(true)
		.record_type(record_type)
		.build();

	let result = map_rows(
		RowMapper::new(&config).unwrap(),
		rows(&[&["n"], &["1"], &["two"], &["3"]]),
	);
	match result {
		Err(Error::Mapping { row, .. }) => assert_eq!(row, 3),
		other => panic!("Expected a mapping error, got {:?}", other),
	}

	// The row mapped before the failure is never handed out after it
	let mut records = RowMapper::new(&config)
		.unwrap()
		.records(rows(&[&["n"], &["1"], &["two"], &["3"]]).into_iter());
	assert_eq!(records.next().unwrap().unwrap(), Record::Typed(1));
	assert!(matches!(records.next(), Some(Err(Error::Mapping { row: 3, .. }))));
	assert!(records.next().is_none());
}

#[test]
fn record_type_checked_up_front() {
	let config = ParseConfig::builder("x.csv")
		.record_type(RecordType::from_fn(|fields| Ok(Echo(fields))))
		.build();
	assert!(matches!(RowMapper::new(&config), Err(Error::Configuration(_))));
}

#[test]
fn record_type_without_fields() {
	struct Everything(Vec<String>);

	impl crate::CsvRecord for Everything {
		fn field_names() -> &'static [&'static str] {
			&[]
		}
		fn from_fields(fields: Vec<String>) -> Result<Self, crate::BoxError> {
			Ok(Everything(fields))
		}
	}

	let config = ParseConfig::builder("x.csv")
		.record_type(RecordType::<Everything>::of())
		.build();
	let records = map_rows(RowMapper::new(&config).unwrap(), rows(&[&["1", "2", "3"]])).unwrap();
	assert_eq!(records.len(), 1);
	match &records[0] {
		Record::Typed(Everything(fields)) => assert_eq!(fields.len(), 3),
		_ => panic!("Expected a typed record"),
	}
}

#[test]
fn repeated_header_names() {
	let config = ParseConfig::builder("x.csv").has_header_row(true).build();
	let records = map_rows(
		RowMapper::new(&config).unwrap(),
		rows(&[&["Name", "name"], &["a", "b"]]),
	)
	.unwrap();
	assert_eq!(records.len(), 1);
	let map = records[0].keyed().unwrap();
	assert_eq!(map.len(), 1);
	assert_eq!(map["name"], "b");

	let records = map_rows(
		RowMapper::new(&config).unwrap(),
		rows(&[&["1", ""], &["a", "b"]]),
	)
	.unwrap();
	assert_eq!(records.len(), 1);
	assert_eq!(records[0].keyed().unwrap()["1"], "b");
}

#[cfg(test)]
#[tokio::test]
async fn stream_matches_iterator() {
	let config = ParseConfig::builder("x.csv").has_header_row(true).build();
	let input = rows(&[&["a", "b"], &["1", "2"], &["3", "4"]]);
	let streamed = map_stream(RowMapper::new(&config).unwrap(), futures::stream::iter(input))
		.await
		.unwrap();
	let input = rows(&[&["a", "b"], &["1", "2"], &["3", "4"]]);
	let iterated = map_rows(RowMapper::new(&config).unwrap(), input).unwrap();
	assert_eq!(streamed, iterated);
}

#[cfg(test)]
#[tokio::test]
async fn stream_error_discards_records() {
	let config = ParseConfig::builder("x.csv").build();
	let mut input = rows(&[&["1"], &["2"]]);
	input.push(Err(Error::Configuration("source failed".to_string())));
	let result = map_stream(RowMapper::new(&config).unwrap(), futures::stream::iter(input)).await;
	match result {
		Err(Error::Configuration(message)) => assert_eq!(message, "source failed"),
		other => panic!("Expected the source error, got {:?}", other),
	}
}
