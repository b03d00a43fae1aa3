use crate::config::ParseConfig;
use crate::mapper::{map_rows, map_stream, RowMapper};
use crate::record::Record;
use crate::source::{RowIter, RowStream};
use crate::Result;

/// Reads the configured file and maps every data row into a [`Record`].
///
/// The file is read on tokio's blocking pool, so this must run inside a tokio
/// runtime. Any error discards the records mapped so far.
///
/// ## Example
///
/// ```
/// use csv_mapper::{ParseConfig, Row};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let config = ParseConfig::builder("test/AB.csv").build();
/// let records = csv_mapper::parse(&config).await.unwrap();
///
/// assert_eq!(records.len(), 3);
/// assert_eq!(records[2].raw(), Some(&Row::from(vec!["3", "4"])));
/// # });
/// ```
pub async fn parse<T>(config: &ParseConfig<T>) -> Result<Vec<Record<T>>> {
	let mapper = RowMapper::new(config)?;
	map_stream(mapper, RowStream::open(config)).await
}

/// Blocking version of [`parse`]
pub fn parse_blocking<T>(config: &ParseConfig<T>) -> Result<Vec<Record<T>>> {
	let mapper = RowMapper::new(config)?;
	map_rows(mapper, RowIter::open(config)?)
}

#[cfg(test)]
use crate::{Error, HeaderStyle, RecordType, Row};

#[cfg(test)]
#[derive(Debug, PartialEq)]
struct Country {
	id: String,
	name: String,
	code: Option<String>,
}

#[cfg(test)]
impl crate::CsvRecord for Country {
	fn field_names() -> &'static [&'static str] {
		&["id", "name", "code"]
	}
	fn from_fields(fields: Vec<String>) -> Result<Self, crate::BoxError> {
		let mut fields = fields.into_iter();
		Ok(Country {
			id: fields.next().unwrap_or_default(),
			name: fields.next().unwrap_or_default(),
			code: fields.next(),
		})
	}
}

#[cfg(test)]
#[tokio::test]
async fn keyed_file() {
	let config = ParseConfig::builder("test/AB.csv").has_header_row(true).build();
	let records = parse(&config).await.unwrap();
	let maps: Vec<Vec<(&str, &str)>> = records
		.iter()
		.map(|record| {
			record
				.keyed()
				.unwrap()
				.iter()
				.map(|(k, v)| (k.as_str(), v.as_str()))
				.collect()
		})
		.collect();
	assert_eq!(maps, vec![vec![("a", "1"), ("b", "2")], vec![("a", "3"), ("b", "4")]]);
}

#[cfg(test)]
#[tokio::test]
async fn raw_file() {
	let config = ParseConfig::builder("test/AB.csv").build();
	let records = parse(&config).await.unwrap();
	let rows: Vec<_> = records.iter().map(|record| record.raw().unwrap().clone()).collect();
	assert_eq!(
		rows,
		vec![
			Row::from(vec!["a", "b"]),
			Row::from(vec!["1", "2"]),
			Row::from(vec!["3", "4"]),
		]
	);
}

#[cfg(test)]
#[tokio::test]
async fn empty_file() {
	let keyed = ParseConfig::builder("test/empty.csv").has_header_row(true).build();
	assert!(parse(&keyed).await.unwrap().is_empty());
	let raw = ParseConfig::builder("test/empty.csv").build();
	assert!(parse(&raw).await.unwrap().is_empty());
	let typed = ParseConfig::builder("test/empty.csv")
		.record_type(RecordType::<Country>::of())
		.build();
	assert!(parse(&typed).await.unwrap().is_empty());

	let header_only = ParseConfig::builder("test/header_only.csv")
		.has_header_row(true)
		.build();
	assert!(parse(&header_only).await.unwrap().is_empty());
}

#[cfg(test)]
#[tokio::test]
async fn typed_file() {
	let config = ParseConfig::builder("test/Countries.csv")
		.has_header_row(true)
		.record_type(RecordType::<Country>::of())
		.build();
	let countries: Vec<_> = parse(&config)
		.await
		.unwrap()
		.into_iter()
		.filter_map(|record| record.typed())
		.collect();
	assert_eq!(
		countries,
		vec![
			Country {
				id: "1".to_string(),
				name: "Norway".to_string(),
				code: Some("NO".to_string()),
			},
			Country {
				id: "2".to_string(),
				name: "Tuvalu".to_string(),
				code: None,
			},
		]
	);
}

#[cfg(test)]
#[tokio::test]
async fn config_is_reusable() {
	let config = ParseConfig::builder("test/Countries.csv").has_header_row(true).build();
	let (first, second) = tokio::join!(parse(&config), parse(&config));
	let first = first.unwrap();
	assert_eq!(first, second.unwrap());
	let norway = first[0].keyed().unwrap();
	assert_eq!(norway["countryName"], "Norway");
	assert_eq!(norway["2"], "NO");
	assert!(!first[1].keyed().unwrap().contains_key("2"));
}

#[cfg(test)]
#[tokio::test]
async fn missing_file() {
	let config = ParseConfig::builder("test/missing.csv").build();
	assert!(matches!(parse(&config).await, Err(Error::Io(_))));
}

#[cfg(test)]
#[tokio::test]
async fn record_type_checked_before_reading() {
	let config = ParseConfig::builder("test/missing.csv")
		.record_type(RecordType::from_fn(|fields| Ok(fields)))
		.build();
	assert!(matches!(parse(&config).await, Err(Error::Configuration(_))));
	assert!(matches!(parse_blocking(&config), Err(Error::Configuration(_))));
}

#[cfg(test)]
#[tokio::test]
async fn read_error_after_rows() {
	use std::io::Write;

	let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
	file.write_all(b"a\n1\n2\n\xff\xfe\n3\n").unwrap();
	let config = ParseConfig::builder(file.path()).has_header_row(true).build();

	assert!(matches!(parse(&config).await, Err(Error::Source(_))));
	assert!(matches!(parse_blocking(&config), Err(Error::Source(_))));
}

#[test]
fn blocking_tsv() {
	let config = ParseConfig::builder("test/people.tsv").has_header_row(true).build();
	let records = parse_blocking(&config).unwrap();
	assert_eq!(records.len(), 2);
	assert_eq!(records[1].keyed().unwrap()["lastName"], "Turing");

	let config = ParseConfig::builder("test/people.tsv")
		.has_header_row(true)
		.header_style(HeaderStyle::Verbatim)
		.build();
	let records = parse_blocking(&config).unwrap();
	assert_eq!(records[0].keyed().unwrap()["First Name"], "Ada");
}

#[cfg(test)]
#[tokio::test]
async fn mapping_error_fails_parse() {
	let record_type = RecordType::from_fn(|fields: Vec<String>| {
		let name = fields.get(1).cloned().unwrap_or_default();
		if name.is_empty() {
			return Err("country without a name".into());
		}
		Ok(name)
	})
	.with_field_names(["id", "name"]);
	let config = ParseConfig::builder("test/Countries.csv")
		.has_header_row(true)
		.record_type(record_type)
		.build();
	assert_eq!(parse(&config).await.unwrap().len(), 2);

	let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
	std::io::Write::write_all(&mut file, b"id,name\n1,Norway\n2\n3,Tuvalu\n").unwrap();
	let config = ParseConfig {
		source_path: file.path().to_path_buf(),
		..config
	};
	match parse(&config).await {
		Err(Error::Mapping { row, source }) => {
			assert_eq!(row, 3);
			assert_eq!(source.to_string(), "country without a name");
		}
		other => panic!("Expected a mapping error, got {:?}", other.map(|r| r.len())),
	}
	assert!(matches!(parse_blocking(&config), Err(Error::Mapping { row: 3, .. })));
}
