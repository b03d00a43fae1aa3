use crate::headers::normalize_header;
use crate::record::RecordType;
use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// How header names are turned into record keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderStyle {
	/// `"First Name"` becomes `firstName`, see [`normalize_header`]
	#[default]
	CamelCase,
	/// Keep the header exactly as written
	Verbatim,
}

impl HeaderStyle {
	pub fn apply(self, header: &str) -> String {
		match self {
			HeaderStyle::CamelCase => normalize_header(header),
			HeaderStyle::Verbatim => header.to_string(),
		}
	}
}

/// Everything one [`parse`](crate::parse) call needs. Can be reused for any
/// number of parses.
pub struct ParseConfig<T = ()> {
	pub source_path: PathBuf,
	pub has_header_row: bool,
	pub record_type: Option<RecordType<T>>,
	pub header_style: HeaderStyle,
	/// Overrides the delimiter picked from the file extension
	pub delimiter: Option<u8>,
}

impl ParseConfig<()> {
	/// Start a configuration that produces keyed or raw records.
	/// Use [`ParseConfigBuilder::record_type`] to map into your own type.
	pub fn builder<P: Into<PathBuf>>(source_path: P) -> ParseConfigBuilder<()> {
		ParseConfigBuilder {
			config: ParseConfig {
				source_path: source_path.into(),
				has_header_row: false,
				record_type: None,
				header_style: HeaderStyle::default(),
				delimiter: None,
			},
		}
	}
}

impl<T> ParseConfig<T> {
	/// The explicit delimiter, or one picked from the extension: tab for
	/// `.tsv` files, comma for everything else.
	pub fn delimiter(&self) -> u8 {
		self.delimiter
			.unwrap_or_else(|| delimiter_for(&self.source_path))
	}
}

fn delimiter_for(path: &Path) -> u8 {
	match path.extension().and_then(|ext| ext.to_str()) {
		Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
		_ => b',',
	}
}

pub struct ParseConfigBuilder<T> {
	config: ParseConfig<T>,
}

impl<T> ParseConfigBuilder<T> {
	pub fn has_header_row(mut self, has_header_row: bool) -> Self {
		self.config.has_header_row = has_header_row;
		self
	}

	/// Like [`has_header_row`](Self::has_header_row), for values coming from
	/// text such as CLI flags or environment variables. See [`parse_flag`].
	pub fn has_header_row_str(self, value: &str) -> Result<Self> {
		let has_header_row = parse_flag(value)?;
		Ok(self.has_header_row(has_header_row))
	}

	pub fn header_style(mut self, header_style: HeaderStyle) -> Self {
		self.config.header_style = header_style;
		self
	}

	pub fn delimiter(mut self, delimiter: u8) -> Self {
		self.config.delimiter = Some(delimiter);
		self
	}

	/// Map every data row into `U` instead of a keyed or raw record
	pub fn record_type<U>(self, record_type: RecordType<U>) -> ParseConfigBuilder<U> {
		let ParseConfig {
			source_path,
			has_header_row,
			header_style,
			delimiter,
			..
		} = self.config;
		ParseConfigBuilder {
			config: ParseConfig {
				source_path,
				has_header_row,
				record_type: Some(record_type),
				header_style,
				delimiter,
			},
		}
	}

	pub fn build(self) -> ParseConfig<T> {
		self.config
	}
}

/// Parses a boolean option given as text.
///
/// Accepts `true`/`false` in any case and `1`/`0`, ignoring surrounding
/// whitespace. Anything else is a [`Configuration`](Error::Configuration) error.
///
/// ```
/// use csv_mapper::parse_flag;
///
/// assert_eq!(parse_flag(" TRUE ").unwrap(), true);
/// assert_eq!(parse_flag("0").unwrap(), false);
/// assert!(parse_flag("yes please").is_err());
/// ```
pub fn parse_flag(value: &str) -> Result<bool> {
	let value = value.trim();
	if value.eq_ignore_ascii_case("true") || value == "1" {
		Ok(true)
	} else if value.eq_ignore_ascii_case("false") || value == "0" {
		Ok(false)
	} else {
		Err(Error::Configuration(format!(
			"Expected true or false, got {:?}",
			value
		)))
	}
}

#[test]
fn delimiter_from_extension() {
	assert_eq!(ParseConfig::builder("a/b.tsv").build().delimiter(), b'\t');
	assert_eq!(ParseConfig::builder("a/b.TSV").build().delimiter(), b'\t');
	assert_eq!(ParseConfig::builder("a/b.csv").build().delimiter(), b',');
	assert_eq!(ParseConfig::builder("a/b").build().delimiter(), b',');
	let config = ParseConfig::builder("a/b.tsv").delimiter(b';').build();
	assert_eq!(config.delimiter(), b';');
}

#[test]
fn header_flag_from_text() {
	let config = ParseConfig::builder("a.csv")
		.has_header_row_str("True")
		.unwrap()
		.build();
	assert!(config.has_header_row);

	match ParseConfig::builder("a.csv").has_header_row_str("maybe") {
		Err(Error::Configuration(message)) => assert!(message.contains("maybe")),
		_ => panic!("Expected a configuration error"),
	}
}

#[test]
fn record_type_keeps_options() {
	let config = ParseConfig::builder("a.tsv")
		.has_header_row(true)
		.header_style(HeaderStyle::Verbatim)
		.record_type(RecordType::from_fn(|fields| Ok(fields.len())))
		.build();
	assert!(config.has_header_row);
	assert_eq!(config.header_style, HeaderStyle::Verbatim);
	assert!(config.record_type.is_some());
}
