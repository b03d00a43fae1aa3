use crate::config::HeaderStyle;
use crate::Row;
use csv::StringRecordIter;
use linked_hash_map::LinkedHashMap;
use std::collections::BTreeMap;
use tracing::debug;

/// The header names of a CSV file, in column order
#[derive(Debug, Clone, PartialEq)]
pub struct Headers {
	indexes: BTreeMap<String, usize>,
	row: Row,
}

impl Headers {
	pub fn new() -> Self {
		Headers {
			indexes: BTreeMap::new(),
			row: Row::new(),
		}
	}

	/// Returns false if the name was already taken by an earlier column
	pub fn push_field(&mut self, name: &str) -> bool {
		self.row.push_field(name);
		self.indexes
			.insert(name.to_string(), self.row.len() - 1)
			.is_none()
	}

	pub fn get_row(&self) -> &Row {
		&self.row
	}

	pub fn len(&self) -> usize {
		self.row.len()
	}

	pub fn is_empty(&self) -> bool {
		self.row.is_empty()
	}

	/// Builds the headers from a header row, normalizing every name with `style`.
	///
	/// An empty name is replaced by its column index, so that it can't collide
	/// with other empty columns. Names may repeat, see [`map_row`](Self::map_row).
	pub fn from_row(row: &Row, style: HeaderStyle) -> Self {
		let mut headers = Headers::new();
		for (index, field) in row.iter().enumerate() {
			let name = match style.apply(field) {
				name if name.is_empty() => index.to_string(),
				name => name,
			};
			if !headers.push_field(&name) {
				debug!(%name, index, "repeated header name");
			}
		}
		headers
	}

	/// Pairs each field of `row` with the header at the same position.
	///
	/// Fields past the last header are dropped, and headers past the end of
	/// the row are left out of the map. When a name repeats, the key stays
	/// where the name first appears and takes the field of the last column
	/// with that name.
	pub fn map_row(&self, row: &Row) -> LinkedHashMap<String, String> {
		let mut map: LinkedHashMap<String, String> = LinkedHashMap::with_capacity(self.row.len());
		for (name, field) in self.row.iter().zip(row.iter()) {
			match map.get_mut(name) {
				Some(value) => *value = field.to_string(),
				None => {
					map.insert(name.to_string(), field.to_string());
				}
			}
		}
		map
	}
}

impl Default for Headers {
	fn default() -> Self {
		Self::new()
	}
}

impl<'a> IntoIterator for &'a Headers {
	type Item = &'a str;
	type IntoIter = StringRecordIter<'a>;

	fn into_iter(self) -> StringRecordIter<'a> {
		self.row.into_iter()
	}
}
impl From<Headers> for Row {
	fn from(headers: Headers) -> Row {
		headers.row
	}
}

/// Turns a header into a camelCase identifier.
///
/// Words are separated by any character that isn't alphanumeric. A word
/// written entirely in upper case is folded to lower case first, other words
/// keep their inner casing.
///
/// ```
/// use csv_mapper::normalize_header;
///
/// assert_eq!(normalize_header("First Name"), "firstName");
/// assert_eq!(normalize_header("USER ID"), "userId");
/// assert_eq!(normalize_header("firstName"), "firstName");
/// assert_eq!(normalize_header("  "), "");
/// ```
pub fn normalize_header(header: &str) -> String {
	let mut name = String::with_capacity(header.len());
	let words = header
		.split(|c: char| !c.is_alphanumeric())
		.filter(|word| !word.is_empty());
	for word in words {
		let folded;
		let word = if word.chars().any(char::is_lowercase) {
			word
		} else {
			folded = word.to_lowercase();
			folded.as_str()
		};
		let mut chars = word.chars();
		if let Some(first) = chars.next() {
			if name.is_empty() {
				name.extend(first.to_lowercase());
			} else {
				name.extend(first.to_uppercase());
			}
			name.push_str(chars.as_str());
		}
	}
	name
}

#[test]
fn normalizes_words() {
	assert_eq!(normalize_header("first name"), "firstName");
	assert_eq!(normalize_header("First_Name"), "firstName");
	assert_eq!(normalize_header("e-mail address"), "eMailAddress");
	assert_eq!(normalize_header("ID"), "id");
	assert_eq!(normalize_header("Zip Code 2"), "zipCode2");
	assert_eq!(normalize_header("a"), "a");
}

#[test]
fn empty_header_uses_position() {
	let row = Row::from(vec!["Name", "", "Age", ""]);
	let headers = Headers::from_row(&row, HeaderStyle::CamelCase);
	assert_eq!(headers.get_row(), &Row::from(vec!["name", "1", "age", "3"]));
	assert_eq!((&headers).into_iter().last(), Some("3"));
	assert_eq!(Row::from(headers).len(), 4);
}

#[test]
fn repeated_header_last_column_wins() {
	let headers = Headers::from_row(&Row::from(vec!["Name", "age", "name"]), HeaderStyle::CamelCase);
	assert_eq!(headers.len(), 3);

	let map = headers.map_row(&Row::from(vec!["a", "1", "b"]));
	assert_eq!(map.keys().collect::<Vec<_>>(), vec!["name", "age"]);
	assert_eq!(map["name"], "b");

	// The last column with the name is missing from this row
	let map = headers.map_row(&Row::from(vec!["a", "1"]));
	assert_eq!(map["name"], "a");

	let headers = Headers::from_row(&Row::from(vec!["Name", "name"]), HeaderStyle::Verbatim);
	let map = headers.map_row(&Row::from(vec!["a", "b"]));
	assert_eq!(map.len(), 2);
}

#[test]
fn header_named_like_a_position() {
	let headers = Headers::from_row(&Row::from(vec!["1", ""]), HeaderStyle::CamelCase);
	assert_eq!(headers.get_row(), &Row::from(vec!["1", "1"]));
	let map = headers.map_row(&Row::from(vec!["a", "b"]));
	assert_eq!(map.len(), 1);
	assert_eq!(map["1"], "b");
}

#[test]
fn map_row_is_positional() {
	let headers = Headers::from_row(&Row::from(vec!["a", "b", "c"]), HeaderStyle::Verbatim);

	let short = headers.map_row(&Row::from(vec!["1"]));
	assert_eq!(short.keys().collect::<Vec<_>>(), vec!["a"]);

	let long = headers.map_row(&Row::from(vec!["1", "2", "3", "4"]));
	assert_eq!(long.values().collect::<Vec<_>>(), vec!["1", "2", "3"]);
}
