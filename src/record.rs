use crate::{BoxError, Error, Result, Row};
use linked_hash_map::LinkedHashMap;
use std::fmt;

/// A type that can be built from the fields of one CSV row, in column order.
///
/// ## Example
///
/// ```
/// use csv_mapper::{BoxError, CsvRecord};
///
/// struct Country {
/// 	id: String,
/// 	name: String,
/// }
///
/// impl CsvRecord for Country {
/// 	fn field_names() -> &'static [&'static str] {
/// 		&["id", "name"]
/// 	}
///
/// 	fn from_fields(fields: Vec<String>) -> Result<Self, BoxError> {
/// 		let mut fields = fields.into_iter();
/// 		Ok(Country {
/// 			id: fields.next().unwrap_or_default(),
/// 			name: fields.next().unwrap_or_default(),
/// 		})
/// 	}
/// }
/// ```
pub trait CsvRecord: Sized {
	/// The fields this type expects, in the order `from_fields` receives them
	fn field_names() -> &'static [&'static str];

	/// Rows may have fewer or more fields than [`field_names`](Self::field_names).
	/// Missing trailing fields should be defaulted.
	fn from_fields(fields: Vec<String>) -> Result<Self, BoxError>;
}

type Factory<T> = Box<dyn Fn(Vec<String>) -> Result<T, BoxError> + Send + Sync>;

/// Describes how to build a `T` from a row, and which fields `T` expects.
pub struct RecordType<T> {
	factory: Factory<T>,
	field_names: Option<Vec<String>>,
}

impl<T> RecordType<T> {
	/// Use the [`CsvRecord`] implementation of `T`
	pub fn of() -> Self
	where
		T: CsvRecord + 'static,
	{
		RecordType {
			factory: Box::new(T::from_fields),
			field_names: Some(T::field_names().iter().map(|name| name.to_string()).collect()),
		}
	}

	/// Build records with a closure. The result only passes
	/// [`verify`](Self::verify) once it's given its field names with
	/// [`with_field_names`](Self::with_field_names).
	pub fn from_fn<F>(factory: F) -> Self
	where
		F: Fn(Vec<String>) -> Result<T, BoxError> + Send + Sync + 'static,
	{
		RecordType {
			factory: Box::new(factory),
			field_names: None,
		}
	}

	pub fn with_field_names<I, S>(mut self, names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.field_names = Some(names.into_iter().map(Into::into).collect());
		self
	}

	pub fn field_names(&self) -> Option<&[String]> {
		self.field_names.as_deref()
	}

	/// Checks that this record type can report the fields it expects.
	pub fn verify(&self) -> Result<()> {
		match &self.field_names {
			None => Err(Error::Configuration(
				"record type does not report its field names".to_string(),
			)),
			Some(_) => Ok(()),
		}
	}

	pub fn build(&self, fields: Vec<String>) -> Result<T, BoxError> {
		(self.factory)(fields)
	}
}

impl<T> fmt::Debug for RecordType<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RecordType")
			.field("field_names", &self.field_names)
			.finish_non_exhaustive()
	}
}

/// One mapped row. Which variant you get depends only on the configuration,
/// so every record of a parse has the same variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Record<T> {
	/// Built by the configured [`RecordType`]
	Typed(T),
	/// Header name to field, in column order
	Keyed(LinkedHashMap<String, String>),
	/// The row as read
	Raw(Row),
}

impl<T> Record<T> {
	pub fn typed(self) -> Option<T> {
		match self {
			Record::Typed(value) => Some(value),
			_ => None,
		}
	}

	pub fn keyed(&self) -> Option<&LinkedHashMap<String, String>> {
		match self {
			Record::Keyed(map) => Some(map),
			_ => None,
		}
	}

	pub fn raw(&self) -> Option<&Row> {
		match self {
			Record::Raw(row) => Some(row),
			_ => None,
		}
	}
}

#[cfg(test)]
struct Pair(String, String);

#[cfg(test)]
impl CsvRecord for Pair {
	fn field_names() -> &'static [&'static str] {
		&["left", "right"]
	}
	fn from_fields(fields: Vec<String>) -> Result<Self, BoxError> {
		let mut fields = fields.into_iter();
		Ok(Pair(
			fields.next().unwrap_or_default(),
			fields.next().unwrap_or_default(),
		))
	}
}

#[test]
fn csv_record_passes_verify() {
	let record_type = RecordType::<Pair>::of();
	record_type.verify().unwrap();
	assert_eq!(record_type.field_names().unwrap(), ["left", "right"]);

	let pair = record_type.build(vec!["1".to_string()]).unwrap();
	assert_eq!((pair.0.as_str(), pair.1.as_str()), ("1", ""));
}

#[test]
fn closure_needs_field_names() {
	let record_type = RecordType::from_fn(|fields| Ok(fields));
	assert!(matches!(record_type.verify(), Err(Error::Configuration(_))));

	// Reporting no fields is still reporting them
	let record_type = record_type.with_field_names(Vec::<String>::new());
	record_type.verify().unwrap();
	assert!(record_type.field_names().unwrap().is_empty());

	let record_type = record_type.with_field_names(["a", "b"]);
	record_type.verify().unwrap();
}
