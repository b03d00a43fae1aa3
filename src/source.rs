use crate::config::ParseConfig;
use crate::{Error, RowResult};
#[cfg(test)]
use crate::Row;
use csv::{ReaderBuilder, StringRecordsIntoIter};
use futures::{ready, Stream};
use std::fs::File;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

/// Rows of a CSV source, in file order. The header row, if any, is yielded
/// like any other row.
pub struct RowIter<R: io::Read> {
	inner: StringRecordsIntoIter<R>,
}

impl<R: io::Read> RowIter<R> {
	pub fn from_reader(reader: R, delimiter: u8) -> Self {
		let reader = ReaderBuilder::new()
			.has_headers(false)
			.flexible(true)
			.delimiter(delimiter)
			.from_reader(reader);
		RowIter {
			inner: reader.into_records(),
		}
	}
}

impl RowIter<File> {
	/// Opens the file configured in `config`
	pub fn open<T>(config: &ParseConfig<T>) -> Result<Self, Error> {
		let file = File::open(&config.source_path)?;
		Ok(Self::from_reader(file, config.delimiter()))
	}
}

impl<R: io::Read> Iterator for RowIter<R> {
	type Item = RowResult;

	fn next(&mut self) -> Option<Self::Item> {
		self.inner.next().map(|result| result.map_err(Error::from))
	}
}

/// Rows of a CSV file read on a blocking thread.
///
/// Ends after the last row or after the first error. If the reading thread
/// dies, the stream ends with an [`Io`](Error::Io) error instead.
pub struct RowStream {
	receiver: mpsc::Receiver<RowResult>,
	/// `None` once the reader has been joined
	reader: Option<JoinHandle<()>>,
}

impl RowStream {
	/// Must be called from within a tokio runtime.
	pub fn open<T>(config: &ParseConfig<T>) -> Self {
		let path = config.source_path.clone();
		let delimiter = config.delimiter();
		Self::spawn(move |sender| {
			let rows = match File::open(&path) {
				Ok(file) => RowIter::from_reader(file, delimiter),
				Err(e) => {
					let _ = sender.blocking_send(Err(Error::from(e)));
					return;
				}
			};
			for row in rows {
				let failed = row.is_err();
				// The receiver is gone once the parse is dropped
				if sender.blocking_send(row).is_err() || failed {
					trace!(path = %path.display(), "row reader stopped");
					return;
				}
			}
		})
	}

	fn spawn<F>(read: F) -> Self
	where
		F: FnOnce(mpsc::Sender<RowResult>) + Send + 'static,
	{
		let (sender, receiver) = mpsc::channel(64);
		let reader = tokio::task::spawn_blocking(move || read(sender));
		RowStream {
			receiver,
			reader: Some(reader),
		}
	}
}

impl Stream for RowStream {
	type Item = RowResult;

	fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		if let Some(row) = ready!(self.receiver.poll_recv(cx)) {
			return Poll::Ready(Some(row));
		}
		// Every sender is gone, so the reader has returned or panicked
		let reader = match self.reader.as_mut() {
			Some(reader) => reader,
			None => return Poll::Ready(None),
		};
		let joined = ready!(Pin::new(reader).poll(cx));
		self.reader = None;
		match joined {
			Ok(()) => Poll::Ready(None),
			Err(e) => Poll::Ready(Some(Err(Error::Io(io::Error::other(e))))),
		}
	}
}

#[test]
fn ragged_rows_are_kept() {
	let rows: Vec<_> = RowIter::from_reader("a,b,c\n1\n1,2,3,4\n".as_bytes(), b',')
		.collect::<Result<_, _>>()
		.unwrap();
	assert_eq!(rows.len(), 3);
	assert_eq!(rows[1], Row::from(vec!["1"]));
	assert_eq!(rows[2].len(), 4);
}

#[test]
fn tab_delimited() {
	let mut rows = RowIter::from_reader("a\tb\n".as_bytes(), b'\t');
	assert_eq!(rows.next().unwrap().unwrap(), Row::from(vec!["a", "b"]));
	assert!(rows.next().is_none());
}

#[test]
fn open_missing_file() {
	let config = ParseConfig::builder("test/does-not-exist.csv").build();
	assert!(matches!(RowIter::open(&config), Err(Error::Io(_))));
}

#[cfg(test)]
#[tokio::test]
async fn stream_reads_file() {
	use futures::StreamExt;

	let config = ParseConfig::builder("test/AB.csv").build();
	let rows: Vec<_> = RowStream::open(&config).collect().await;
	assert_eq!(rows.len(), 3);
	assert_eq!(rows[0].as_ref().unwrap(), &Row::from(vec!["a", "b"]));
}

#[cfg(test)]
#[tokio::test]
async fn stream_reports_missing_file() {
	use futures::StreamExt;

	let config = ParseConfig::builder("test/does-not-exist.csv").build();
	let mut rows = RowStream::open(&config);
	assert!(matches!(rows.next().await, Some(Err(Error::Io(_)))));
	assert!(rows.next().await.is_none());
}

#[cfg(test)]
#[tokio::test]
async fn stream_reports_dead_reader() {
	use futures::StreamExt;

	let mut rows = RowStream::spawn(|sender| {
		let _ = sender.blocking_send(Ok(Row::from(vec!["a"])));
		panic!("reader crashed");
	});
	assert!(matches!(rows.next().await, Some(Ok(_))));
	assert!(matches!(rows.next().await, Some(Err(Error::Io(_)))));
	assert!(rows.next().await.is_none());
}

#[cfg(test)]
#[tokio::test]
async fn parse_fails_when_reader_dies() {
	let config = ParseConfig::builder("x.csv").has_header_row(true).build();
	let rows = RowStream::spawn(|sender| {
		let _ = sender.blocking_send(Ok(Row::from(vec!["a"])));
		let _ = sender.blocking_send(Ok(Row::from(vec!["1"])));
		panic!("reader crashed");
	});
	let mapper = crate::RowMapper::new(&config).unwrap();
	assert!(matches!(crate::map_stream(mapper, rows).await, Err(Error::Io(_))));
}
