//! Reading request data as a byte stream.
//!
//! Data arrives either inline as an attachment or behind the scheduled
//! plan's download URL. [`open_stream`] gives actions one reader over both,
//! and the JSON helpers walk the rows of an export without holding the whole
//! document in memory.

use std::fmt;
use std::pin::Pin;

use actionhub_core::ActionRequest;
use futures::StreamExt;
use serde::Deserializer as _;
use serde::de::{self, DeserializeSeed, IgnoredAny, MapAccess, SeqAccess, Visitor};
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio_util::io::{StreamReader, SyncIoBridge};
use tracing::debug;

use crate::error::{ActionError, StreamError};

/// Request data as an async byte reader.
pub type DataReader = Pin<Box<dyn AsyncRead + Send>>;

/// One row of a `json` or `json_detail` export.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Rows parsed ahead of the consumer.
const ROW_BUFFER: usize = 64;

const CONSUMER_STOPPED: &str = "row consumer stopped";

/// A node of a `json_detail` export, in document order.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonDetailEvent {
    /// The `fields` metadata object.
    Fields(serde_json::Value),
    /// One entry of the `data` array.
    Row(Row),
    /// The `ran_at` timestamp.
    RanAt(String),
}

/// Open the request data for reading.
///
/// The download URL wins when both are present. Inline attachments are
/// wrapped so actions need a single code path.
pub async fn open_stream(
    request: &ActionRequest,
    client: &reqwest::Client,
) -> Result<DataReader, StreamError> {
    if let Some(url) = request.download_url() {
        debug!(url, "streaming request data from download url");
        let response = client.get(url).send().await?.error_for_status()?;
        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other));
        return Ok(Box::pin(StreamReader::new(chunks)));
    }

    match request
        .attachment
        .as_ref()
        .and_then(|a| a.data_buffer.clone())
    {
        Some(buffer) => Ok(Box::pin(std::io::Cursor::new(buffer))),
        None => Err(StreamError::NoData),
    }
}

/// Call `on_row` for every element of a `json` export's top-level array.
///
/// An error from `on_row` stops the stream and is returned as is.
pub async fn stream_json<F>(
    request: &ActionRequest,
    client: &reqwest::Client,
    on_row: F,
) -> Result<(), ActionError>
where
    F: FnMut(Row) -> Result<(), ActionError>,
{
    let reader = open_stream(request, client).await?;
    read_json_rows(reader, on_row).await
}

/// Call `on_event` for the `fields`, `data` rows and `ran_at` of a
/// `json_detail` export. Other top-level keys are skipped.
pub async fn stream_json_detail<F>(
    request: &ActionRequest,
    client: &reqwest::Client,
    on_event: F,
) -> Result<(), ActionError>
where
    F: FnMut(JsonDetailEvent) -> Result<(), ActionError>,
{
    let reader = open_stream(request, client).await?;
    read_json_detail(reader, on_event).await
}

/// [`stream_json`] over an already opened reader.
pub async fn read_json_rows<F>(reader: DataReader, on_row: F) -> Result<(), ActionError>
where
    F: FnMut(Row) -> Result<(), ActionError>,
{
    drive(
        reader,
        |input, tx| {
            let mut de = serde_json::Deserializer::from_reader(input);
            (&mut de).deserialize_seq(RowSeq { tx: &tx, wrap: |row: Row| row })?;
            de.end()
        },
        on_row,
    )
    .await
}

/// [`stream_json_detail`] over an already opened reader.
pub async fn read_json_detail<F>(reader: DataReader, on_event: F) -> Result<(), ActionError>
where
    F: FnMut(JsonDetailEvent) -> Result<(), ActionError>,
{
    drive(
        reader,
        |input, tx| {
            let mut de = serde_json::Deserializer::from_reader(input);
            (&mut de).deserialize_map(DetailVisitor { tx: &tx })?;
            de.end()
        },
        on_event,
    )
    .await
}

/// Parse on a blocking thread and hand each item to `on_item` here.
///
/// The channel is bounded, so a slow consumer slows the download rather than
/// buffering it.
async fn drive<T, P, F>(reader: DataReader, parse: P, mut on_item: F) -> Result<(), ActionError>
where
    T: Send + 'static,
    P: FnOnce(SyncIoBridge<DataReader>, mpsc::Sender<T>) -> Result<(), serde_json::Error>
        + Send
        + 'static,
    F: FnMut(T) -> Result<(), ActionError>,
{
    let (tx, mut rx) = mpsc::channel(ROW_BUFFER);
    let input = SyncIoBridge::new(reader);
    let parser = tokio::task::spawn_blocking(move || parse(input, tx));

    let mut stopped = None;
    while let Some(item) = rx.recv().await {
        if let Err(e) = on_item(item) {
            stopped = Some(e);
            break;
        }
    }
    drop(rx);

    let parsed = parser
        .await
        .map_err(|e| StreamError::Parser(e.to_string()))?;
    if let Some(e) = stopped {
        debug!(error = %e, "row callback stopped the stream");
        return Err(e);
    }
    parsed.map_err(StreamError::from)?;
    Ok(())
}

/// Sends each element of a JSON array down the channel as it is parsed.
struct RowSeq<'a, T, W> {
    tx: &'a mpsc::Sender<T>,
    wrap: W,
}

impl<'de, T, W> Visitor<'de> for RowSeq<'_, T, W>
where
    W: Fn(Row) -> T,
{
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of rows")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<(), A::Error> {
        while let Some(row) = seq.next_element::<Row>()? {
            if self.tx.blocking_send((self.wrap)(row)).is_err() {
                return Err(de::Error::custom(CONSUMER_STOPPED));
            }
        }
        Ok(())
    }
}

impl<'de, T, W> DeserializeSeed<'de> for RowSeq<'_, T, W>
where
    W: Fn(Row) -> T,
{
    type Value = ();

    fn deserialize<D: de::Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_seq(self)
    }
}

struct DetailVisitor<'a> {
    tx: &'a mpsc::Sender<JsonDetailEvent>,
}

impl DetailVisitor<'_> {
    fn send<E: de::Error>(&self, event: JsonDetailEvent) -> Result<(), E> {
        self.tx
            .blocking_send(event)
            .map_err(|_| E::custom(CONSUMER_STOPPED))
    }
}

impl<'de> Visitor<'de> for DetailVisitor<'_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a json_detail object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<(), A::Error> {
        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "data" => map.next_value_seed(RowSeq {
                    tx: self.tx,
                    wrap: JsonDetailEvent::Row,
                })?,
                "fields" => {
                    let fields = map.next_value::<serde_json::Value>()?;
                    self.send(JsonDetailEvent::Fields(fields))?;
                }
                "ran_at" => {
                    if let Some(ran_at) = map.next_value::<Option<String>>()? {
                        self.send(JsonDetailEvent::RanAt(ran_at))?;
                    }
                }
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(())
    }
}
