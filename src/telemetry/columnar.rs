//! Columnar export of events for analysis tooling

use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;

use super::EventInfo;
use crate::Result;

const UTC: &str = "UTC";

fn timestamp_type() -> DataType {
    DataType::Timestamp(TimeUnit::Microsecond, Some(UTC.into()))
}

/// Arrow schema of an event batch.
#[must_use]
pub fn event_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("experiment_start_time", timestamp_type(), false),
        Field::new("start_time", timestamp_type(), false),
        Field::new("end_time", timestamp_type(), false),
        Field::new("event_id", DataType::Utf8, false),
        Field::new("event_type", DataType::Utf8, false),
        Field::new("status", DataType::Utf8, false),
        Field::new("payload", DataType::Utf8, true),
    ]))
}

fn timestamps(events: &[EventInfo], pick: impl Fn(&EventInfo) -> i64) -> ArrayRef {
    Arc::new(
        TimestampMicrosecondArray::from(events.iter().map(pick).collect::<Vec<_>>())
            .with_timezone(UTC),
    )
}

/// Convert events into one record batch, preserving order.
///
/// # Errors
///
/// Returns an Arrow error if the batch cannot be assembled.
pub fn events_to_record_batch(events: &[EventInfo]) -> Result<RecordBatch> {
    let columns: Vec<ArrayRef> = vec![
        timestamps(events, |e| e.experiment_start_time().timestamp_micros()),
        timestamps(events, |e| e.start_time().timestamp_micros()),
        timestamps(events, |e| e.end_time().timestamp_micros()),
        Arc::new(StringArray::from_iter_values(
            events.iter().map(EventInfo::event_id),
        )),
        Arc::new(StringArray::from_iter_values(
            events.iter().map(|e| e.event_type().as_str()),
        )),
        Arc::new(StringArray::from_iter_values(
            events.iter().map(|e| e.status().as_str()),
        )),
        Arc::new(events.iter().map(EventInfo::payload).collect::<StringArray>()),
    ];
    Ok(RecordBatch::try_new(event_schema(), columns)?)
}
