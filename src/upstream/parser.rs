//! Extraction of samples from the backend's response envelope
//!
//! Shape: `{ "data": { "result": [ { "metric": {...}, "value": [ts, "v"] } ] } }`.
//! Absent or malformed levels yield no samples; they are never an error here.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::trace;

use crate::{Sample, SampleTimestamp};

use super::client::RawResponse;

pub struct ResponseParser;

impl ResponseParser {
    /// Samples in upstream order. Rows without a `[timestamp, value]` pair are skipped.
    pub fn parse(response: &RawResponse) -> Vec<Sample> {
        Self::result_rows(response)
            .iter()
            .filter_map(|row| {
                let sample = parse_row(row);
                if sample.is_none() {
                    trace!("skipping result row without a [timestamp, value] pair");
                }
                sample
            })
            .collect()
    }

    /// Number of rows in `data.result`, well-formed or not
    pub fn row_count(response: &RawResponse) -> usize {
        Self::result_rows(response).len()
    }

    /// The `data` list of a label-values response, or `None` if `data` is not a list
    pub fn label_values(response: &RawResponse) -> Option<Vec<String>> {
        let values = response.get("data")?.as_array()?;
        Some(values.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
    }

    fn result_rows(response: &RawResponse) -> &[Value] {
        response
            .get("data")
            .and_then(|data| data.get("result"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

fn parse_row(row: &Value) -> Option<Sample> {
    // trailing elements past the pair are ignored
    let [timestamp, value, ..] = row.get("value")?.as_array()?.as_slice() else {
        return None;
    };

    let timestamp = match timestamp {
        Value::Number(n) => SampleTimestamp::Number(n.clone()),
        Value::String(s) => SampleTimestamp::Text(s.clone()),
        _ => return None,
    };

    let value = match value {
        Value::String(s) => s.clone(),
        Value::Null => return None,
        other => other.to_string(),
    };

    let labels = row
        .get("metric")
        .and_then(Value::as_object)
        .map(|labels| {
            labels
                .iter()
                .map(|(name, value)| (name.clone(), label_text(value)))
                .collect()
        })
        .unwrap_or_else(BTreeMap::new);

    Some(Sample {
        labels,
        timestamp,
        value,
    })
}

fn label_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
