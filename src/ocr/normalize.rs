//! Conversion of raw engine output into [`RecognizedLine`] records.
//!
//! The engine returns one entry per detected line, shaped
//! `[box, [text, confidence]]` where `box` is a list of `[x, y]` points.
//! Decoding is total: an entry that does not fit the shape is dropped and
//! the rest of the batch is kept.

use serde_json::Value;

use crate::models::ocr_job::RecognizedLine;

/// Decode one engine entry, or `None` when it is missing required fields.
pub fn decode_entry(entry: &Value, include_boxes: bool) -> Option<RecognizedLine> {
    let parts = entry.as_array()?;
    if parts.len() < 2 {
        return None;
    }

    let text_info = parts[1].as_array()?;
    if text_info.len() < 2 {
        return None;
    }

    let text = coerce_text(&text_info[0])?;
    let confidence = coerce_confidence(&text_info[1])?;

    // Bad geometry only costs the box, not the line.
    let bounding_box = if include_boxes {
        decode_polygon(&parts[0])
    } else {
        None
    };

    Some(RecognizedLine {
        text,
        confidence,
        bounding_box,
    })
}

/// Decode every entry of the raw per-line sequence, preserving order.
///
/// Absent, `null`, or non-array input yields an empty list.
pub fn normalize(raw: Option<&Value>, include_boxes: bool) -> Vec<RecognizedLine> {
    let Some(entries) = raw.and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let line = decode_entry(entry, include_boxes);
            if line.is_none() {
                tracing::debug!(entry = %entry, "skipping malformed OCR entry");
            }
            line
        })
        .collect()
}

/// Arithmetic mean of line confidences, `0.0` for an empty batch.
pub fn average_confidence(lines: &[RecognizedLine]) -> f64 {
    if lines.is_empty() {
        return 0.0;
    }
    lines.iter().map(|line| line.confidence).sum::<f64>() / lines.len() as f64
}

/// Newline-joined text of every line.
pub fn join_text(lines: &[RecognizedLine]) -> String {
    lines
        .iter()
        .map(|line| line.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn coerce_confidence(value: &Value) -> Option<f64> {
    let confidence = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    confidence.is_finite().then_some(confidence)
}

fn decode_polygon(value: &Value) -> Option<Vec<[f64; 2]>> {
    value
        .as_array()?
        .iter()
        .map(|point| match point.as_array()?.as_slice() {
            [x, y, ..] => Some([x.as_f64()?, y.as_f64()?]),
            _ => None,
        })
        .collect()
}
