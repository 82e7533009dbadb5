//! Joins the JSON fragments `yt-dlp` prints into whole records.
//!
//! With `--print '...#j'` every video becomes one pretty-printed JSON object,
//! spread over several lines and printed back to back with nothing in between.
//! Instead of splicing commas after closing braces (which breaks as soon as a
//! title contains `}`), the buffer is fed to serde_json's stream deserializer,
//! which reads consecutive values without needing separators.

use serde_json::{Deserializer, Value};

use crate::error::{ImportError, ImportResult};
use crate::record::RawVideoRecord;

#[derive(Debug, Default)]
pub struct FragmentAssembler {
    buffer: String,
    lines: usize,
}

impl FragmentAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one data line in arrival order.
    pub fn push_line(&mut self, line: &str) {
        self.buffer.push_str(line);
        self.buffer.push('\n');
        self.lines += 1;
    }

    pub fn line_count(&self) -> usize {
        self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.trim().is_empty()
    }

    /// Parses everything collected so far. Zero objects is an empty list, not
    /// an error; truncated or malformed JSON fails the whole buffer. Field
    /// types are not checked here, see [`RawVideoRecord`].
    pub fn finish(self) -> ImportResult<Vec<RawVideoRecord>> {
        split_objects(&self.buffer)?
            .into_iter()
            .map(|value| serde_json::from_value(value).map_err(ImportError::MalformedOutput))
            .collect()
    }
}

/// Splits back-to-back JSON objects into a list, keeping their order.
pub fn split_objects(buffer: &str) -> ImportResult<Vec<Value>> {
    let mut objects = Vec::new();
    for (index, value) in Deserializer::from_str(buffer).into_iter::<Value>().enumerate() {
        let value = value.map_err(ImportError::MalformedOutput)?;
        if !value.is_object() {
            return Err(ImportError::UnexpectedValue {
                position: index + 1,
            });
        }
        objects.push(value);
    }
    Ok(objects)
}
