// lib/split-text/src/lib.rs
//! split-text - turn a line of text into a record using a regex
//!
//! Each capture group becomes a named field; the field names are given as a
//! comma separated list, in group order. Shares no state with anything else.

mod error;

use std::collections::BTreeMap;

use regex::Regex;
use serde::Serialize;

pub use error::SplitTextError;

/// Structured record produced from one matching input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub record_type: String,
    pub fields: BTreeMap<String, String>,
}

impl Record {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct SplitText {
    pattern: String,
    regex: Regex,
    fields: Vec<String>,
    record_type: String,
}

impl SplitText {
    /// `pattern` must match the whole input; `fields` is e.g. `"date, level, message"`
    pub fn new(pattern: &str, fields: &str, record_type: &str) -> Result<Self, SplitTextError> {
        let fields: Vec<String> = fields
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect();
        if fields.is_empty() {
            return Err(SplitTextError::EmptyFields);
        }

        let record_type = record_type.trim();
        if record_type.is_empty() {
            return Err(SplitTextError::EmptyRecordType);
        }

        let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| {
            SplitTextError::InvalidRegex {
                pattern: pattern.to_string(),
                error: e.to_string(),
            }
        })?;

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
            fields,
            record_type: record_type.to_string(),
        })
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    /// Number of capture groups in the pattern
    pub fn group_count(&self) -> usize {
        self.regex.captures_len() - 1
    }

    /// At most one record: the whole of `text` either matches or it doesn't.
    ///
    /// Groups that did not take part in the match leave their field unset.
    pub fn parse(&self, text: &str) -> Vec<Record> {
        let captures = match self.regex.captures(text) {
            Some(c) => c,
            None => {
                tracing::warn!(pattern = %self.pattern, "No match");
                return vec![];
            }
        };

        let group_count = self.group_count();
        if group_count != self.fields.len() {
            tracing::warn!(
                pattern = %self.pattern,
                groups = group_count,
                fields = self.fields.len(),
                "Capture group count does not match field count"
            );
        }

        let fields = self
            .fields
            .iter()
            .take(group_count)
            .enumerate()
            .filter_map(|(i, name)| {
                captures
                    .get(i + 1)
                    .map(|m| (name.clone(), m.as_str().to_string()))
            })
            .collect();

        vec![Record {
            record_type: self.record_type.clone(),
            fields,
        }]
    }
}
