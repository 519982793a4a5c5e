//! In-memory record types produced and consumed by transfer sessions.
//!
//! A [`Record`] is an ordered label/value mapping. Labels are unique;
//! assigning an existing label overwrites its value in place, so the
//! label keeps the position of its first occurrence.

use std::fmt;

use chrono::NaiveDateTime;
use serde::de::{MapAccess, Visitor};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{BulkError, Result};

/// An ordered mapping from field label to an optional string value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, Option<String>)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a label to a value (or to null). Last write wins.
    pub fn set(&mut self, label: impl Into<String>, value: Option<String>) {
        let label = label.into();
        match self.fields.iter_mut().find(|(l, _)| *l == label) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((label, value)),
        }
    }

    /// Set a label to a string value.
    pub fn insert(&mut self, label: impl Into<String>, value: impl Into<String>) {
        self.set(label, Some(value.into()));
    }

    /// Builder form of [`Record::insert`].
    pub fn with(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(label, value);
        self
    }

    /// Value for a label; `None` when the label is absent or null.
    pub fn get(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(l, _)| l == label)
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn contains_label(&self, label: &str) -> bool {
        self.fields.iter().any(|(l, _)| l == label)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate fields in label order of first occurrence.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.fields.iter().map(|(l, v)| (l.as_str(), v.as_deref()))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(l, _)| l.as_str())
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (label, value) in iter {
            record.insert(label, value);
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (label, value) in &self.fields {
            map.serialize_entry(label, value)?;
        }
        map.end()
    }
}

/// Scalar input accepted for a field value when reading records from JSON.
#[derive(Deserialize)]
#[serde(untagged)]
enum ScalarInput {
    Text(String),
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl From<ScalarInput> for String {
    fn from(value: ScalarInput) -> Self {
        match value {
            ScalarInput::Text(s) => s,
            ScalarInput::Bool(b) => b.to_string(),
            ScalarInput::Int(i) => i.to_string(),
            ScalarInput::UInt(u) => u.to_string(),
            ScalarInput::Float(f) => f.to_string(),
        }
    }
}

struct RecordVisitor;

impl<'de> Visitor<'de> for RecordVisitor {
    type Value = Record;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object of field labels to scalar values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Record, A::Error> {
        let mut record = Record::new();
        while let Some((label, value)) = access.next_entry::<String, Option<ScalarInput>>()? {
            record.set(label, value.map(String::from));
        }
        Ok(record)
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(RecordVisitor)
    }
}

/// Outcome of one row of a bulk write, correlated by the echoed sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowResult {
    Succeeded {
        data: Record,
        code: Option<String>,
    },
    Failed {
        message: Option<String>,
        code: Option<String>,
    },
}

impl RowResult {
    pub fn is_success(&self) -> bool {
        matches!(self, RowResult::Succeeded { .. })
    }

    pub fn data(&self) -> Option<&Record> {
        match self {
            RowResult::Succeeded { data, .. } => Some(data),
            RowResult::Failed { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            RowResult::Succeeded { .. } => None,
            RowResult::Failed { message, .. } => message.as_deref(),
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            RowResult::Succeeded { code, .. } | RowResult::Failed { code, .. } => code.as_deref(),
        }
    }
}

impl Serialize for RowResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("RowResult", 3)?;
        state.serialize_field("data", &self.data())?;
        state.serialize_field("message", &self.message())?;
        state.serialize_field("code", &self.code())?;
        state.end()
    }
}

/// Watermark format accepted by the remote store.
pub const WATERMARK_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A validated modification-time cursor (`YYYY-MM-DD HH:MM:SS`).
///
/// Comparison against record fields is textual; the parse only guards
/// against sending a value the remote store would misinterpret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watermark(String);

impl Watermark {
    pub fn parse(value: &str) -> Result<Self> {
        NaiveDateTime::parse_from_str(value, WATERMARK_FORMAT).map_err(|e| {
            BulkError::InvalidArgument(format!(
                "watermark '{}' is not in YYYY-MM-DD HH:MM:SS form: {}",
                value, e
            ))
        })?;
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_overwrites_in_place() {
        let mut record = Record::new();
        record.insert("Id", "1");
        record.insert("Name", "a");
        record.insert("Id", "2");

        assert_eq!(record.len(), 2);
        assert_eq!(record.get("Id"), Some("2"));
        assert_eq!(record.labels().collect::<Vec<_>>(), vec!["Id", "Name"]);
    }

    #[test]
    fn test_null_value_is_present_but_unset() {
        let mut record = Record::new();
        record.set("Phone", None);
        assert!(record.contains_label("Phone"));
        assert_eq!(record.get("Phone"), None);
    }

    #[test]
    fn test_serialize_preserves_field_order() {
        let record: Record = [("Zeta", "1"), ("Alpha", "2")].into_iter().collect();
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"Zeta":"1","Alpha":"2"}"#);
    }

    #[test]
    fn test_deserialize_scalars_in_document_order() {
        let record: Record =
            serde_json::from_str(r#"{"Name":"A","Amount":12,"Active":true,"Note":null}"#).unwrap();
        assert_eq!(
            record.labels().collect::<Vec<_>>(),
            vec!["Name", "Amount", "Active", "Note"]
        );
        assert_eq!(record.get("Amount"), Some("12"));
        assert_eq!(record.get("Active"), Some("true"));
        assert_eq!(record.get("Note"), None);
    }

    #[test]
    fn test_deserialize_large_unsigned_keeps_digits() {
        let record: Record =
            serde_json::from_str(r#"{"Id":12345678901234567890,"Delta":-3,"Rate":1.5}"#).unwrap();
        assert_eq!(record.get("Id"), Some("12345678901234567890"));
        assert_eq!(record.get("Delta"), Some("-3"));
        assert_eq!(record.get("Rate"), Some("1.5"));
    }

    #[test]
    fn test_row_result_serializes_flat() {
        let failed = RowResult::Failed {
            message: Some("Duplicate record".into()),
            code: Some("4819".into()),
        };
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            serde_json::json!({"data": null, "message": "Duplicate record", "code": "4819"})
        );

        let ok = RowResult::Succeeded {
            data: Record::new().with("Id", "9"),
            code: Some("2000".into()),
        };
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            serde_json::json!({"data": {"Id": "9"}, "message": null, "code": "2000"})
        );
    }

    #[test]
    fn test_watermark_parse() {
        assert!(Watermark::parse("2016-10-03 14:23:21").is_ok());
        assert!(matches!(
            Watermark::parse("2016-10-03T14:23:21Z"),
            Err(BulkError::InvalidArgument(_))
        ));
        assert!(Watermark::parse("yesterday").is_err());
    }
}
