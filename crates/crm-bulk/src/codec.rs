//! Field-list record codec.
//!
//! The remote store represents a record as an ordered list of
//! `{"val": <label>, "content": <value>}` entries and accepts writes as an
//! XML payload of `<row no="N"><FL val="label"><![CDATA[value]]></FL></row>`
//! elements. Everything here is pure.

use serde::{Deserialize, Deserializer};

use crate::core::Record;

/// One wire field-list entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldEntry {
    /// Field label.
    pub val: String,

    /// Field value; the remote side sometimes omits it or sends a number.
    #[serde(default, deserialize_with = "scalar_string")]
    pub content: Option<String>,
}

impl FieldEntry {
    pub fn new(val: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            val: val.into(),
            content: Some(content.into()),
        }
    }
}

/// Deserialize a JSON scalar (string, number, bool or null) as an optional string.
pub(crate) fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Convert a wire field-list into a record. Repeated labels: last one wins.
pub fn decode<I>(fields: I) -> Record
where
    I: IntoIterator<Item = FieldEntry>,
{
    let mut record = Record::new();
    for entry in fields {
        record.set(entry.val, entry.content);
    }
    record
}

/// Convert a record into a wire field-list, skipping null values.
pub fn to_field_list(record: &Record) -> Vec<FieldEntry> {
    record
        .iter()
        .filter_map(|(label, value)| value.map(|v| FieldEntry::new(label, v)))
        .collect()
}

/// Serialize rows into the `xmlData` write payload for `module`.
///
/// Rows are numbered from 1 in input order; the remote store echoes the
/// number back in per-row results. Null values are omitted.
pub fn encode(module: &str, rows: &[Record]) -> String {
    let mut out = format!("<{}>", module);
    for (idx, row) in rows.iter().enumerate() {
        out.push_str(&format!("<row no=\"{}\">", idx + 1));
        for entry in to_field_list(row) {
            let value = entry.content.as_deref().unwrap_or_default();
            out.push_str(&format!(
                "<FL val=\"{}\">{}</FL>",
                escape_attr(&entry.val),
                cdata(value)
            ));
        }
        out.push_str("</row>");
    }
    out.push_str(&format!("</{}>", module));
    out
}

/// Build an OR-chain search criteria: `((key:v1) OR (key:v2))`.
pub fn or_criteria<S: AsRef<str>>(key: &str, values: &[S]) -> String {
    let terms: Vec<String> = values
        .iter()
        .map(|v| format!("({}:{})", key, v.as_ref()))
        .collect();
    format!("({})", terms.join(" OR "))
}

/// Wrap a value in CDATA; a literal `]]>` is split across two sections.
fn cdata(value: &str) -> String {
    format!("<![CDATA[{}]]>", value.replace("]]>", "]]]]><![CDATA[>"))
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
