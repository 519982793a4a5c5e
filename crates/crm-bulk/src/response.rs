//! Response normalization.
//!
//! Every response body passes through here before any record is decoded.
//! Two remote quirks are absorbed in one place:
//!
//! - **Singleton collapse**: a collection holding exactly one item arrives
//!   as a bare object instead of a one-element array ([`OneOrMany`]).
//! - **No-data sentinel**: a search with zero matches is reported as
//!   `response.nodata` with code [`NO_DATA_CODE`]; it becomes an empty page.
//!
//! Any other `error`/`nodata` payload becomes [`BulkError::RemoteRejected`];
//! a body that is not JSON or lacks the expected structure becomes
//! [`BulkError::MalformedResponse`].

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::codec::{self, scalar_string, FieldEntry};
use crate::core::{Record, RowResult};
use crate::error::{BulkError, Result};

/// Remote code meaning "the search matched nothing".
pub const NO_DATA_CODE: &str = "4422";

/// A collection the remote store may collapse to a single bare item.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    response: ResponseBody,
}

#[derive(Debug, Deserialize)]
struct ResponseBody {
    #[serde(default)]
    result: Option<Map<String, Value>>,
    #[serde(default)]
    error: Option<RemoteStatus>,
    #[serde(default)]
    nodata: Option<RemoteStatus>,
}

#[derive(Debug, Deserialize)]
struct RemoteStatus {
    #[serde(default, deserialize_with = "scalar_string")]
    code: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    message: Option<String>,
}

impl RemoteStatus {
    fn into_error(self) -> BulkError {
        BulkError::rejected(
            self.code.unwrap_or_default(),
            self.message.unwrap_or_default(),
        )
    }
}

#[derive(Debug, Deserialize)]
struct ModuleRows {
    #[serde(default)]
    row: OneOrMany<WireRow>,
}

#[derive(Debug, Deserialize)]
struct WireRow {
    #[serde(rename = "FL", default)]
    fields: OneOrMany<FieldEntry>,
}

#[derive(Debug, Deserialize)]
struct FieldList {
    #[serde(rename = "FL", default)]
    fields: OneOrMany<FieldEntry>,
}

/// Per-row acknowledgement of a bulk write.
#[derive(Debug, Clone, Deserialize)]
pub struct RowAck {
    #[serde(default, deserialize_with = "scalar_string")]
    no: Option<String>,
    #[serde(default)]
    success: Option<AckSuccess>,
    #[serde(default)]
    error: Option<AckError>,
}

#[derive(Debug, Clone, Deserialize)]
struct AckSuccess {
    #[serde(default, deserialize_with = "scalar_string")]
    code: Option<String>,
    #[serde(default)]
    details: Option<AckDetails>,
}

#[derive(Debug, Clone, Deserialize)]
struct AckDetails {
    #[serde(rename = "FL", default)]
    fields: OneOrMany<FieldEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct AckError {
    #[serde(default, deserialize_with = "scalar_string")]
    code: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    details: Option<String>,
}

impl RowAck {
    /// Echoed 1-based sequence number of the submitted row.
    pub fn sequence(&self) -> Option<u32> {
        self.no.as_deref().and_then(|n| n.trim().parse().ok())
    }

    fn success_record(&self) -> Option<Record> {
        self.success.as_ref().map(|s| {
            codec::decode(
                s.details
                    .as_ref()
                    .map(|d| d.fields.clone().into_vec())
                    .unwrap_or_default(),
            )
        })
    }
}

impl From<RowAck> for RowResult {
    fn from(ack: RowAck) -> Self {
        if let Some(data) = ack.success_record() {
            let code = ack.success.and_then(|s| s.code);
            return RowResult::Succeeded { data, code };
        }
        match ack.error {
            Some(err) => RowResult::Failed {
                message: err.details,
                code: err.code,
            },
            None => RowResult::Failed {
                message: None,
                code: None,
            },
        }
    }
}

fn parse(body: &str) -> Result<ResponseBody> {
    let envelope: Envelope = serde_json::from_str(body).map_err(|e| {
        BulkError::MalformedResponse(format!("{}: {}", e, truncate(body)))
    })?;
    Ok(envelope.response)
}

/// Fail on a whole-request `error` payload.
fn reject_errors(body: &mut ResponseBody) -> Result<()> {
    match body.error.take() {
        Some(status) => Err(status.into_error()),
        None => Ok(()),
    }
}

/// Decode one page of a fetch/search response for `module`.
///
/// Returns an empty page for the no-data sentinel.
pub fn fetch_page(body: &str, module: &str) -> Result<Vec<Record>> {
    let mut response = parse(body)?;
    reject_errors(&mut response)?;

    if let Some(nodata) = response.nodata.take() {
        if nodata.code.as_deref() == Some(NO_DATA_CODE) {
            return Ok(Vec::new());
        }
        return Err(nodata.into_error());
    }

    let rows = response
        .result
        .and_then(|mut result| result.remove(module))
        .ok_or_else(|| {
            BulkError::MalformedResponse(format!(
                "no result for module {}: {}",
                module,
                truncate(body)
            ))
        })?;
    let rows: ModuleRows = serde_json::from_value(rows)
        .map_err(|e| BulkError::MalformedResponse(format!("rows for {}: {}", module, e)))?;

    Ok(rows
        .row
        .into_vec()
        .into_iter()
        .map(|row| codec::decode(row.fields.into_vec()))
        .collect())
}

/// Decode the per-row acknowledgements of a bulk write, in wire order.
pub fn row_acks(body: &str) -> Result<Vec<RowAck>> {
    let mut response = parse(body)?;
    reject_errors(&mut response)?;

    let rows = response
        .result
        .and_then(|mut result| result.remove("row"))
        .filter(|rows| !rows.is_null())
        .ok_or_else(|| {
            BulkError::MalformedResponse(
                "expected rows describing success/failure for each record".to_string(),
            )
        })?;
    let rows: OneOrMany<RowAck> = serde_json::from_value(rows)
        .map_err(|e| BulkError::MalformedResponse(format!("row acknowledgements: {}", e)))?;
    Ok(rows.into_vec())
}

/// Decode a bulk write response for `submitted` rows into per-row results
/// in submission order.
///
/// The remote store may acknowledge rows in any order; results are sorted
/// by the echoed sequence number. The sequence numbers must be exactly
/// `1..=submitted`, each acknowledged once.
pub fn row_results(body: &str, submitted: usize) -> Result<Vec<RowResult>> {
    let acks = row_acks(body)?;
    if acks.len() != submitted {
        return Err(BulkError::MalformedResponse(format!(
            "{} row acknowledgements for {} submitted rows",
            acks.len(),
            submitted
        )));
    }

    let mut slots: Vec<Option<RowAck>> = vec![None; submitted];
    for ack in acks {
        let slot = ack
            .sequence()
            .and_then(|n| (n as usize).checked_sub(1))
            .and_then(|idx| slots.get_mut(idx))
            .ok_or_else(|| {
                BulkError::MalformedResponse(format!(
                    "row acknowledgement with sequence {:?} outside 1..={}",
                    ack.no, submitted
                ))
            })?;
        if slot.is_some() {
            return Err(BulkError::MalformedResponse(format!(
                "row {:?} acknowledged twice",
                ack.no
            )));
        }
        *slot = Some(ack);
    }

    // Counts match and no slot was filled twice, so every slot is filled.
    Ok(slots
        .into_iter()
        .flatten()
        .map(RowResult::from)
        .collect())
}

/// Ids of rows a bulk update reports as succeeded, in wire order.
pub fn succeeded_ids(body: &str) -> Result<Vec<String>> {
    Ok(row_acks(body)?
        .iter()
        .filter_map(|ack| ack.success_record())
        .filter_map(|record| record.get("Id").map(str::to_string))
        .collect())
}

/// Decode the single-record detail returned by a one-row insert or update.
pub fn record_detail(body: &str) -> Result<Record> {
    let mut response = parse(body)?;
    reject_errors(&mut response)?;

    let detail = response
        .result
        .and_then(|mut result| result.remove("recorddetail"))
        .ok_or_else(|| {
            BulkError::MalformedResponse(format!("no record detail: {}", truncate(body)))
        })?;
    let detail: FieldList = serde_json::from_value(detail)
        .map_err(|e| BulkError::MalformedResponse(format!("record detail: {}", e)))?;
    Ok(codec::decode(detail.fields.into_vec()))
}

/// Keep error messages bounded when a whole body is echoed back.
fn truncate(body: &str) -> String {
    const MAX: usize = 512;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fl(pairs: &[(&str, &str)]) -> Value {
        Value::Array(
            pairs
                .iter()
                .map(|(val, content)| json!({"val": val, "content": content}))
                .collect(),
        )
    }

    #[test]
    fn test_fetch_page_array() {
        let body = json!({"response": {"result": {"Leads": {"row": [
            {"no": "1", "FL": fl(&[("LEADID", "1"), ("Company", "A")])},
            {"no": "2", "FL": fl(&[("LEADID", "2"), ("Company", "B")])},
        ]}}, "uri": "/crm/private/json/Leads/getRecords"}});
        let page = fetch_page(&body.to_string(), "Leads").unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[1].get("Company"), Some("B"));
    }

    #[test]
    fn test_fetch_page_singleton_collapse() {
        let wrapped = json!({"response": {"result": {"Leads": {"row": [
            {"no": "1", "FL": fl(&[("LEADID", "1")])}
        ]}}}});
        let bare = json!({"response": {"result": {"Leads": {"row":
            {"no": "1", "FL": fl(&[("LEADID", "1")])}
        }}}});
        let a = fetch_page(&wrapped.to_string(), "Leads").unwrap();
        let b = fetch_page(&bare.to_string(), "Leads").unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a, b);
    }

    #[test]
    fn test_fetch_page_single_field_collapse() {
        let body = json!({"response": {"result": {"Leads": {"row":
            {"no": "1", "FL": {"val": "LEADID", "content": "7"}}
        }}}});
        let page = fetch_page(&body.to_string(), "Leads").unwrap();
        assert_eq!(page[0].get("LEADID"), Some("7"));
    }

    #[test]
    fn test_no_data_sentinel_is_empty_page() {
        let body = json!({"response": {"nodata": {"code": "4422", "message": "There is no data to show"}}});
        assert!(fetch_page(&body.to_string(), "Leads").unwrap().is_empty());

        let numeric = json!({"response": {"nodata": {"code": 4422, "message": "none"}}});
        assert!(fetch_page(&numeric.to_string(), "Leads").unwrap().is_empty());
    }

    #[test]
    fn test_other_codes_are_rejections() {
        let body = json!({"response": {"error": {"code": "4834", "message": "Invalid Ticket Id"}}});
        match fetch_page(&body.to_string(), "Leads") {
            Err(BulkError::RemoteRejected { code, message }) => {
                assert_eq!(code, "4834");
                assert_eq!(message, "Invalid Ticket Id");
            }
            other => panic!("expected rejection, got {:?}", other),
        }

        let body = json!({"response": {"nodata": {"code": "4500", "message": "odd"}}});
        assert!(matches!(
            fetch_page(&body.to_string(), "Leads"),
            Err(BulkError::RemoteRejected { .. })
        ));
    }

    #[test]
    fn test_malformed_bodies() {
        assert!(matches!(
            fetch_page("<html>502</html>", "Leads"),
            Err(BulkError::MalformedResponse(_))
        ));
        let other_module = json!({"response": {"result": {"Contacts": {"row": []}}}});
        assert!(matches!(
            fetch_page(&other_module.to_string(), "Leads"),
            Err(BulkError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_row_results_sorted_by_sequence() {
        let body = json!({"response": {"result": {"row": [
            {"no": "2", "success": {"code": "2000", "details": {"FL": fl(&[("Id", "22")])}}},
            {"error": {"details": "Duplicate record(s) with same Order ID already exists.", "code": "4819"}, "no": "1"},
            {"no": "3"},
        ]}}});
        let results = row_results(&body.to_string(), 3).unwrap();
        assert_eq!(
            results,
            vec![
                RowResult::Failed {
                    message: Some("Duplicate record(s) with same Order ID already exists.".into()),
                    code: Some("4819".into()),
                },
                RowResult::Succeeded {
                    data: Record::new().with("Id", "22"),
                    code: Some("2000".into()),
                },
                RowResult::Failed { message: None, code: None },
            ]
        );
    }

    #[test]
    fn test_row_acks_missing_rows() {
        let body = json!({"response": {"result": {"row": null}}});
        assert!(matches!(
            row_results(&body.to_string(), 1),
            Err(BulkError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_row_results_missing_ack() {
        let body = json!({"response": {"result": {"row": [
            {"no": "2", "success": {"code": "2000", "details": {"FL": fl(&[("Id", "22")])}}},
        ]}}});
        assert!(matches!(
            row_results(&body.to_string(), 2),
            Err(BulkError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_row_results_duplicate_or_out_of_range_sequence() {
        let duplicate = json!({"response": {"result": {"row": [
            {"no": "1", "success": {"code": "2000", "details": {"FL": fl(&[("Id", "11")])}}},
            {"no": "1", "error": {"code": "4819", "details": "dup"}},
        ]}}});
        assert!(matches!(
            row_results(&duplicate.to_string(), 2),
            Err(BulkError::MalformedResponse(_))
        ));

        let out_of_range = json!({"response": {"result": {"row": [
            {"no": "7", "success": {"code": "2000", "details": {"FL": fl(&[("Id", "77")])}}},
            {"no": "7", "error": {"code": "4819", "details": "dup"}},
        ]}}});
        assert!(matches!(
            row_results(&out_of_range.to_string(), 2),
            Err(BulkError::MalformedResponse(_))
        ));

        let zero = json!({"response": {"result": {"row": {"no": "0"}}}});
        assert!(matches!(
            row_results(&zero.to_string(), 1),
            Err(BulkError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_succeeded_ids_single_row() {
        let body = json!({"response": {"result": {"row": [
            {"no": "2", "success": {"code": "2001", "details": {"FL": fl(&[
                ("Id", "157565600001112312"),
                ("Modified Time", "2016-09-05 17:57:29"),
            ])}}}
        ]}, "uri": "/crm/private/json/CustomModule1/updateRecords"}});
        assert_eq!(succeeded_ids(&body.to_string()).unwrap(), vec!["157565600001112312"]);
    }

    #[test]
    fn test_succeeded_ids_keep_wire_order_and_skip_errors() {
        let body = json!({"response": {"result": {"row": [
            {"no": "2", "success": {"code": "2001", "details": {"FL": fl(&[("Id", "157565600001112312")])}}},
            {"no": "3", "error": {"code": "4600", "details": "Unable to process"}},
            {"no": "1", "success": {"code": "2001", "details": {"FL": fl(&[("Id", "1575656000011312312")])}}},
        ]}}});
        assert_eq!(
            succeeded_ids(&body.to_string()).unwrap(),
            vec!["157565600001112312", "1575656000011312312"]
        );
    }

    #[test]
    fn test_succeeded_ids_singleton_collapse() {
        let body = json!({"response": {"result": {"row":
            {"no": "1", "success": {"code": "2001", "details": {"FL": fl(&[("Id", "5")])}}}
        }}});
        assert_eq!(succeeded_ids(&body.to_string()).unwrap(), vec!["5"]);
    }

    #[test]
    fn test_record_detail() {
        let body = json!({"response": {"result": {
            "message": "Record(s) added successfully",
            "recorddetail": {"FL": fl(&[("Id", "1575656000011388647"), ("Created By", "Robot")])}
        }, "uri": "/crm/private/json/CustomModule1/insertRecords"}});
        let record = record_detail(&body.to_string()).unwrap();
        assert_eq!(record.get("Id"), Some("1575656000011388647"));

        let rejected = json!({"response": {"error": {"code": "4401", "message": "Unable to populate data"}}});
        assert!(matches!(
            record_detail(&rejected.to_string()),
            Err(BulkError::RemoteRejected { .. })
        ));
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        let body = "é".repeat(400);
        let out = truncate(&body);
        assert!(out.ends_with("..."));
        assert!(out.len() <= 515);
    }
}
