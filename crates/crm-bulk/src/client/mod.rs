//! Caller-facing operations.
//!
//! [`BulkClient`] binds an auth token and configuration to a transport and
//! exposes one method per operation. Every chunked operation runs in its
//! own [`TransferSession`]; the client holds no per-call state, so a single
//! client may serve concurrent calls.

mod options;

pub use options::{
    FetchOptions, InsertOptions, InsertOutcome, InsertRows, SearchOptions, UpdateOptions,
    UpdatedAfterOptions,
};

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::codec;
use crate::config::Config;
use crate::core::{FormFields, Record, RowResult, Transport, Watermark};
use crate::error::Result;
use crate::response;
use crate::transfer::{TerminationPolicy, TransferSession};
use crate::transport::HttpTransport;

/// Remote API methods, appended to `{base_url}/{module}/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteMethod {
    GetRecordById,
    GetRecords,
    SearchRecords,
    InsertRecords,
    UpdateRecords,
}

impl RemoteMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            RemoteMethod::GetRecordById => "getRecordById",
            RemoteMethod::GetRecords => "getRecords",
            RemoteMethod::SearchRecords => "searchRecords",
            RemoteMethod::InsertRecords => "insertRecords",
            RemoteMethod::UpdateRecords => "updateRecords",
        }
    }
}

/// Bulk-transfer client for one auth token.
pub struct BulkClient {
    config: Config,
    auth_token: String,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for BulkClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulkClient")
            .field("config", &self.config)
            .field("auth_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl BulkClient {
    /// Create a client that talks HTTP with the configured timeout.
    pub fn new(config: Config, auth_token: impl Into<String>) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(config.endpoint.timeout())?;
        Ok(Self {
            config,
            auth_token: auth_token.into(),
            transport: Arc::new(transport),
        })
    }

    /// Create a client over an arbitrary transport.
    pub fn with_transport(
        config: Config,
        auth_token: impl Into<String>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            auth_token: auth_token.into(),
            transport,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetch records by id, `page_sizes.by_id` ids per request.
    pub async fn fetch_by_id(
        &self,
        module: &str,
        ids: &[String],
        opts: &FetchOptions,
    ) -> Result<Vec<Record>> {
        let method = RemoteMethod::GetRecordById;
        let session = self.session(module, method, TerminationPolicy::QueueExhaustion);

        let (records, _) = session
            .drain(
                ids.to_vec(),
                self.config.transfer.page_sizes.by_id,
                |chunk| {
                    let form = self
                        .base_form()
                        .with("idlist", chunk.join(";"))
                        .with_opt("newFormat", opts.new_format)
                        .with("version", "2");
                    async move {
                        let body = self.post(module, method, &form).await?;
                        response::fetch_page(&body, module)
                    }
                },
            )
            .await?;
        Ok(records)
    }

    /// Fetch every record modified after `watermark`, oldest first.
    ///
    /// Pages of `page_sizes.updated_after` are requested until one comes
    /// back short, or until more than `opts.limit` records are held and the
    /// last one's watermark differs from the requested one.
    pub async fn fetch_updated_after(
        &self,
        module: &str,
        watermark: &str,
        opts: &UpdatedAfterOptions,
    ) -> Result<Vec<Record>> {
        let watermark = Watermark::parse(watermark)?;
        let method = RemoteMethod::GetRecords;
        let transfer = &self.config.transfer;
        let page_size = transfer.page_sizes.updated_after;
        // The watermark-group guard reads the watermark from the last record.
        let select_columns = opts
            .select_columns
            .as_ref()
            .map(|cols| column_list(module, cols, &transfer.watermark_field));

        let policy = TerminationPolicy::ShortPage {
            page_size,
            limit: opts.limit,
            watermark_field: transfer.watermark_field.clone(),
            requested_watermark: watermark.as_str().to_string(),
        };
        let session = self.session(module, method, policy);

        let (records, _) = session
            .scan(page_size, |window| {
                let form = self
                    .base_form()
                    .with_opt("selectColumns", select_columns.as_deref())
                    .with("fromIndex", window.from_index.to_string())
                    .with("toIndex", window.to_index.to_string())
                    .with("lastModifiedTime", watermark.as_str())
                    .with("sortColumnString", transfer.watermark_field.as_str())
                    .with("sortOrderString", "asc")
                    .with_opt("newFormat", opts.new_format)
                    .with("version", "2");
                async move {
                    let body = self.post(module, method, &form).await?;
                    response::fetch_page(&body, module)
                }
            })
            .await?;
        Ok(records)
    }

    /// Fetch records whose `key` equals any of `values`.
    ///
    /// Values are searched `page_sizes.value_match` at a time as an OR-chain.
    /// An empty value list returns no records without contacting the remote
    /// store, which would otherwise answer an empty criteria with unrelated
    /// records.
    pub async fn fetch_by_value_in(
        &self,
        module: &str,
        key: &str,
        values: &[String],
        opts: &SearchOptions,
    ) -> Result<Vec<Record>> {
        let watermark = parse_optional_watermark(opts.watermark.as_deref())?;
        let method = RemoteMethod::SearchRecords;
        let window = self.config.transfer.page_sizes.criteria_window;
        let session = self.session(module, method, TerminationPolicy::QueueExhaustion);

        let (records, _) = session
            .drain(
                values.to_vec(),
                self.config.transfer.page_sizes.value_match,
                |chunk| {
                    let form = self.search_form(
                        codec::or_criteria(key, chunk.as_slice()),
                        watermark.as_ref(),
                        opts.new_format,
                        1,
                        window,
                    );
                    async move {
                        let body = self.post(module, method, &form).await?;
                        response::fetch_page(&body, module)
                    }
                },
            )
            .await?;
        Ok(records)
    }

    /// Fetch the first `page_sizes.criteria_window` records matching `criteria`.
    pub async fn fetch_by_criteria(
        &self,
        module: &str,
        criteria: &str,
        opts: &SearchOptions,
    ) -> Result<Vec<Record>> {
        let watermark = parse_optional_watermark(opts.watermark.as_deref())?;
        let method = RemoteMethod::SearchRecords;
        let session = self.session(module, method, TerminationPolicy::SinglePage);

        let (records, _) = session
            .scan(self.config.transfer.page_sizes.criteria_window, |window| {
                let form = self.search_form(
                    criteria.to_string(),
                    watermark.as_ref(),
                    opts.new_format,
                    window.from_index,
                    window.to_index,
                );
                async move {
                    let body = self.post(module, method, &form).await?;
                    response::fetch_page(&body, module)
                }
            })
            .await?;
        Ok(records)
    }

    /// Insert one record or a batch, mirroring the input shape in the result.
    pub async fn insert(
        &self,
        module: &str,
        rows: impl Into<InsertRows>,
        opts: &InsertOptions,
    ) -> Result<InsertOutcome> {
        match rows.into() {
            InsertRows::One(row) => self
                .insert_one(module, &row, opts)
                .await
                .map(InsertOutcome::Single),
            InsertRows::Many(rows) => self
                .insert_bulk(module, rows, opts)
                .await
                .map(InsertOutcome::Bulk),
        }
    }

    /// Insert a single record in one request, without retry.
    pub async fn insert_one(
        &self,
        module: &str,
        row: &Record,
        opts: &InsertOptions,
    ) -> Result<Record> {
        let form = self
            .base_form()
            .with("xmlData", codec::encode(module, std::slice::from_ref(row)))
            .with_opt("wfTrigger", opts.wf_trigger)
            .with_opt("duplicateCheck", opts.duplicate_check)
            .with_opt("isApproval", opts.is_approval)
            .with_opt("newFormat", opts.new_format)
            .with_opt("larid", opts.larid.as_deref())
            .with("version", "2");

        let body = self.post(module, RemoteMethod::InsertRecords, &form).await?;
        let record = response::record_detail(&body)?;
        debug!("{}: inserted record {:?}", module, record.get("Id"));
        Ok(record)
    }

    /// Insert rows `page_sizes.write` at a time.
    ///
    /// Returns one result per input row, in input order. Rows the remote
    /// store rejects are reported as failed results; they do not fail the
    /// session.
    pub async fn insert_bulk(
        &self,
        module: &str,
        rows: Vec<Record>,
        opts: &InsertOptions,
    ) -> Result<Vec<RowResult>> {
        let method = RemoteMethod::InsertRecords;
        let session = self.session(module, method, TerminationPolicy::QueueExhaustion);

        let (results, _) = session
            .drain(rows, self.config.transfer.page_sizes.write, |chunk| {
                let form = self
                    .base_form()
                    .with("xmlData", codec::encode(module, &chunk))
                    .with_opt("duplicateCheck", opts.duplicate_check)
                    .with_opt("isApproval", opts.is_approval)
                    .with_opt("newFormat", opts.new_format)
                    .with("version", "4");
                let submitted = chunk.len();
                async move {
                    let body = self.post(module, method, &form).await?;
                    response::row_results(&body, submitted)
                }
            })
            .await?;
        Ok(results)
    }

    /// Update a single record in one request, without retry.
    pub async fn update(
        &self,
        module: &str,
        id: &str,
        row: &Record,
        opts: &UpdateOptions,
    ) -> Result<Record> {
        let form = self
            .base_form()
            .with("id", id)
            .with("xmlData", codec::encode(module, std::slice::from_ref(row)))
            .with_opt("wfTrigger", opts.wf_trigger)
            .with_opt("newFormat", opts.new_format)
            .with_opt("larid", opts.larid.as_deref())
            .with("version", "2");

        let body = self.post(module, RemoteMethod::UpdateRecords, &form).await?;
        let record = response::record_detail(&body)?;
        debug!("{}: updated record {}", module, id);
        Ok(record)
    }

    /// Update rows `page_sizes.write` at a time; each row must carry its `Id`.
    ///
    /// Returns the ids the remote store reports as updated.
    pub async fn update_bulk(
        &self,
        module: &str,
        rows: Vec<Record>,
        opts: &UpdateOptions,
    ) -> Result<Vec<String>> {
        let method = RemoteMethod::UpdateRecords;
        let session = self.session(module, method, TerminationPolicy::QueueExhaustion);

        let (ids, _) = session
            .drain(rows, self.config.transfer.page_sizes.write, |chunk| {
                let form = self
                    .base_form()
                    .with("xmlData", codec::encode(module, &chunk))
                    .with_opt("wfTrigger", opts.wf_trigger)
                    .with_opt("newFormat", opts.new_format)
                    .with("version", "4");
                async move {
                    let body = self.post(module, method, &form).await?;
                    response::succeeded_ids(&body)
                }
            })
            .await?;
        Ok(ids)
    }

    fn session(
        &self,
        module: &str,
        method: RemoteMethod,
        policy: TerminationPolicy,
    ) -> TransferSession {
        TransferSession::new(
            format!("{}/{}", module, method.as_str()),
            self.config.transfer.max_consecutive_errors,
            policy,
        )
    }

    fn base_form(&self) -> FormFields {
        FormFields::new()
            .with("authtoken", self.auth_token.as_str())
            .with("scope", self.config.endpoint.scope.as_str())
    }

    fn search_form(
        &self,
        criteria: String,
        watermark: Option<&Watermark>,
        new_format: Option<u8>,
        from_index: usize,
        to_index: usize,
    ) -> FormFields {
        self.base_form()
            .with("criteria", criteria)
            .with_opt("lastModifiedTime", watermark)
            .with_opt("newFormat", new_format)
            .with("fromIndex", from_index.to_string())
            .with("toIndex", to_index.to_string())
    }

    async fn post(&self, module: &str, method: RemoteMethod, form: &FormFields) -> Result<String> {
        let url = self.config.endpoint.url(module, method.as_str());
        let response = self.transport.post_form(&url, form).await?;
        Ok(response.body)
    }
}

/// `Module(a,b,...)`, with `watermark_field` appended when missing.
fn column_list(module: &str, columns: &[String], watermark_field: &str) -> String {
    let mut columns = columns.to_vec();
    if !columns.iter().any(|c| c == watermark_field) {
        columns.push(watermark_field.to_string());
    }
    format!("{}({})", module, columns.join(","))
}

fn parse_optional_watermark(value: Option<&str>) -> Result<Option<Watermark>> {
    value.map(Watermark::parse).transpose()
}
