//! Writes accepted violation reports to a sink.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use csp_config::{ClientIpLogging, Config};
use csp_log::field;
use csp_schema::{StatusCode, ViolationRecord};
use serde::Serialize;

use crate::extractors::{self, RequestContext};

/// Metadata attached to a report through the query string of the report URI.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Metadata {
    /// The first value of the `metadata` query parameter.
    Value(String),
    /// The first value of every query parameter.
    Object(BTreeMap<String, String>),
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.write_str(value),
            Self::Object(map) => {
                let json = serde_json::to_string(map).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

/// A single violation together with the request-level fields it is logged with.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReportEntry {
    /// The normalized violation.
    #[serde(flatten)]
    pub record: ViolationRecord,
    /// Metadata from the query string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    /// The path the report was posted to.
    pub path: String,
    /// The client address, either in full or truncated to its network.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
}

/// Destination of accepted violation reports.
///
/// Sinks must not fail the request. Any error while writing has to be handled by the sink itself.
pub trait ReportSink: Send + Sync {
    /// Writes one entry.
    fn write(&self, entry: &ReportEntry);
}

/// Writes reports as structured log events with target [`REPORT_TARGET`](csp_log::REPORT_TARGET).
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn write(&self, entry: &ReportEntry) {
        let ReportEntry {
            record,
            metadata,
            path,
            client_ip,
        } = entry;

        // The status code is logged with its original type, which requires separate callsites.
        macro_rules! write_entry {
            ($($status_code:tt)+) => {
                csp_log::info!(
                    target: csp_log::REPORT_TARGET,
                    report_only = record.report_only,
                    document_uri = %record.document_uri,
                    referrer = %record.referrer,
                    blocked_uri = %record.blocked_uri,
                    violated_directive = %record.violated_directive,
                    effective_directive = %record.effective_directive,
                    original_policy = %record.original_policy,
                    disposition = %record.disposition,
                    script_sample = %record.script_sample,
                    status_code = $($status_code)+,
                    source_file = %record.source_file,
                    line_number = record.line_number,
                    column_number = record.column_number,
                    metadata = metadata.as_ref().map(field::display),
                    path = %path,
                    client_ip = client_ip.as_deref()
                )
            };
        }

        match &record.status_code {
            Some(StatusCode::Number(code)) => {
                if let Some(code) = code.as_u64() {
                    write_entry!(code)
                } else if let Some(code) = code.as_i64() {
                    write_entry!(code)
                } else {
                    write_entry!(code.as_f64().unwrap_or_default())
                }
            }
            Some(StatusCode::Text(code)) => write_entry!(%code),
            None => write_entry!(field::Empty),
        }
    }
}

/// Merges violation records with request-level fields and writes them to a [`ReportSink`].
#[derive(Clone)]
pub struct ReportEmitter {
    sink: Arc<dyn ReportSink>,
    truncate_query_fragment: bool,
    client_ip: ClientIpLogging,
}

impl ReportEmitter {
    /// Creates an emitter configured from the `reports` section of the config.
    pub fn new(config: &Config, sink: Arc<dyn ReportSink>) -> Self {
        Self {
            sink,
            truncate_query_fragment: config.truncate_query_fragment(),
            client_ip: config.client_ip_logging(),
        }
    }

    /// Writes a single violation record.
    pub fn emit(&self, record: ViolationRecord, context: &RequestContext) {
        self.emit_all([record], context);
    }

    /// Writes all violation records of a request, one entry per record.
    ///
    /// The client address is resolved once, so a request with an unparseable address logs a
    /// single warning.
    pub fn emit_all<I>(&self, records: I, context: &RequestContext)
    where
        I: IntoIterator<Item = ViolationRecord>,
    {
        let client_ip = self.client_ip(context);

        for mut record in records {
            if self.truncate_query_fragment {
                record.truncate_query_fragments();
            }

            self.sink.write(&ReportEntry {
                record,
                metadata: context.metadata().cloned(),
                path: context.path().to_owned(),
                client_ip: client_ip.clone(),
            });
        }
    }

    fn client_ip(&self, context: &RequestContext) -> Option<String> {
        if self.client_ip == ClientIpLogging::Disabled {
            return None;
        }

        let addr = match context.client_addr() {
            Ok(addr) => addr,
            Err(error) => {
                csp_log::warn!(
                    error = error as &dyn Error,
                    "unable to parse client ip"
                );
                return None;
            }
        };

        Some(match self.client_ip {
            ClientIpLogging::Truncated => extractors::truncate(addr),
            _ => addr.to_string(),
        })
    }
}

impl fmt::Debug for ReportEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportEmitter")
            .field("truncate_query_fragment", &self.truncate_query_fragment)
            .field("client_ip", &self.client_ip)
            .finish_non_exhaustive()
    }
}
