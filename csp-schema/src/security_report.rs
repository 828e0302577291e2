//! Raw wire formats of CSP violation reports.
//!
//! All fields are optional. Browsers omit fields freely and occasionally send `null`, neither of
//! which is treated as an error.
use serde::{Deserialize, Serialize};

use crate::{StatusCode, ViolationRecord};

/// The `type` of Reporting API envelopes that carry CSP violations.
pub const CSP_VIOLATION_TYPE: &str = "csp-violation";

/// The violation carried in a legacy `report-uri` report.
///
/// See [`ViolationRecord`] for the meaning of fields.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CspRaw {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violated_directive: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_directive: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disposition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_sample: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<StatusCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_number: Option<i64>,
}

/// A legacy `report-uri` report, as posted by the browser.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CspReportRaw {
    /// The reported violation.
    #[serde(default)]
    pub csp_report: Option<CspRaw>,
}

impl From<CspRaw> for ViolationRecord {
    fn from(raw: CspRaw) -> Self {
        ViolationRecord {
            document_uri: raw.document_uri.unwrap_or_default(),
            referrer: raw.referrer.unwrap_or_default(),
            blocked_uri: raw.blocked_uri.unwrap_or_default(),
            violated_directive: raw.violated_directive.unwrap_or_default(),
            effective_directive: raw.effective_directive.unwrap_or_default(),
            original_policy: raw.original_policy.unwrap_or_default(),
            disposition: raw.disposition.unwrap_or_default(),
            script_sample: raw.script_sample.unwrap_or_default(),
            status_code: raw.status_code,
            source_file: raw.source_file.unwrap_or_default(),
            line_number: raw.line_number.unwrap_or_default(),
            column_number: raw.column_number.unwrap_or_default(),
            report_only: false,
        }
    }
}

/// The body of a Reporting API envelope of type `csp-violation`.
///
/// The Reporting API has no `violatedDirective`, the effective directive is used in its place.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CspViolationBody {
    #[serde(rename = "documentURL", skip_serializing_if = "Option::is_none")]
    pub document_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    #[serde(rename = "blockedURL", skip_serializing_if = "Option::is_none")]
    pub blocked_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_directive: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disposition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<StatusCode>,
}

impl From<CspViolationBody> for ViolationRecord {
    fn from(raw: CspViolationBody) -> Self {
        let effective_directive = raw.effective_directive.unwrap_or_default();

        ViolationRecord {
            document_uri: raw.document_url.unwrap_or_default(),
            referrer: raw.referrer.unwrap_or_default(),
            blocked_uri: raw.blocked_url.unwrap_or_default(),
            violated_directive: effective_directive.clone(),
            effective_directive,
            original_policy: raw.original_policy.unwrap_or_default(),
            disposition: raw.disposition.unwrap_or_default(),
            script_sample: raw.sample.unwrap_or_default(),
            status_code: raw.status_code,
            source_file: raw.source_file.unwrap_or_default(),
            line_number: raw.line_number.unwrap_or_default(),
            column_number: raw.column_number.unwrap_or_default(),
            report_only: false,
        }
    }
}

/// One envelope of a Reporting API batch.
///
/// The body is kept as raw JSON until the envelope type is known, since bodies of other report
/// types (deprecations, interventions, network errors) have unrelated shapes.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportEnvelope {
    /// The report type, such as `csp-violation` or `deprecation`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
    /// Milliseconds between the violation and the report being sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u64>,
    /// The URL of the document that generated the report.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// The user agent of the browser that generated the report.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// The type-specific report body.
    pub body: serde_json::Value,
}

impl ReportEnvelope {
    /// Returns `true` if this envelope carries a CSP violation.
    pub fn is_csp_violation(&self) -> bool {
        self.ty.as_deref() == Some(CSP_VIOLATION_TYPE)
    }
}
