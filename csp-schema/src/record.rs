use std::fmt;

use serde::{Deserialize, Serialize};

/// The HTTP status code of the document in which a violation occurred.
///
/// Browsers disagree on the type of this field, so the value is kept exactly as it was sent.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(untagged)]
pub enum StatusCode {
    /// A numeric status code, such as `200`. Negative and fractional values are kept as sent.
    Number(serde_json::Number),
    /// A status code sent as a string, such as `"200"`.
    Text(String),
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(number) => write!(f, "{number}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// A single violation, normalized from either of the supported report formats.
///
/// Fields missing from the payload are left at their zero value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ViolationRecord {
    /// The URI of the document in which the violation occurred.
    pub document_uri: String,
    /// The referrer of the document in which the violation occurred.
    pub referrer: String,
    /// The URI of the resource that was blocked from loading.
    pub blocked_uri: String,
    /// The name of the policy section that was violated.
    pub violated_directive: String,
    /// The directive whose enforcement caused the violation.
    pub effective_directive: String,
    /// The policy as specified by the `Content-Security-Policy` header.
    pub original_policy: String,
    /// Policy disposition, either `enforce` or `report`.
    pub disposition: String,
    /// The first characters of the inline script, event handler or style that caused the
    /// violation.
    pub script_sample: String,
    /// The HTTP status code of the document, if the browser sent one.
    pub status_code: Option<StatusCode>,
    /// The URL of the resource where the violation occurred.
    pub source_file: String,
    /// The line number in `source_file` on which the violation occurred.
    pub line_number: i64,
    /// The column number in `source_file` on which the violation occurred.
    pub column_number: i64,
    /// Whether the policy was only reported and not enforced.
    pub report_only: bool,
}

impl ViolationRecord {
    /// Strips query strings and fragments from all URI fields of this record.
    ///
    /// This applies to `document_uri`, `referrer`, `blocked_uri` and `source_file`.
    pub fn truncate_query_fragments(&mut self) {
        for uri in [
            &mut self.document_uri,
            &mut self.referrer,
            &mut self.blocked_uri,
            &mut self.source_file,
        ] {
            let len = truncate_query_fragment(uri).len();
            uri.truncate(len);
        }
    }
}

/// Returns the part of `uri` before the first `?` or `#`.
///
/// ```
/// use csp_schema::truncate_query_fragment;
///
/// assert_eq!(truncate_query_fragment("https://example.com/a?b=c#d"), "https://example.com/a");
/// assert_eq!(truncate_query_fragment("https://example.com/a#d?b"), "https://example.com/a");
/// ```
pub fn truncate_query_fragment(uri: &str) -> &str {
    match uri.find(['?', '#']) {
        Some(index) => &uri[..index],
        None => uri,
    }
}
