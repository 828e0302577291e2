//! Wire formats and the normalized record of Content-Security-Policy violation reports.
//!
//! Browsers send violation reports in two shapes:
//!
//!  - The legacy `report-uri` format, a JSON object with a single `csp-report` entry.
//!  - The Reporting API (`report-to`) format, a JSON array of report envelopes. Only envelopes of
//!    type `csp-violation` carry violations, everything else is ignored.
//!
//! Both are mapped into one flat [`ViolationRecord`] by [`normalize`]. The format is never sniffed
//! from the payload; the caller picks it based on where the report was received.
//!
//! # Example
//!
//! ```
//! use csp_schema::{ReportFormat, normalize};
//!
//! let payload = br#"{"csp-report": {"document-uri": "https://example.com/"}}"#;
//! let records = normalize(payload, ReportFormat::Legacy { report_only: false }).unwrap();
//!
//! assert_eq!(records.len(), 1);
//! assert_eq!(records[0].document_uri, "https://example.com/");
//! ```

mod normalize;
mod record;
mod security_report;

pub use self::normalize::*;
pub use self::record::*;
pub use self::security_report::*;
