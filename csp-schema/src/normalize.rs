use serde::de::{DeserializeOwned, Error as _};

use crate::{CspReportRaw, CspViolationBody, ReportEnvelope, ViolationRecord};

/// The key holding the violation in a legacy report.
const CSP_REPORT_KEY: &str = "csp-report";

/// The disposition of a policy that is only reported and not enforced.
const REPORT_DISPOSITION: &str = "report";

/// The wire format of an incoming report, selected by the endpoint it was sent to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ReportFormat {
    /// A single report in the legacy `report-uri` format.
    Legacy {
        /// Marks every violation as report-only, regardless of its disposition.
        report_only: bool,
    },
    /// A batch of reports in the Reporting API format.
    ReportingApi,
}

/// The payload could not be decoded into the expected report format.
#[derive(Debug, thiserror::Error)]
#[error("unable to decode invalid JSON payload")]
pub struct DecodeError(#[source] serde_json::Error);

/// Decodes a raw report payload into normalized violation records.
///
/// A legacy report always yields exactly one record. A Reporting API batch yields one record per
/// envelope of type `csp-violation`, preserving their order, and skips all other envelopes.
pub fn normalize(
    payload: &[u8],
    format: ReportFormat,
) -> Result<Vec<ViolationRecord>, DecodeError> {
    let records = match format {
        ReportFormat::Legacy { report_only } => {
            // Derived struct decoding also accepts sequences, so object shapes are checked first.
            let object: serde_json::Map<String, serde_json::Value> = decode(payload)?;
            if let Some(report) = object.get(CSP_REPORT_KEY) {
                expect_object(report)?;
            }
            let report: CspReportRaw =
                serde_json::from_value(object.into()).map_err(DecodeError)?;
            let mut record = ViolationRecord::from(report.csp_report.unwrap_or_default());
            record.report_only = report_only;
            vec![record]
        }
        ReportFormat::ReportingApi => {
            let envelopes: Vec<ReportEnvelope> = decode(payload)?;
            envelopes
                .into_iter()
                .filter(ReportEnvelope::is_csp_violation)
                .map(|envelope| decode_body(envelope.body))
                .collect::<Result<_, _>>()?
        }
    };

    Ok(records
        .into_iter()
        .map(|mut record| {
            record.report_only |= record.disposition == REPORT_DISPOSITION;
            record
        })
        .collect())
}

fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, DecodeError> {
    serde_json::from_slice(payload).map_err(DecodeError)
}

/// Rejects any value that is neither an object nor `null`.
fn expect_object(value: &serde_json::Value) -> Result<(), DecodeError> {
    if value.is_object() || value.is_null() {
        Ok(())
    } else {
        Err(DecodeError(serde_json::Error::custom(
            "expected a violation object",
        )))
    }
}

fn decode_body(body: serde_json::Value) -> Result<ViolationRecord, DecodeError> {
    if body.is_null() {
        return Ok(ViolationRecord::default());
    }

    expect_object(&body)?;

    let body: CspViolationBody = serde_json::from_value(body).map_err(DecodeError)?;
    Ok(body.into())
}
