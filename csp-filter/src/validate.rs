use csp_schema::ViolationRecord;

use crate::Blocklist;

/// The reason a violation report was rejected.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// The blocked URI starts with a prefix of the blocklist.
    #[error("blocked URI ('{prefix}') is an invalid resource")]
    BlockedUri {
        /// The blocklist prefix that matched.
        prefix: String,
    },
    /// The document URI does not start with `http`.
    #[error("document URI ('{document_uri}') is invalid")]
    InvalidDocumentUri {
        /// The offending document URI, as reported.
        document_uri: String,
    },
}

/// Checks a single violation record against the blocklist.
pub fn validate_record(
    record: &ViolationRecord,
    blocklist: &Blocklist,
) -> Result<(), ValidationError> {
    if let Some(prefix) = blocklist.matches(&record.blocked_uri) {
        return Err(ValidationError::BlockedUri {
            prefix: prefix.to_owned(),
        });
    }

    if !record.document_uri.starts_with("http") {
        return Err(ValidationError::InvalidDocumentUri {
            document_uri: record.document_uri.clone(),
        });
    }

    Ok(())
}

/// Checks all violation records of a request.
///
/// Validation stops at the first record that fails, so either all records pass or the whole
/// request is rejected.
pub fn validate(records: &[ViolationRecord], blocklist: &Blocklist) -> Result<(), ValidationError> {
    records
        .iter()
        .try_for_each(|record| validate_record(record, blocklist))
}
