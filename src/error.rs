//! # Errors
//!
//! Error types for the present-proof exchange protocol. Failures surfaced to
//! the remote party as problem reports carry a deliberately vague reason code
//! while the locally stored error message retains the precise cause.

use thiserror::Error;

/// Result type for present-proof operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Present-proof protocol errors.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// An attachment failed structural validation. Structural checks only:
    /// no semantic validation (issuer trust, ledger state, etc.) happens
    /// here.
    #[error("invalid `{field}` in attachment: {reason}")]
    FormatValidation {
        /// The offending field.
        field: String,
        /// Why validation failed.
        reason: String,
    },

    /// No registered format handler recognized any of the message's
    /// attachments. The operation is aborted and nothing is persisted.
    #[error("no supported format in message attachments")]
    NoSupportedFormat,

    /// Auto-resolution found no credentials satisfying the proof request.
    #[error("no matching credentials found: {0}")]
    NoMatchingCredentials(String),

    /// A presented item does not satisfy any of the proof request's
    /// restriction clauses.
    #[error("presented item `{referent}` does not satisfy proof request restrictions")]
    RestrictionMismatch {
        /// The referent of the offending item.
        referent: String,
    },

    /// A presented referent does not exist in the proof request.
    #[error("presentation referent `{0}` not in proof request")]
    UnknownReferent(String),

    /// A requested predicate has no matching assertion in the presentation's
    /// cryptographic proof body.
    #[error("requested predicate on `{0}` not in presentation")]
    PredicateNotPresented(String),

    /// The store collaborator failed.
    #[error("storage failure: {0}")]
    Storage(String),

    /// No exchange record matched the lookup filter.
    #[error("exchange record not found for thread `{0}`")]
    NotFound(String),

    /// An injected proof system capability (holder or verifier) failed.
    #[error("proof system failure: {0}")]
    ProofSystem(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::UnknownReferent("0_name_uuid".to_string());
        assert_eq!(err.to_string(), "presentation referent `0_name_uuid` not in proof request");

        let err = Error::FormatValidation {
            field: "requested_attributes".to_string(),
            reason: "missing field".to_string(),
        };
        assert_eq!(err.to_string(), "invalid `requested_attributes` in attachment: missing field");
    }
}
