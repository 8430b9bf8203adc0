//! # Attachment Formats
//!
//! Each protocol message carries zero or more format-tagged attachments. The
//! format identifier selects which handler processes an attachment; a
//! message may carry attachments for several formats simultaneously
//! (multi-format negotiation).
//!
//! Handlers form a closed set: the [`Format`] registry resolves an
//! identifier to a handler once, with no dynamic lookup. Additional formats
//! plug in by implementing [`FormatHandler`] and extending the registry;
//! the exchange manager is untouched.

pub mod anoncreds;

use std::future::Future;

use serde_json::Value;

use crate::error::Result;
use crate::messages::{Attachment, MessageType, Presentation};
use crate::provider::{ProofHolder, ProofVerifier};
use crate::state::ExchangeRecord;

/// The registry of supported attachment formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    /// AnonCreds zero-knowledge credential format.
    AnonCreds,
}

impl Format {
    /// Resolve an attachment format identifier to a registered format.
    /// Returns `None` for unrecognized identifiers; callers decide whether
    /// that is an error.
    #[must_use]
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        if identifier.starts_with("hlindy/") || identifier == "anoncreds" {
            Some(Self::AnonCreds)
        } else {
            None
        }
    }

    /// Short api label for the format, used to key derived per-format
    /// content indexes.
    #[must_use]
    pub const fn api(self) -> &'static str {
        match self {
            Self::AnonCreds => "anoncreds",
        }
    }
}

/// Caller-supplied overrides for request creation. Fields left unset fall
/// back to handler defaults (including a freshly generated anti-replay
/// nonce).
#[derive(Clone, Debug, Default)]
pub struct RequestOverrides {
    /// Proof request name.
    pub name: Option<String>,

    /// Proof request version.
    pub version: Option<String>,

    /// Anti-replay nonce. Omit to have the handler generate one.
    pub nonce: Option<String>,
}

/// The capability set a proof-format implementation must satisfy to plug
/// into the generic exchange manager.
///
/// Handlers never mutate the exchange record: they derive data from it and
/// return produced attachments for the manager to apply.
pub trait FormatHandler: Send + Sync {
    /// The attachment format identifier this handler uses for the given
    /// message type.
    fn format_identifier(&self, message_type: MessageType) -> &'static str;

    /// Structural schema validation of attachment content for a message
    /// type. No semantic checks (issuer trust, ledger state) happen here.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FormatValidation`](crate::Error::FormatValidation)
    /// naming the offending field.
    fn validate_fields(&self, message_type: MessageType, content: &Value) -> Result<()>;

    /// Produce a request attachment from the record's stored proposal,
    /// injecting a fresh anti-replay nonce and default name/version unless
    /// overridden.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored proposal carries no attachment for
    /// this format or its content is malformed.
    fn create_bound_request(
        &self, record: &ExchangeRecord, overrides: Option<&RequestOverrides>,
    ) -> Result<Attachment>;

    /// Build a presentation attachment satisfying the record's stored
    /// request, from an explicit credential selection or one auto-resolved
    /// via the injected holder.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoMatchingCredentials`](crate::Error::NoMatchingCredentials)
    /// when auto-resolution finds no eligible credential.
    fn create_presentation(
        &self, holder: &impl ProofHolder, record: &ExchangeRecord, selection: Option<&Value>,
    ) -> impl Future<Output = Result<Attachment>> + Send;

    /// Check the received presentation's disclosed data against the
    /// record's stored request before any cryptographic verification.
    /// Runs on receipt so tampering is rejected before any costly
    /// cryptographic call.
    ///
    /// # Errors
    ///
    /// Returns an error describing exactly which referent or restriction
    /// failed.
    fn receive_presentation(&self, message: &Presentation, record: &ExchangeRecord) -> Result<()>;

    /// Cryptographically verify the record's stored presentation against
    /// its stored request via the injected verification capability. Assumes
    /// the restriction check already ran at receipt; it is not repeated.
    ///
    /// # Errors
    ///
    /// Returns an error if stored content is malformed or the verification
    /// capability fails.
    fn verify_presentation(
        &self, verifier: &impl ProofVerifier, record: &ExchangeRecord,
    ) -> impl Future<Output = Result<bool>> + Send;
}
