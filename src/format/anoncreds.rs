//! # AnonCreds Format
//!
//! The AnonCreds (Hyperledger Indy) proof format: zero-knowledge proofs over
//! CL-signature credentials, with selective disclosure and range predicates.
//!
//! Attachment contents follow the `hlindy` attachment format family.

pub mod types;

mod present;
mod request;
mod restrict;
mod verify;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::format::{FormatHandler, RequestOverrides};
use crate::messages::{Attachment, MessageType, Presentation};
use crate::provider::{ProofHolder, ProofVerifier};
use crate::state::ExchangeRecord;

/// Attachment format identifier for proposals and requests.
pub const PROOF_REQUEST_FORMAT: &str = "hlindy/proof-req@v3.0";

/// Attachment format identifier for presentations.
pub const PROOF_FORMAT: &str = "hlindy/proof@v3.0";

/// Handler for the AnonCreds proof format.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnonCredsHandler;

impl FormatHandler for AnonCredsHandler {
    fn format_identifier(&self, message_type: MessageType) -> &'static str {
        match message_type {
            MessageType::Proposal | MessageType::Request => PROOF_REQUEST_FORMAT,
            MessageType::Presentation => PROOF_FORMAT,
        }
    }

    fn validate_fields(&self, message_type: MessageType, content: &Value) -> Result<()> {
        match message_type {
            MessageType::Proposal | MessageType::Request => {
                deserialize::<types::ProofRequest>(content)?;
            }
            MessageType::Presentation => {
                deserialize::<types::Proof>(content)?;
            }
        }
        Ok(())
    }

    fn create_bound_request(
        &self, record: &ExchangeRecord, overrides: Option<&RequestOverrides>,
    ) -> Result<Attachment> {
        request::create_bound_request(record, overrides)
    }

    async fn create_presentation(
        &self, holder: &impl ProofHolder, record: &ExchangeRecord, selection: Option<&Value>,
    ) -> Result<Attachment> {
        present::create_presentation(holder, record, selection).await
    }

    fn receive_presentation(&self, message: &Presentation, record: &ExchangeRecord) -> Result<()> {
        verify::check_presentation(message, record)
    }

    async fn verify_presentation(
        &self, verifier: &impl ProofVerifier, record: &ExchangeRecord,
    ) -> Result<bool> {
        verify::verify_presentation(verifier, record).await
    }
}

/// Deserialize attachment content, mapping failures to a validation error
/// naming the offending field.
fn deserialize<T: DeserializeOwned>(content: &Value) -> Result<T> {
    serde_json::from_value(content.clone()).map_err(|e| {
        let reason = e.to_string();
        let field = reason.split('`').nth(1).unwrap_or("attachment").to_string();
        Error::FormatValidation { field, reason }
    })
}

/// Canonical attribute name: lowercased with whitespace removed. Names are
/// canonicalized before comparison everywhere the proof system does so.
pub(crate) fn canon(name: &str) -> String {
    name.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_lowercase()
}
