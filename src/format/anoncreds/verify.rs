//! Presentation verification: the receipt-time restriction check and the
//! deferred cryptographic verification against resolved ledger artifacts.

use crate::error::{Error, Result};
use crate::format::Format;
use crate::format::anoncreds::types::{Proof, ProofRequest};
use crate::format::anoncreds::{deserialize, restrict};
use crate::messages::{MessageType, Presentation};
use crate::provider::ProofVerifier;
use crate::state::ExchangeRecord;

/// Check a received presentation's disclosed data against the record's
/// stored request. Runs before the record is updated so a tampered
/// presentation is never persisted as the exchange's presentation.
pub fn check_presentation(message: &Presentation, record: &ExchangeRecord) -> Result<()> {
    let Some(request_value) = record.attachment(MessageType::Request, Format::AnonCreds) else {
        return Err(Error::NoSupportedFormat);
    };
    let request: ProofRequest = deserialize(&request_value)?;

    let proof_value = message
        .attachments
        .iter()
        .find(|a| Format::from_identifier(&a.format) == Some(Format::AnonCreds))
        .ok_or(Error::NoSupportedFormat)?
        .content()
        .map_err(|e| Error::FormatValidation {
            field: "attachment".to_string(),
            reason: e.to_string(),
        })?;
    let proof: Proof = deserialize(&proof_value)?;

    restrict::check_presented_values(&request, &proof)
}

/// Cryptographically verify the record's stored presentation against its
/// stored request. Ledger artifacts are resolved through the injected
/// verifier; the restriction check is not repeated here.
pub async fn verify_presentation(
    verifier: &impl ProofVerifier, record: &ExchangeRecord,
) -> Result<bool> {
    let Some(request_value) = record.attachment(MessageType::Request, Format::AnonCreds) else {
        return Err(Error::NoSupportedFormat);
    };
    let Some(proof_value) = record.attachment(MessageType::Presentation, Format::AnonCreds) else {
        return Err(Error::NoSupportedFormat);
    };
    let proof: Proof = deserialize(&proof_value)?;

    let data = verifier
        .resolve_identifiers(&proof.identifiers)
        .await
        .map_err(|e| Error::ProofSystem(e.to_string()))?;

    verifier
        .verify_proof(&request_value, &proof_value, &data)
        .await
        .map_err(|e| Error::ProofSystem(e.to_string()))
}
