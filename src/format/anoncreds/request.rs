//! Bound request creation: derive a full proof request from the proof
//! request preview stored with a received proposal.

use serde_json::{Value, json};

use crate::error::{Error, Result};
use crate::format::anoncreds::{PROOF_REQUEST_FORMAT, deserialize, types::ProofRequest};
use crate::format::{Format, RequestOverrides};
use crate::generate;
use crate::messages::{Attachment, MessageType};
use crate::state::ExchangeRecord;

const DEFAULT_NAME: &str = "proof-request";
const DEFAULT_VERSION: &str = "1.0";

/// Create a request attachment from the record's stored proposal. The
/// proposal's preview is adopted wholesale; name, version, and a fresh
/// anti-replay nonce are overlaid.
pub fn create_bound_request(
    record: &ExchangeRecord, overrides: Option<&RequestOverrides>,
) -> Result<Attachment> {
    let Some(mut content) = record.attachment(MessageType::Proposal, Format::AnonCreds) else {
        return Err(Error::NoSupportedFormat);
    };
    deserialize::<ProofRequest>(&content)?;

    let name = overrides
        .and_then(|o| o.name.clone())
        .unwrap_or_else(|| DEFAULT_NAME.to_string());
    let version = overrides
        .and_then(|o| o.version.clone())
        .unwrap_or_else(|| DEFAULT_VERSION.to_string());
    let nonce = overrides
        .and_then(|o| o.nonce.clone())
        .unwrap_or_else(generate::pr_nonce);

    if let Value::Object(map) = &mut content {
        map.insert("name".to_string(), json!(name));
        map.insert("version".to_string(), json!(version));
        map.insert("nonce".to_string(), json!(nonce));
    }

    Attachment::from_content(PROOF_REQUEST_FORMAT, &content).map_err(|e| Error::FormatValidation {
        field: "attachment".to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::messages::{Proposal, ProposalBody};
    use crate::state::{Initiator, Role, State};

    fn record_with_proposal(preview: &Value) -> ExchangeRecord {
        let attachment =
            Attachment::from_content(PROOF_REQUEST_FORMAT, preview).expect("should encode");
        let proposal = Proposal::new(ProposalBody::default(), vec![attachment]);

        let mut record = ExchangeRecord::new(
            Some("conn-1".to_string()),
            proposal.thread_id(),
            Initiator::External,
            Role::Verifier,
            State::ProposalReceived,
        );
        record.proposal = Some(proposal);
        record
    }

    #[test]
    fn adopts_preview_and_overlays_nonce() {
        let preview = json!({
            "requested_attributes": {
                "0_player_uuid": {"name": "player"}
            },
            "requested_predicates": {},
        });
        let record = record_with_proposal(&preview);

        let attachment = create_bound_request(&record, None).expect("should create");
        let content = attachment.content().expect("should decode");

        assert_eq!(content["name"], "proof-request");
        assert_eq!(content["version"], "1.0");
        assert_eq!(content["requested_attributes"]["0_player_uuid"]["name"], "player");

        let nonce = content["nonce"].as_str().expect("has nonce");
        assert!(nonce.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn overrides_take_precedence() {
        let preview = json!({"requested_attributes": {}, "requested_predicates": {}});
        let record = record_with_proposal(&preview);

        let overrides = RequestOverrides {
            name: Some("employment-check".to_string()),
            version: Some("2.0".to_string()),
            nonce: Some("42".to_string()),
        };
        let attachment =
            create_bound_request(&record, Some(&overrides)).expect("should create");
        let content = attachment.content().expect("should decode");

        assert_eq!(content["name"], "employment-check");
        assert_eq!(content["version"], "2.0");
        assert_eq!(content["nonce"], "42");
    }

    #[test]
    fn missing_proposal_attachment() {
        let record = ExchangeRecord::new(
            None,
            "thread-1",
            Initiator::External,
            Role::Verifier,
            State::ProposalReceived,
        );

        let err = create_bound_request(&record, None).expect_err("should fail");
        assert_eq!(err, Error::NoSupportedFormat);
    }
}
