//! Presentation creation: satisfy the stored proof request from an explicit
//! credential selection or one auto-resolved from the holder's wallet.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::format::Format;
use crate::format::anoncreds::types::{
    CredentialSelection, ProofRequest, SelectedAttribute, SelectedPredicate,
};
use crate::format::anoncreds::{PROOF_FORMAT, deserialize};
use crate::messages::{Attachment, MessageType};
use crate::provider::ProofHolder;
use crate::state::ExchangeRecord;

/// Build a presentation attachment for the record's stored request.
pub async fn create_presentation(
    holder: &impl ProofHolder, record: &ExchangeRecord, selection: Option<&Value>,
) -> Result<Attachment> {
    let Some(request_value) = record.attachment(MessageType::Request, Format::AnonCreds) else {
        return Err(Error::NoSupportedFormat);
    };
    let request: ProofRequest = deserialize(&request_value)?;

    let selection = match selection {
        Some(value) => deserialize::<CredentialSelection>(value)?,
        None => auto_select(holder, &request_value, &request).await?,
    };
    let selection_value = serde_json::to_value(&selection)
        .map_err(|e| Error::ProofSystem(e.to_string()))?;

    let proof = holder
        .create_proof(&request_value, &selection_value)
        .await
        .map_err(|e| Error::ProofSystem(e.to_string()))?;

    Attachment::from_content(PROOF_FORMAT, &proof).map_err(|e| Error::FormatValidation {
        field: "attachment".to_string(),
        reason: e.to_string(),
    })
}

/// Resolve a selection from the wallet: the first eligible credential per
/// referent, attributes revealed. Deterministic given the wallet's ordering.
async fn auto_select(
    holder: &impl ProofHolder, request_value: &Value, request: &ProofRequest,
) -> Result<CredentialSelection> {
    let mut referents: Vec<String> = request
        .requested_attributes
        .keys()
        .chain(request.requested_predicates.keys())
        .cloned()
        .collect();
    referents.sort();

    let credentials = holder
        .list_credentials(request_value, &referents)
        .await
        .map_err(|e| Error::ProofSystem(e.to_string()))?;

    let mut selection = CredentialSelection::default();

    for referent in request.requested_attributes.keys() {
        let credential = credentials
            .iter()
            .find(|c| c.referents.iter().any(|r| r == referent))
            .ok_or_else(|| Error::NoMatchingCredentials(referent.clone()))?;
        selection.requested_attributes.insert(
            referent.clone(),
            SelectedAttribute {
                cred_id: credential.credential_id.clone(),
                revealed: true,
            },
        );
    }

    for referent in request.requested_predicates.keys() {
        let credential = credentials
            .iter()
            .find(|c| c.referents.iter().any(|r| r == referent))
            .ok_or_else(|| Error::NoMatchingCredentials(referent.clone()))?;
        selection.requested_predicates.insert(
            referent.clone(),
            SelectedPredicate {
                cred_id: credential.credential_id.clone(),
            },
        );
    }

    Ok(selection)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use anyhow::anyhow;
    use serde_json::json;

    use super::*;
    use crate::format::anoncreds::PROOF_REQUEST_FORMAT;
    use crate::messages::{Request, RequestBody};
    use crate::provider::Credential;
    use crate::state::{Initiator, Role, State};

    struct TestHolder {
        credentials: Vec<Credential>,
    }

    impl ProofHolder for TestHolder {
        async fn list_credentials(
            &self, _request: &Value, _referents: &[String],
        ) -> anyhow::Result<Vec<Credential>> {
            Ok(self.credentials.clone())
        }

        async fn create_proof(
            &self, request: &Value, selection: &Value,
        ) -> anyhow::Result<Value> {
            if selection["requested_attributes"].as_object().is_none_or(serde_json::Map::is_empty)
            {
                return Err(anyhow!("empty selection"));
            }
            Ok(json!({
                "proof": {"proofs": []},
                "requested_proof": {"revealed_attrs": {}},
                "identifiers": [],
                "nonce_echo": request["nonce"],
            }))
        }
    }

    fn record_with_request() -> ExchangeRecord {
        let content = json!({
            "name": "proof-request",
            "version": "1.0",
            "nonce": "1234567890",
            "requested_attributes": {
                "0_player_uuid": {"name": "player"}
            },
            "requested_predicates": {
                "0_highscore_GE_uuid": {"name": "highScore", "p_type": ">=", "p_value": 1000000}
            },
        });
        let attachment =
            Attachment::from_content(PROOF_REQUEST_FORMAT, &content).expect("should encode");
        let request = Request::new(RequestBody::default(), vec![attachment]);

        let mut record = ExchangeRecord::new(
            Some("conn-1".to_string()),
            request.thread_id(),
            Initiator::External,
            Role::Prover,
            State::RequestReceived,
        );
        record.request = Some(request);
        record
    }

    fn game_credential() -> Credential {
        Credential {
            credential_id: "cred-1".to_string(),
            referents: vec!["0_player_uuid".to_string(), "0_highscore_GE_uuid".to_string()],
            attributes: HashMap::from([
                ("player".to_string(), "Richie Knucklez".to_string()),
                ("highScore".to_string(), "1234567".to_string()),
            ]),
        }
    }

    #[tokio::test]
    async fn auto_selection_builds_presentation() {
        let holder = TestHolder { credentials: vec![game_credential()] };
        let record = record_with_request();

        let attachment =
            create_presentation(&holder, &record, None).await.expect("should create");
        assert_eq!(attachment.format, PROOF_FORMAT);

        let content = attachment.content().expect("should decode");
        assert_eq!(content["nonce_echo"], "1234567890");
    }

    #[tokio::test]
    async fn no_matching_credentials() {
        let holder = TestHolder { credentials: vec![] };
        let record = record_with_request();

        let err = create_presentation(&holder, &record, None).await.expect_err("should fail");
        assert!(matches!(err, Error::NoMatchingCredentials(_)), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn explicit_selection_used() {
        let holder = TestHolder { credentials: vec![] };
        let record = record_with_request();

        let selection = json!({
            "requested_attributes": {
                "0_player_uuid": {"cred_id": "cred-9", "revealed": true}
            },
            "requested_predicates": {
                "0_highscore_GE_uuid": {"cred_id": "cred-9"}
            },
        });
        create_presentation(&holder, &record, Some(&selection)).await.expect("should create");
    }
}
