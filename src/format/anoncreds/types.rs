//! # AnonCreds Types
//!
//! Typed models for AnonCreds proof requests, proofs, and credential
//! selections. Only the fields the exchange core inspects are modelled;
//! unknown fields are ignored on deserialization and the attachment
//! transport preserves the full content.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A restriction clause: a set of required criterion-key → value pairs.
/// A requested item is satisfiable by any credential matching at least one
/// clause.
pub type Restriction = HashMap<String, String>;

/// A proof request: referent → requested attribute or predicate, plus an
/// anti-replay nonce.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProofRequest {
    /// Proof request name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Proof request version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Anti-replay nonce, a decimal string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// Requested attributes by referent.
    pub requested_attributes: HashMap<String, RequestedAttribute>,

    /// Requested predicates by referent.
    pub requested_predicates: HashMap<String, RequestedPredicate>,

    /// Non-revocation interval, passed through to the proof system.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub non_revoked: Option<Value>,
}

/// A requested attribute or attribute group.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct RequestedAttribute {
    /// Attribute name. Mutually exclusive with `names`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Attribute group names. Mutually exclusive with `name`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub names: Option<Vec<String>>,

    /// Restriction clauses. Empty means unconstrained.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restrictions: Vec<Restriction>,

    /// Non-revocation interval for this attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub non_revoked: Option<Value>,
}

/// A requested predicate: a threshold assertion over an attribute.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct RequestedPredicate {
    /// Attribute name the predicate applies to.
    pub name: String,

    /// Predicate type.
    pub p_type: PredicateType,

    /// Threshold value.
    pub p_value: i64,

    /// Restriction clauses. Empty means unconstrained.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restrictions: Vec<Restriction>,

    /// Non-revocation interval for this predicate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub non_revoked: Option<Value>,
}

/// Inequality predicate types.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum PredicateType {
    /// Less than.
    #[serde(rename = "<")]
    LessThan,

    /// Less than or equal.
    #[serde(rename = "<=")]
    LessThanOrEqual,

    /// Greater than or equal.
    #[serde(rename = ">=")]
    GreaterThanOrEqual,

    /// Greater than.
    #[serde(rename = ">")]
    GreaterThan,
}

impl fmt::Display for PredicateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThanOrEqual => ">=",
            Self::GreaterThan => ">",
        };
        write!(f, "{s}")
    }
}

/// A presented proof: disclosed data, the cryptographic proof body, and the
/// credential identifiers the sub-proofs were built from.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Proof {
    /// Cryptographic proof body.
    pub proof: ProofBody,

    /// Disclosed data, categorized.
    pub requested_proof: RequestedProof,

    /// Per-sub-proof schema and credential definition identifiers.
    pub identifiers: Vec<Identifier>,
}

/// Disclosed data by category. Each entry's `sub_proof_index` links it back
/// to the [`Identifier`] and sub-proof it was built from.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct RequestedProof {
    /// Revealed attributes by referent.
    #[serde(default)]
    pub revealed_attrs: HashMap<String, RevealedAttribute>,

    /// Revealed attribute groups by referent.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub revealed_attr_groups: HashMap<String, RevealedAttributeGroup>,

    /// Predicate disclosures by referent.
    #[serde(default)]
    pub predicates: HashMap<String, SubProofReferent>,

    /// Self-attested attribute values by referent.
    #[serde(default)]
    pub self_attested_attrs: HashMap<String, String>,

    /// Unrevealed attributes by referent.
    #[serde(default)]
    pub unrevealed_attrs: HashMap<String, SubProofReferent>,
}

/// A revealed attribute value.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct RevealedAttribute {
    /// Index into the proof's identifiers list.
    pub sub_proof_index: usize,

    /// The raw attribute value.
    pub raw: String,

    /// The encoded attribute value.
    #[serde(default)]
    pub encoded: String,
}

/// A revealed attribute group: named sub-values from one credential.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct RevealedAttributeGroup {
    /// Index into the proof's identifiers list.
    pub sub_proof_index: usize,

    /// Values by attribute name.
    pub values: HashMap<String, AttributeValue>,
}

/// A raw/encoded value pair within an attribute group.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct AttributeValue {
    /// The raw attribute value.
    pub raw: String,

    /// The encoded attribute value.
    #[serde(default)]
    pub encoded: String,
}

/// A disclosure referencing a sub-proof without revealing a value.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SubProofReferent {
    /// Index into the proof's identifiers list.
    pub sub_proof_index: usize,
}

/// Identifiers of the artifacts one sub-proof was built from.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Identifier {
    /// Schema identifier, colon-delimited.
    pub schema_id: String,

    /// Credential definition identifier, colon-delimited.
    pub cred_def_id: String,

    /// Revocation registry identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rev_reg_id: Option<String>,

    /// Revocation registry timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

/// The cryptographic proof body. Only the predicate assertions are
/// inspected here; everything else is opaque to the exchange core and
/// verified by the injected proof verifier.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProofBody {
    /// One sub-proof per credential used.
    pub proofs: Vec<SubProof>,

    /// Aggregated proof, opaque.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregated_proof: Option<Value>,
}

/// A per-credential proof component.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SubProof {
    /// Primary proof carrying equality and inequality components.
    pub primary_proof: PrimaryProof,

    /// Non-revocation proof, opaque.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_revoc_proof: Option<Value>,
}

/// The primary proof of one sub-proof.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PrimaryProof {
    /// Equality proof, opaque.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eq_proof: Option<Value>,

    /// One inequality proof per asserted predicate.
    #[serde(default)]
    pub ge_proofs: Vec<GeProof>,
}

/// An inequality proof asserting one predicate.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct GeProof {
    /// The predicate this proof asserts.
    pub predicate: PredicateAssertion,
}

/// The predicate actually asserted inside an inequality proof.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct PredicateAssertion {
    /// Attribute name, canonicalized by the proof system.
    pub attr_name: String,

    /// Predicate type.
    pub p_type: PredicateType,

    /// Threshold value.
    pub value: i64,
}

/// A concrete selection of previously issued credentials satisfying a proof
/// request, mapping proof request referents to wallet credential ids.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct CredentialSelection {
    /// Self-attested values by referent.
    #[serde(default)]
    pub self_attested_attributes: HashMap<String, String>,

    /// Credentials selected for requested attributes, by referent.
    #[serde(default)]
    pub requested_attributes: HashMap<String, SelectedAttribute>,

    /// Credentials selected for requested predicates, by referent.
    #[serde(default)]
    pub requested_predicates: HashMap<String, SelectedPredicate>,
}

/// A credential selected to satisfy a requested attribute.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SelectedAttribute {
    /// Wallet credential identifier.
    pub cred_id: String,

    /// Whether to reveal the attribute value.
    #[serde(default)]
    pub revealed: bool,
}

/// A credential selected to satisfy a requested predicate.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SelectedPredicate {
    /// Wallet credential identifier.
    pub cred_id: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn proof_request_deserializes() {
        let value = json!({
            "name": "proof-request",
            "version": "1.0",
            "nonce": "1234567890",
            "requested_attributes": {
                "0_player_uuid": {
                    "name": "player",
                    "restrictions": [{"cred_def_id": "XYZ:3:CL:13:tag"}]
                }
            },
            "requested_predicates": {
                "0_highscore_GE_uuid": {
                    "name": "highScore",
                    "p_type": ">=",
                    "p_value": 1000000,
                    "restrictions": [{"cred_def_id": "XYZ:3:CL:13:tag"}]
                }
            }
        });

        let request: ProofRequest = serde_json::from_value(value).expect("should deserialize");
        assert_eq!(request.requested_attributes["0_player_uuid"].name.as_deref(), Some("player"));

        let predicate = &request.requested_predicates["0_highscore_GE_uuid"];
        assert_eq!(predicate.p_type, PredicateType::GreaterThanOrEqual);
        assert_eq!(predicate.p_value, 1_000_000);
    }

    #[test]
    fn predicate_type_wire_values() {
        assert_eq!(serde_json::to_value(PredicateType::LessThan).unwrap(), json!("<"));
        assert_eq!(PredicateType::GreaterThan.to_string(), ">");

        let de: PredicateType = serde_json::from_value(json!("<=")).expect("should deserialize");
        assert_eq!(de, PredicateType::LessThanOrEqual);
    }
}
