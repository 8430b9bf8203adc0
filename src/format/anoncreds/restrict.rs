//! # Restriction Matching
//!
//! Checks that a presented proof's disclosed data genuinely satisfies every
//! restriction clause in the originating proof request. A cryptographically
//! valid proof is necessary but not sufficient: without this check a prover
//! could present a proof built against different, more permissive criteria
//! than requested (a bait-and-switch).
//!
//! The check is a pure function over deserialized structures: no I/O, no
//! cryptographic calls, fully deterministic.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::format::anoncreds::canon;
use crate::format::anoncreds::types::{Identifier, Proof, ProofRequest, Restriction};

/// Check every disclosed item of `proof` against the restriction clauses of
/// `request`.
///
/// # Errors
///
/// - [`Error::UnknownReferent`] when a disclosed referent is not in the
///   request.
/// - [`Error::RestrictionMismatch`] when a disclosed item satisfies none of
///   the request's restriction clauses.
/// - [`Error::PredicateNotPresented`] when a requested predicate has no
///   matching assertion in the cryptographic proof body.
pub fn check_presented_values(request: &ProofRequest, proof: &Proof) -> Result<()> {
    // revealed attributes
    for (referent, attr) in &proof.requested_proof.revealed_attrs {
        let spec = request
            .requested_attributes
            .get(referent)
            .ok_or_else(|| Error::UnknownReferent(referent.clone()))?;

        let identifier = identifier_at(proof, attr.sub_proof_index)?;
        let mut criteria = identifier_criteria(identifier)?;
        if let Some(name) = &spec.name {
            criteria.insert(format!("attr::{}::value", canon(name)), attr.raw.clone());
        }

        if !satisfies(&spec.restrictions, &criteria) {
            return Err(Error::RestrictionMismatch {
                referent: referent.clone(),
            });
        }
    }

    // revealed attribute groups
    for (referent, group) in &proof.requested_proof.revealed_attr_groups {
        let spec = request
            .requested_attributes
            .get(referent)
            .ok_or_else(|| Error::UnknownReferent(referent.clone()))?;

        let identifier = identifier_at(proof, group.sub_proof_index)?;
        let mut criteria = identifier_criteria(identifier)?;
        for (name, value) in &group.values {
            criteria.insert(format!("attr::{}::value", canon(name)), value.raw.clone());
        }

        if !satisfies(&spec.restrictions, &criteria) {
            return Err(Error::RestrictionMismatch {
                referent: referent.clone(),
            });
        }
    }

    // predicates
    for (referent, disclosed) in &proof.requested_proof.predicates {
        let spec = request
            .requested_predicates
            .get(referent)
            .ok_or_else(|| Error::UnknownReferent(referent.clone()))?;

        // attribute-value restrictions are not enforced on predicates:
        // enforcement is deferred to the underlying proof verifier
        let restrictions: Vec<Restriction> = spec
            .restrictions
            .iter()
            .map(|clause| {
                clause
                    .iter()
                    .filter(|(key, _)| !key.starts_with("attr::"))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect()
            })
            .collect();

        let sub_proof =
            proof.proof.proofs.get(disclosed.sub_proof_index).ok_or_else(|| {
                Error::FormatValidation {
                    field: "sub_proof_index".to_string(),
                    reason: format!(
                        "index {} out of bounds for proof body", disclosed.sub_proof_index
                    ),
                }
            })?;

        let required_name = canon(&spec.name);
        let asserted = sub_proof.primary_proof.ge_proofs.iter().any(|ge| {
            canon(&ge.predicate.attr_name) == required_name
                && ge.predicate.p_type == spec.p_type
                && ge.predicate.value == spec.p_value
        });
        if !asserted {
            return Err(Error::PredicateNotPresented(spec.name.clone()));
        }

        let identifier = identifier_at(proof, disclosed.sub_proof_index)?;
        let criteria = identifier_criteria(identifier)?;

        if !satisfies(&restrictions, &criteria) {
            return Err(Error::RestrictionMismatch {
                referent: referent.clone(),
            });
        }
    }

    Ok(())
}

/// An item passes iff its restriction-clause list is empty or at least one
/// clause is a subset of the derived criteria.
fn satisfies(restrictions: &[Restriction], criteria: &HashMap<String, String>) -> bool {
    restrictions.is_empty()
        || restrictions
            .iter()
            .any(|clause| clause.iter().all(|(key, value)| criteria.get(key) == Some(value)))
}

fn identifier_at(proof: &Proof, index: usize) -> Result<&Identifier> {
    proof.identifiers.get(index).ok_or_else(|| Error::FormatValidation {
        field: "sub_proof_index".to_string(),
        reason: format!("index {index} out of bounds for identifiers"),
    })
}

/// Derive the criteria mapping for one identifiers entry. Schema and
/// credential definition identifiers are colon-delimited; constituent
/// fields are taken by position from the end.
fn identifier_criteria(identifier: &Identifier) -> Result<HashMap<String, String>> {
    let schema_parts: Vec<&str> = identifier.schema_id.split(':').collect();
    if schema_parts.len() < 4 {
        return Err(Error::FormatValidation {
            field: "schema_id".to_string(),
            reason: format!("malformed schema identifier `{}`", identifier.schema_id),
        });
    }
    let cred_def_parts: Vec<&str> = identifier.cred_def_id.split(':').collect();
    if cred_def_parts.len() < 5 {
        return Err(Error::FormatValidation {
            field: "cred_def_id".to_string(),
            reason: format!("malformed credential definition identifier `{}`", identifier.cred_def_id),
        });
    }

    Ok(HashMap::from([
        ("schema_id".to_string(), identifier.schema_id.clone()),
        ("schema_issuer_did".to_string(), schema_parts[schema_parts.len() - 4].to_string()),
        ("schema_name".to_string(), schema_parts[schema_parts.len() - 2].to_string()),
        ("schema_version".to_string(), schema_parts[schema_parts.len() - 1].to_string()),
        ("cred_def_id".to_string(), identifier.cred_def_id.clone()),
        ("issuer_did".to_string(), cred_def_parts[cred_def_parts.len() - 5].to_string()),
    ]))
}
