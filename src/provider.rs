//! # Provider
//!
//! Capabilities the exchange manager expects its host agent to supply:
//! durable record storage, wallet access for provers, proof verification
//! for verifiers, and outbound message delivery. Implementers provide each
//! trait; the [`Provider`] umbrella is implemented automatically.
//!
//! Provider methods return `anyhow::Result` so implementations are free to
//! surface their own error types; the exchange manager maps failures into
//! protocol errors at the call site.

use std::collections::HashMap;
use std::future::Future;

use anyhow::Result;
use serde_json::Value;

use crate::format::anoncreds::types::Identifier;
use crate::messages::{Ack, ProblemReport};
use crate::state::ExchangeRecord;

/// Issuer-published artifacts resolved for proof verification, keyed by
/// their ledger identifiers.
#[derive(Clone, Debug, Default)]
pub struct VerificationData {
    /// Schemas by schema id.
    pub schemas: HashMap<String, Value>,

    /// Credential definitions by credential definition id.
    pub cred_defs: HashMap<String, Value>,

    /// Revocation registry definitions by revocation registry id.
    pub rev_reg_defs: HashMap<String, Value>,

    /// Revocation registry entries by revocation registry id.
    pub rev_reg_entries: HashMap<String, Value>,
}

/// A wallet credential eligible for one or more proof request referents.
#[derive(Clone, Debug, Default)]
pub struct Credential {
    /// Wallet credential identifier.
    pub credential_id: String,

    /// Proof request referents this credential can satisfy.
    pub referents: Vec<String>,

    /// Attribute values held by the credential.
    pub attributes: HashMap<String, String>,
}

/// An outbound reply produced by the exchange manager.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    /// A presentation acknowledgement.
    Ack(Ack),

    /// A problem report.
    ProblemReport(ProblemReport),
}

/// Durable storage for exchange records.
///
/// Implementations are expected to index records so they are retrievable by
/// thread id with an optional connection filter, and to persist the record's
/// state as a queryable tag.
pub trait ExchangeStore: Send + Sync {
    /// Retrieve the record for a thread. When `connection_id` is given, only
    /// a record bound to that connection matches.
    fn get(
        &self, thread_id: &str, connection_id: Option<&str>,
    ) -> impl Future<Output = Result<Option<ExchangeRecord>>> + Send;

    /// Persist the record. `reason` describes the transition for audit
    /// purposes; implementations may ignore it.
    fn put(&self, record: &ExchangeRecord, reason: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Wallet capability used by provers to build presentations.
pub trait ProofHolder: Send + Sync {
    /// Wallet credentials eligible for the given proof request referents.
    fn list_credentials(
        &self, proof_request: &Value, referents: &[String],
    ) -> impl Future<Output = Result<Vec<Credential>>> + Send;

    /// Create a proof for the request from the selected credentials.
    fn create_proof(
        &self, proof_request: &Value, selection: &Value,
    ) -> impl Future<Output = Result<Value>> + Send;
}

/// Proof system capability used by verifiers.
pub trait ProofVerifier: Send + Sync {
    /// Resolve the issuer-published artifacts referenced by a proof's
    /// identifiers.
    fn resolve_identifiers(
        &self, identifiers: &[Identifier],
    ) -> impl Future<Output = Result<VerificationData>> + Send;

    /// Cryptographically verify a proof against its request and the
    /// resolved artifacts.
    fn verify_proof(
        &self, proof_request: &Value, proof: &Value, data: &VerificationData,
    ) -> impl Future<Output = Result<bool>> + Send;
}

/// Outbound delivery of protocol replies.
pub trait Responder: Send + Sync {
    /// Send a reply, over the given connection when one is bound.
    fn send_reply(
        &self, reply: Reply, connection_id: Option<&str>,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// The full capability set required by the exchange manager. Implemented
/// automatically for any type providing the component traits.
pub trait Provider: ExchangeStore + ProofHolder + ProofVerifier + Responder + Clone {}

impl<T: ExchangeStore + ProofHolder + ProofVerifier + Responder + Clone> Provider for T {}
