//! Shared in-memory provider for exchange scenario tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use anyhow::{Result, anyhow};
use present_proof::provider::{
    Credential, ExchangeStore, ProofHolder, ProofVerifier, Reply, Responder, VerificationData,
};
use present_proof::state::ExchangeRecord;
use serde_json::{Value, json};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

static INIT: Once = Once::new();

/// Install a fmt subscriber once so manager tracing shows in test output.
fn init_tracing() {
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_test_writer()
            .finish();
        tracing::subscriber::set_global_default(subscriber).expect("should set subscriber");
    });
}

/// In-memory provider tracking saves, sent replies, and verifier calls.
#[derive(Clone, Default)]
pub struct TestProvider {
    records: Arc<Mutex<Vec<ExchangeRecord>>>,
    saves: Arc<AtomicUsize>,
    fail_saves: Arc<AtomicBool>,
    replies: Arc<Mutex<Vec<Reply>>>,
    credentials: Arc<Mutex<Vec<Credential>>>,
    proof_content: Arc<Mutex<Value>>,
    verify_calls: Arc<AtomicUsize>,
}

impl TestProvider {
    pub fn new() -> Self {
        init_tracing();
        Self {
            proof_content: Arc::new(Mutex::new(json!({}))),
            ..Self::default()
        }
    }

    /// Wallet credentials returned by `list_credentials`.
    pub fn set_credentials(&self, credentials: Vec<Credential>) {
        *self.credentials.lock().expect("lock") = credentials;
    }

    /// Canned proof returned by `create_proof`.
    pub fn set_proof(&self, proof: Value) {
        *self.proof_content.lock().expect("lock") = proof;
    }

    /// Make every subsequent `put` fail.
    pub fn fail_saves(&self) {
        self.fail_saves.store(true, Ordering::SeqCst);
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    pub fn replies(&self) -> Vec<Reply> {
        self.replies.lock().expect("lock").clone()
    }

    /// The stored record for a thread, ignoring the connection filter.
    pub fn stored(&self, thread_id: &str) -> Option<ExchangeRecord> {
        self.records
            .lock()
            .expect("lock")
            .iter()
            .find(|r| r.thread_id == thread_id)
            .cloned()
    }
}

impl ExchangeStore for TestProvider {
    async fn get(
        &self, thread_id: &str, connection_id: Option<&str>,
    ) -> Result<Option<ExchangeRecord>> {
        let records = self.records.lock().expect("lock");
        Ok(records
            .iter()
            .find(|r| {
                r.thread_id == thread_id
                    && connection_id.is_none_or(|c| r.connection_id.as_deref() == Some(c))
            })
            .cloned())
    }

    async fn put(&self, record: &ExchangeRecord, _reason: &str) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(anyhow!("store unavailable"));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);

        let mut records = self.records.lock().expect("lock");
        if let Some(existing) = records.iter_mut().find(|r| r.exchange_id == record.exchange_id) {
            *existing = record.clone();
        } else {
            records.push(record.clone());
        }
        Ok(())
    }
}

impl ProofHolder for TestProvider {
    async fn list_credentials(
        &self, _proof_request: &Value, _referents: &[String],
    ) -> Result<Vec<Credential>> {
        Ok(self.credentials.lock().expect("lock").clone())
    }

    async fn create_proof(&self, _proof_request: &Value, _selection: &Value) -> Result<Value> {
        Ok(self.proof_content.lock().expect("lock").clone())
    }
}

impl ProofVerifier for TestProvider {
    async fn resolve_identifiers(
        &self, _identifiers: &[present_proof::format::anoncreds::types::Identifier],
    ) -> Result<VerificationData> {
        Ok(VerificationData::default())
    }

    async fn verify_proof(
        &self, _proof_request: &Value, _proof: &Value, _data: &VerificationData,
    ) -> Result<bool> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}

impl Responder for TestProvider {
    async fn send_reply(&self, reply: Reply, _connection_id: Option<&str>) -> Result<()> {
        self.replies.lock().expect("lock").push(reply);
        Ok(())
    }
}
