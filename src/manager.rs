//! # Exchange Manager
//!
//! Orchestrates present-proof exchanges: resolves or constructs the exchange
//! record for each inbound message or local API call, delegates
//! format-specific work to the handler matching each attachment, applies the
//! state transition, and persists the record once per operation.
//!
//! The manager exclusively owns record mutation. Handlers derive data from
//! the record and return produced attachments; they never change state.
//!
//! Failure policy is "specific to us, vague to them": a failed create or
//! verify attempt abandons the record with the precise local cause and sends
//! the remote party a problem report carrying only a generic reason code.

use chrono::Utc;
use serde_json::Value;
use tracing::{instrument, warn};

use crate::error::{Error, Result};
use crate::format::anoncreds::AnonCredsHandler;
use crate::format::{Format, FormatHandler, RequestOverrides};
use crate::messages::{
    Ack, Attachment, MessageType, Presentation, PresentationBody, ProblemReport, Proposal,
    REASON_ABANDONED, Request, RequestBody,
};
use crate::provider::{Provider, Reply};
use crate::state::{ExchangeRecord, Initiator, Role, State};

/// Orchestrates presentation exchanges over an injected [`Provider`].
#[derive(Clone, Debug)]
pub struct ExchangeManager<P: Provider> {
    provider: P,
}

impl<P: Provider> ExchangeManager<P> {
    /// Create a manager backed by the given provider.
    pub const fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Create an exchange record for a self-authored proposal about to be
    /// sent (prover role).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSupportedFormat`] when no attachment matches a
    /// registered format, a validation error when a matched attachment is
    /// malformed, or [`Error::Storage`] when persistence fails. Nothing is
    /// persisted on failure.
    #[instrument(level = "debug", skip_all)]
    pub async fn create_exchange_for_proposal(
        &self, connection_id: Option<String>, proposal: Proposal, auto_present: bool,
    ) -> Result<ExchangeRecord> {
        validate_attachments(MessageType::Proposal, &proposal.attachments)?;

        let mut record = ExchangeRecord::new(
            connection_id,
            proposal.thread_id(),
            Initiator::Local,
            Role::Prover,
            State::ProposalSent,
        );
        record.auto_present = auto_present;
        record.proposal = Some(proposal);

        self.save(&mut record, "create proposal").await?;
        Ok(record)
    }

    /// Record an externally received proposal (verifier role).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSupportedFormat`] when no attachment matches a
    /// registered format, a validation error when a matched attachment is
    /// malformed, or [`Error::Storage`] when persistence fails.
    #[instrument(level = "debug", skip_all)]
    pub async fn receive_proposal(
        &self, connection_id: Option<String>, proposal: Proposal, auto_verify: bool,
    ) -> Result<ExchangeRecord> {
        validate_attachments(MessageType::Proposal, &proposal.attachments)?;

        let mut record = ExchangeRecord::new(
            connection_id,
            proposal.thread_id(),
            Initiator::External,
            Role::Verifier,
            State::ProposalReceived,
        );
        record.auto_verify = auto_verify;
        record.proposal = Some(proposal);

        self.save(&mut record, "receive proposal").await?;
        Ok(record)
    }

    /// Create a request bound to the record's received proposal, one
    /// attachment per format the proposal carried. The request confirms with
    /// an ack on successful verification.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSupportedFormat`] when the stored proposal carries
    /// no attachment for a registered format; nothing is persisted on
    /// failure.
    #[instrument(level = "debug", skip_all)]
    pub async fn create_bound_request(
        &self, record: &mut ExchangeRecord, overrides: Option<&RequestOverrides>,
    ) -> Result<Request> {
        let formats = record.proposal.as_ref().map_or_else(Vec::new, |p| {
            matched_formats(&p.attachments)
        });
        if formats.is_empty() {
            return Err(Error::NoSupportedFormat);
        }

        let mut attachments = Vec::new();
        for format in formats {
            let attachment = match format {
                Format::AnonCreds => AnonCredsHandler.create_bound_request(record, overrides)?,
            };
            attachments.push(attachment);
        }

        let body = RequestBody {
            will_confirm: true,
            ..RequestBody::default()
        };
        let request = Request::new(body, attachments).with_thread(record.thread_id.clone());

        record.request = Some(request.clone());
        record.state = State::RequestSent;
        self.save(record, "create bound request").await?;

        Ok(request)
    }

    /// Create an exchange record for a self-authored, free-standing request
    /// about to be sent (verifier role, no prior proposal).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSupportedFormat`] when no attachment matches a
    /// registered format, a validation error when a matched attachment is
    /// malformed, or [`Error::Storage`] when persistence fails.
    #[instrument(level = "debug", skip_all)]
    pub async fn create_exchange_for_request(
        &self, connection_id: Option<String>, request: Request, auto_verify: bool,
    ) -> Result<ExchangeRecord> {
        validate_attachments(MessageType::Request, &request.attachments)?;

        let mut record = ExchangeRecord::new(
            connection_id,
            request.thread_id(),
            Initiator::Local,
            Role::Verifier,
            State::RequestSent,
        );
        record.auto_verify = auto_verify;
        record.request = Some(request);

        self.save(&mut record, "create request").await?;
        Ok(record)
    }

    /// Record an externally received request (prover role). Covers both the
    /// bound case, where the request answers a proposal this party sent, and
    /// the free case, where the request starts the exchange.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSupportedFormat`] when no attachment matches a
    /// registered format, a validation error when a matched attachment is
    /// malformed, or [`Error::Storage`] when lookup or persistence fails.
    #[instrument(level = "debug", skip_all)]
    pub async fn receive_request(
        &self, connection_id: Option<String>, request: Request,
    ) -> Result<ExchangeRecord> {
        validate_attachments(MessageType::Request, &request.attachments)?;

        let mut record = match self
            .find(request.thread_id(), connection_id.as_deref())
            .await?
        {
            Some(record) => record,
            None => ExchangeRecord::new(
                connection_id,
                request.thread_id(),
                Initiator::External,
                Role::Prover,
                State::RequestReceived,
            ),
        };

        record.request = Some(request);
        record.state = State::RequestReceived;

        self.save(&mut record, "receive request").await?;
        Ok(record)
    }

    /// Build and record a presentation satisfying the record's stored
    /// request, from an explicit credential selection or one auto-resolved
    /// from the provider's wallet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSupportedFormat`] when the stored request carries
    /// no attachment for a registered format; the record is left untouched.
    /// Any other failure abandons the exchange and sends a problem report
    /// before the error is returned.
    #[instrument(level = "debug", skip_all)]
    pub async fn create_presentation(
        &self, record: &mut ExchangeRecord, selection: Option<&Value>,
    ) -> Result<Presentation> {
        let formats = record.request.as_ref().map_or_else(Vec::new, |r| {
            matched_formats(&r.attachments)
        });
        if formats.is_empty() {
            return Err(Error::NoSupportedFormat);
        }

        let mut attachments = Vec::new();
        for format in formats {
            let built = match format {
                Format::AnonCreds => {
                    AnonCredsHandler.create_presentation(&self.provider, record, selection).await
                }
            };
            match built {
                Ok(attachment) => attachments.push(attachment),
                Err(e) => {
                    self.fail(record, &e).await;
                    return Err(e);
                }
            }
        }

        let presentation = Presentation::new(PresentationBody::default(), attachments)
            .with_thread(record.thread_id.clone());

        record.presentation = Some(presentation.clone());
        record.state = State::PresentationSent;
        self.save(record, "create presentation").await?;

        Ok(presentation)
    }

    /// Record an externally received presentation, checking its disclosed
    /// data against the stored request before anything is persisted.
    ///
    /// Lookup falls back to thread-id-only when the connection filter yields
    /// nothing; a connection-less record adopts the connection id once known.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when no record matches the thread, or
    /// [`Error::NoSupportedFormat`] when no attachment matches a registered
    /// format; the record is left untouched. A restriction-check failure
    /// abandons the exchange and sends a problem report before the error is
    /// returned.
    #[instrument(level = "debug", skip_all)]
    pub async fn receive_presentation(
        &self, connection_id: Option<&str>, presentation: Presentation,
    ) -> Result<ExchangeRecord> {
        let mut record = self.retrieve(presentation.thread_id(), connection_id).await?;

        let formats = matched_formats(&presentation.attachments);
        if formats.is_empty() {
            return Err(Error::NoSupportedFormat);
        }

        for format in formats {
            let checked = match format {
                Format::AnonCreds => AnonCredsHandler.receive_presentation(&presentation, &record),
            };
            if let Err(e) = checked {
                self.fail(&mut record, &e).await;
                return Err(e);
            }
        }

        if record.connection_id.is_none() {
            record.connection_id = connection_id.map(ToString::to_string);
        }
        record.presentation = Some(presentation);
        record.state = State::PresentationReceived;

        self.save(&mut record, "receive presentation").await?;
        Ok(record)
    }

    /// Cryptographically verify the record's stored presentation and close
    /// the exchange. An ack is sent iff the stored request declared
    /// `will_confirm`; an ack that cannot be sent is logged, not raised.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSupportedFormat`] when the stored presentation
    /// carries no attachment for a registered format. A proof system failure
    /// abandons the exchange and sends a problem report before the error is
    /// returned.
    #[instrument(level = "debug", skip_all)]
    pub async fn verify_presentation(&self, record: &mut ExchangeRecord) -> Result<bool> {
        let formats = record.presentation.as_ref().map_or_else(Vec::new, |p| {
            matched_formats(&p.attachments)
        });
        if formats.is_empty() {
            return Err(Error::NoSupportedFormat);
        }

        let mut verified = true;
        for format in formats {
            let outcome = match format {
                Format::AnonCreds => {
                    AnonCredsHandler.verify_presentation(&self.provider, record).await
                }
            };
            match outcome {
                Ok(ok) => verified = verified && ok,
                Err(e) => {
                    self.fail(record, &e).await;
                    return Err(e);
                }
            }
        }

        record.set_verified(verified);
        record.state = State::Done;
        self.save(record, "verify presentation").await?;

        if record.request.as_ref().is_some_and(|r| r.body.will_confirm) {
            self.send_ack(record).await;
        }

        Ok(verified)
    }

    /// Send a presentation ack for the exchange. A send failure is logged,
    /// never raised.
    #[instrument(level = "debug", skip_all)]
    pub async fn send_ack(&self, record: &ExchangeRecord) {
        let ack = Ack::new(record.thread_id.clone());
        if let Err(e) =
            self.provider.send_reply(Reply::Ack(ack), record.connection_id.as_deref()).await
        {
            warn!("failed to send ack for thread {}: {e}", record.thread_id);
        }
    }

    /// Record an externally received presentation ack, closing the exchange.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when no record matches the thread, or
    /// [`Error::Storage`] when lookup or persistence fails.
    #[instrument(level = "debug", skip_all)]
    pub async fn receive_ack(
        &self, connection_id: Option<&str>, ack: &Ack,
    ) -> Result<ExchangeRecord> {
        let mut record = self.retrieve(&ack.thid, connection_id).await?;

        record.state = State::Done;
        self.save(&mut record, "receive ack").await?;
        Ok(record)
    }

    /// Record an externally received problem report, abandoning the
    /// exchange. Re-receiving a report for an already abandoned exchange is
    /// a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when no record matches the thread, or
    /// [`Error::Storage`] when lookup or persistence fails.
    #[instrument(level = "debug", skip_all)]
    pub async fn receive_problem_report(
        &self, connection_id: Option<&str>, report: &ProblemReport,
    ) -> Result<ExchangeRecord> {
        let mut record = self.retrieve(&report.thid, connection_id).await?;

        let reason = format!("{}: {}", report.description.code, report.description.en);
        if mark_abandoned(&mut record, reason) {
            self.save(&mut record, "receive problem report").await?;
        }
        Ok(record)
    }

    /// Abandon the exchange with the precise local cause. Idempotent: an
    /// already abandoned record is not written again. The save is
    /// best-effort; a persistence failure here is logged and deliberately
    /// discarded so the caller's original error is never masked.
    #[instrument(level = "debug", skip_all)]
    pub async fn abandon_exchange(&self, record: &mut ExchangeRecord, reason: impl Into<String>) {
        if !mark_abandoned(record, reason.into()) {
            return;
        }
        if let Err(e) = self.save(record, "abandon").await {
            warn!("failed to save abandoned state for thread {}: {e}", record.thread_id);
        }
    }

    /// Abandon the exchange and notify the remote party with a deliberately
    /// vague problem report. The precise cause stays in `error_message`.
    async fn fail(&self, record: &mut ExchangeRecord, error: &Error) {
        self.abandon_exchange(record, error.to_string()).await;

        let report = ProblemReport::new(
            record.thread_id.clone(),
            REASON_ABANDONED,
            "presentation exchange abandoned",
        );
        if let Err(e) = self
            .provider
            .send_reply(Reply::ProblemReport(report), record.connection_id.as_deref())
            .await
        {
            warn!("failed to send problem report for thread {}: {e}", record.thread_id);
        }
    }

    async fn save(&self, record: &mut ExchangeRecord, reason: &str) -> Result<()> {
        record.updated_at = Utc::now();
        self.provider.put(record, reason).await.map_err(|e| Error::Storage(e.to_string()))
    }

    async fn retrieve(
        &self, thread_id: &str, connection_id: Option<&str>,
    ) -> Result<ExchangeRecord> {
        self.find(thread_id, connection_id)
            .await?
            .ok_or_else(|| Error::NotFound(thread_id.to_string()))
    }

    /// Lookup by `(thread_id, connection_id)`, falling back to
    /// thread-id-only for connection-less exchanges.
    async fn find(
        &self, thread_id: &str, connection_id: Option<&str>,
    ) -> Result<Option<ExchangeRecord>> {
        let mut found = self
            .provider
            .get(thread_id, connection_id)
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;

        if found.is_none() && connection_id.is_some() {
            found = self
                .provider
                .get(thread_id, None)
                .await
                .map_err(|e| Error::Storage(e.to_string()))?;
        }

        Ok(found)
    }
}

/// Transition to `Abandoned` in memory. Returns false when the record is
/// already abandoned, so callers skip the redundant write.
fn mark_abandoned(record: &mut ExchangeRecord, reason: String) -> bool {
    if record.state == State::Abandoned {
        return false;
    }
    record.state = State::Abandoned;
    record.error_message = Some(reason);
    true
}

/// The distinct registered formats present among a message's attachments,
/// in attachment order.
fn matched_formats(attachments: &[Attachment]) -> Vec<Format> {
    let mut formats = Vec::new();
    for attachment in attachments {
        if let Some(format) = Format::from_identifier(&attachment.format) {
            if !formats.contains(&format) {
                formats.push(format);
            }
        }
    }
    formats
}

/// Structural validation of every matched attachment. At least one
/// attachment must match a registered format.
fn validate_attachments(message_type: MessageType, attachments: &[Attachment]) -> Result<()> {
    let mut matched = false;
    for attachment in attachments {
        let Some(format) = Format::from_identifier(&attachment.format) else {
            continue;
        };
        matched = true;

        let content = attachment.content().map_err(|e| Error::FormatValidation {
            field: "attachment".to_string(),
            reason: e.to_string(),
        })?;
        match format {
            Format::AnonCreds => AnonCredsHandler.validate_fields(message_type, &content)?,
        }
    }

    if matched { Ok(()) } else { Err(Error::NoSupportedFormat) }
}
