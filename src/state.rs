//! # Exchange State
//!
//! The persistent state of one present-proof exchange: identity, role,
//! protocol state, and snapshots of the three protocol messages. The record
//! is owned and mutated exclusively by the
//! [`ExchangeManager`](crate::manager::ExchangeManager); format handlers
//! only derive data from it.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::format::Format;
use crate::messages::{MessageType, Presentation, Proposal, Request};

/// Who initiated the exchange.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Initiator {
    /// The local party initiated the exchange.
    #[serde(rename = "self")]
    Local,

    /// The remote party initiated the exchange.
    External,
}

/// The local party's role in the exchange.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Responds to a presentation request with a presentation.
    Prover,

    /// Requests and verifies a presentation.
    Verifier,
}

/// Exchange protocol state. Transitions are append-only: no state is ever
/// re-entered except the terminal `Abandoned`, reachable from any
/// non-terminal state.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum State {
    /// A self-authored proposal has been sent.
    ProposalSent,

    /// An external proposal has been received.
    ProposalReceived,

    /// A request (bound or free) has been sent.
    RequestSent,

    /// An external request has been received.
    RequestReceived,

    /// A presentation has been created and sent.
    PresentationSent,

    /// A presentation has been received.
    PresentationReceived,

    /// The exchange completed successfully.
    Done,

    /// The exchange failed or was abandoned.
    Abandoned,
}

impl State {
    /// Whether the state is terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Abandoned)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ProposalSent => "proposal-sent",
            Self::ProposalReceived => "proposal-received",
            Self::RequestSent => "request-sent",
            Self::RequestReceived => "request-received",
            Self::PresentationSent => "presentation-sent",
            Self::PresentationReceived => "presentation-received",
            Self::Done => "done",
            Self::Abandoned => "abandoned",
        };
        write!(f, "{s}")
    }
}

/// Attachment content indexed by format api label, per stored message.
/// Derived from the message snapshots for inspection without re-parsing
/// attachments; never deserialized back into a record.
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct ByFormat {
    /// Proposal attachment content by format.
    pub proposal: HashMap<&'static str, Value>,

    /// Request attachment content by format.
    pub request: HashMap<&'static str, Value>,

    /// Presentation attachment content by format.
    pub presentation: HashMap<&'static str, Value>,
}

/// The persistent record of one presentation exchange.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ExchangeRecord {
    /// Record identifier, generated at creation.
    pub exchange_id: String,

    /// The connection this exchange occurs on. `None` for connection-less
    /// exchanges correlated only by thread id.
    pub connection_id: Option<String>,

    /// Correlates all messages of this exchange. Immutable once set.
    pub thread_id: String,

    /// Who initiated the exchange. Fixed at creation.
    pub initiator: Initiator,

    /// The local party's role. Fixed at creation.
    pub role: Role,

    /// Current protocol state.
    pub state: State,

    /// Snapshot of the proposal message, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposal: Option<Proposal>,

    /// Snapshot of the request message, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<Request>,

    /// Snapshot of the presentation message, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presentation: Option<Presentation>,

    /// Verification outcome: `"true"` or `"false"`. A string rather than a
    /// bool so it can serve as a storage tag; absent before verification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<String>,

    /// Prover policy: automatically present proof on receiving a request.
    /// Set at creation, never mutated.
    #[serde(default)]
    pub auto_present: bool,

    /// Verifier policy: automatically verify a received presentation.
    /// Set at creation, never mutated.
    #[serde(default)]
    pub auto_verify: bool,

    /// Populated only when entering the `Abandoned` state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// When the record was created.
    pub created_at: DateTime<Utc>,

    /// When the record was last saved.
    pub updated_at: DateTime<Utc>,
}

impl ExchangeRecord {
    /// Create a record for a new exchange.
    #[must_use]
    pub fn new(
        connection_id: Option<String>, thread_id: impl Into<String>, initiator: Initiator,
        role: Role, state: State,
    ) -> Self {
        let now = Utc::now();
        Self {
            exchange_id: Uuid::new_v4().to_string(),
            connection_id,
            thread_id: thread_id.into(),
            initiator,
            role,
            state,
            proposal: None,
            request: None,
            presentation: None,
            verified: None,
            auto_present: false,
            auto_verify: false,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The first attachment of the given message matching `format`, decoded.
    /// `None` when the message is absent, carries no matching attachment, or
    /// the attachment content cannot be decoded.
    #[must_use]
    pub fn attachment(&self, message_type: MessageType, format: Format) -> Option<Value> {
        let attachments = match message_type {
            MessageType::Proposal => &self.proposal.as_ref()?.attachments,
            MessageType::Request => &self.request.as_ref()?.attachments,
            MessageType::Presentation => &self.presentation.as_ref()?.attachments,
        };
        attachments
            .iter()
            .find(|a| Format::from_identifier(&a.format) == Some(format))
            .and_then(|a| a.content().ok())
    }

    /// Attachment content by format for proposal, request, and presentation.
    #[must_use]
    pub fn by_format(&self) -> ByFormat {
        let mut by_format = ByFormat::default();

        for (attachments, index) in [
            (self.proposal.as_ref().map(|m| &m.attachments), &mut by_format.proposal),
            (self.request.as_ref().map(|m| &m.attachments), &mut by_format.request),
            (self.presentation.as_ref().map(|m| &m.attachments), &mut by_format.presentation),
        ] {
            let Some(attachments) = attachments else {
                continue;
            };
            for attachment in attachments {
                let Some(format) = Format::from_identifier(&attachment.format) else {
                    continue;
                };
                if let Ok(content) = attachment.content() {
                    index.insert(format.api(), content);
                }
            }
        }

        by_format
    }

    /// Verification outcome as a bool, if verification has run.
    #[must_use]
    pub fn verified(&self) -> Option<bool> {
        self.verified.as_deref().map(|v| v == "true")
    }

    /// Record the verification outcome.
    pub fn set_verified(&mut self, verified: bool) {
        self.verified = Some(verified.to_string());
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::messages::{Attachment, RequestBody};

    fn sample_record() -> ExchangeRecord {
        let content = json!({
            "name": "proof-request",
            "version": "1.0",
            "nonce": "1234567890",
            "requested_attributes": {},
            "requested_predicates": {},
        });
        let attachment =
            Attachment::from_content("hlindy/proof-req@v3.0", &content).expect("should encode");
        let request = Request::new(
            RequestBody {
                will_confirm: true,
                ..RequestBody::default()
            },
            vec![attachment],
        );

        let mut record = ExchangeRecord::new(
            Some("conn-1".to_string()),
            request.thread_id(),
            Initiator::Local,
            Role::Verifier,
            State::RequestSent,
        );
        record.request = Some(request);
        record
    }

    #[test]
    fn serde_round_trip() {
        let record = sample_record();

        let ser = serde_json::to_string(&record).expect("should serialize");
        let de: ExchangeRecord = serde_json::from_str(&ser).expect("should deserialize");

        assert_eq!(de.state, record.state);
        assert_eq!(de.thread_id, record.thread_id);
        assert_eq!(de.proposal, record.proposal);
        assert_eq!(de.request, record.request);
        assert_eq!(de.presentation, record.presentation);
        assert_eq!(de, record);
    }

    #[test]
    fn state_wire_values() {
        let ser = serde_json::to_value(State::PresentationReceived).expect("should serialize");
        assert_eq!(ser, json!("presentation-received"));

        let de: State = serde_json::from_value(json!("abandoned")).expect("should deserialize");
        assert_eq!(de, State::Abandoned);
    }

    #[test]
    fn by_format_index() {
        let record = sample_record();
        let by_format = record.by_format();

        assert!(by_format.proposal.is_empty());
        assert_eq!(by_format.request["anoncreds"]["name"], "proof-request");
        assert_eq!(
            record.attachment(MessageType::Request, Format::AnonCreds).expect("has attachment")
                ["nonce"],
            "1234567890"
        );
    }
}
