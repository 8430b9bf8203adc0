//! # Messages
//!
//! Protocol messages for the present-proof exchange: proposal, request,
//! presentation, ack, and problem report. Wire transport and envelope
//! encryption are owned by the surrounding agent framework; these types
//! model the abstracted payloads only.
//!
//! Every message carries a thread correlation field (`thid`) linking all
//! messages of one exchange. A message without an explicit `thid` starts a
//! new thread identified by its own message id.

use anyhow::{Context, Result, anyhow};
use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Message type identifier for a presentation proposal.
pub const PROPOSE_PRESENTATION: &str = "present-proof/3.0/propose-presentation";

/// Message type identifier for a presentation request.
pub const REQUEST_PRESENTATION: &str = "present-proof/3.0/request-presentation";

/// Message type identifier for a presentation.
pub const PRESENTATION: &str = "present-proof/3.0/presentation";

/// Message type identifier for a presentation ack.
pub const ACK: &str = "present-proof/3.0/ack";

/// Message type identifier for a presentation problem report.
pub const PROBLEM_REPORT: &str = "present-proof/3.0/problem-report";

/// The attachment-bearing message types of the exchange. Used by format
/// handlers to select the format identifier and validation schema for an
/// attachment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageType {
    /// A presentation proposal.
    Proposal,

    /// A presentation request.
    Request,

    /// A presentation.
    Presentation,
}

impl MessageType {
    /// The protocol message type identifier.
    #[must_use]
    pub const fn identifier(self) -> &'static str {
        match self {
            Self::Proposal => PROPOSE_PRESENTATION,
            Self::Request => REQUEST_PRESENTATION,
            Self::Presentation => PRESENTATION,
        }
    }
}

/// A format-tagged attachment. Content is opaque to the exchange manager:
/// the format identifier selects the handler that understands it.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Attachment {
    /// Attachment identifier.
    pub id: String,

    /// Attachment format identifier, e.g. `hlindy/proof-req@v3.0`.
    pub format: String,

    /// Base64url-encoded JSON content.
    pub data: String,
}

impl Attachment {
    /// Create an attachment from JSON content, base64url-encoding it for
    /// transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be serialized.
    pub fn from_content(format: impl Into<String>, content: &Value) -> Result<Self> {
        let bytes = serde_json::to_vec(content).context("serializing attachment content")?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            format: format.into(),
            data: Base64UrlUnpadded::encode_string(&bytes),
        })
    }

    /// Decode the attachment's JSON content.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is not base64url-encoded JSON.
    pub fn content(&self) -> Result<Value> {
        let bytes = Base64UrlUnpadded::decode_vec(&self.data)
            .map_err(|e| anyhow!("decoding attachment data: {e}"))?;
        serde_json::from_slice(&bytes).context("parsing attachment content")
    }
}

/// Body of a presentation proposal.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProposalBody {
    /// Goal code indicating the purpose of the proposal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal_code: Option<String>,

    /// Human-readable comment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// A presentation proposal: the prover's offer to present claims derived
/// from one or more credentials.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Proposal {
    /// Message identifier.
    pub id: String,

    /// Thread correlation identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thid: Option<String>,

    /// Message body.
    pub body: ProposalBody,

    /// One attachment per proposed format.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl Proposal {
    /// Create a proposal carrying the provided attachments.
    #[must_use]
    pub fn new(body: ProposalBody, attachments: Vec<Attachment>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            thid: None,
            body,
            attachments,
        }
    }

    /// The thread this message belongs to: the explicit `thid`, or the
    /// message id when the message starts the thread.
    #[must_use]
    pub fn thread_id(&self) -> &str {
        self.thid.as_deref().unwrap_or(&self.id)
    }
}

/// Body of a presentation request.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct RequestBody {
    /// Goal code indicating the purpose of the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal_code: Option<String>,

    /// Human-readable comment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// Whether the verifier will send an ack on successful verification.
    #[serde(default)]
    pub will_confirm: bool,
}

/// A presentation request: the verifier's demand for disclosure of claims.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Request {
    /// Message identifier.
    pub id: String,

    /// Thread correlation identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thid: Option<String>,

    /// Message body.
    pub body: RequestBody,

    /// One attachment per acceptable format.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl Request {
    /// Create a request carrying the provided attachments.
    #[must_use]
    pub fn new(body: RequestBody, attachments: Vec<Attachment>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            thid: None,
            body,
            attachments,
        }
    }

    /// Bind this request to an existing thread.
    #[must_use]
    pub fn with_thread(mut self, thid: impl Into<String>) -> Self {
        self.thid = Some(thid.into());
        self
    }

    /// The thread this message belongs to.
    #[must_use]
    pub fn thread_id(&self) -> &str {
        self.thid.as_deref().unwrap_or(&self.id)
    }
}

/// Body of a presentation.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PresentationBody {
    /// Goal code indicating the purpose of the presentation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal_code: Option<String>,

    /// Human-readable comment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// A presentation: the prover's cryptographic response to a request.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Presentation {
    /// Message identifier.
    pub id: String,

    /// Thread correlation identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thid: Option<String>,

    /// Message body.
    pub body: PresentationBody,

    /// One attachment per presented format.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl Presentation {
    /// Create a presentation carrying the provided attachments.
    #[must_use]
    pub fn new(body: PresentationBody, attachments: Vec<Attachment>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            thid: None,
            body,
            attachments,
        }
    }

    /// Bind this presentation to an existing thread.
    #[must_use]
    pub fn with_thread(mut self, thid: impl Into<String>) -> Self {
        self.thid = Some(thid.into());
        self
    }

    /// The thread this message belongs to.
    #[must_use]
    pub fn thread_id(&self) -> &str {
        self.thid.as_deref().unwrap_or(&self.id)
    }
}

/// Acknowledgement of presentation receipt and verification.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Ack {
    /// Message identifier.
    pub id: String,

    /// Thread correlation identifier.
    pub thid: String,

    /// Ack status.
    pub status: String,
}

impl Ack {
    /// Create an `OK` ack for the given thread.
    #[must_use]
    pub fn new(thid: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            thid: thid.into(),
            status: "OK".to_string(),
        }
    }
}

/// Outbound problem report reason code: deliberately vague so the remote
/// party learns nothing about the precise local cause.
pub const REASON_ABANDONED: &str = "abandoned";

/// Machine- and human-readable description of a problem.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProblemDescription {
    /// Machine-readable reason code.
    pub code: String,

    /// Human-readable description (English).
    pub en: String,
}

/// Terminal-state message reporting failure of the exchange.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProblemReport {
    /// Message identifier.
    pub id: String,

    /// Thread correlation identifier.
    pub thid: String,

    /// Failure description.
    pub description: ProblemDescription,
}

impl ProblemReport {
    /// Create a problem report for the given thread.
    #[must_use]
    pub fn new(thid: impl Into<String>, code: impl Into<String>, en: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            thid: thid.into(),
            description: ProblemDescription {
                code: code.into(),
                en: en.into(),
            },
        }
    }
}
