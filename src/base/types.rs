use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type Err = anyhow::Error;
pub type Res<T> = Result<T, Err>;
pub type Void = Res<()>;

/// Messenger a user message arrived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Messenger {
    Telegram,
    Signal,
    Web,
}

/// Kind of channel an outbound message targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    User,
    Staff,
}

/// A single user message entering the triage pipeline.  Immutable per invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub user_id: String,
    pub display_name: String,
    pub text: String,
    pub language_code: Option<String>,
    pub messenger: Messenger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Open,
    Closed,
}

/// A persisted conversation thread between a user and staff.
///
/// Owned by the ticket store; the orchestrator reads it and conditionally
/// creates or updates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: u64,
    pub user_id: String,
    pub messenger: Messenger,
    pub status: TicketStatus,
    pub auto_replied: bool,
    pub created_at: DateTime<Utc>,
}

/// Terminal outcome of one pass through the triage pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TriageOutcome {
    /// The spam guard rejected the message.
    Rejected,
    /// A FAQ entry answered the message.
    FaqAnswered,
    /// The knowledge responder answered the message.
    LlmAnswered,
    /// The message was forwarded to staff under a ticket.
    TicketForwarded { ticket_id: u64 },
}
