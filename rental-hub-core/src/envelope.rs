use crate::address::Address;
use crate::ontology::{Kind, Performative};
use crate::protocol::{Malformed, Message};

/// A message in flight between two agents.
///
/// `thread` identifies the conversation: replies echo the thread of the request
/// they answer and retries of a request reuse its thread.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub sender: Address,
    pub to: Address,
    pub performative: Performative,
    pub kind: Kind,
    pub thread: Option<u64>,
    pub body: String,
}

impl Envelope {
    /// Builds an `inform` envelope carrying `message`.
    pub fn inform(sender: Address, to: Address, message: &Message) -> Self {
        Self {
            sender,
            to,
            performative: Performative::Inform,
            kind: message.kind(),
            thread: None,
            body: message.encode_body(),
        }
    }

    #[must_use]
    pub fn with_thread(mut self, thread: u64) -> Self {
        self.thread = Some(thread);
        self
    }

    /// Builds an envelope from raw wire metadata, as delivered by an external
    /// transport.
    pub fn parse(
        sender: Address,
        to: Address,
        performative: &str,
        ontology: &str,
        thread: Option<u64>,
        body: impl Into<String>,
    ) -> Result<Self, Malformed> {
        Ok(Self {
            sender,
            to,
            performative: performative.parse()?,
            kind: ontology.parse()?,
            thread,
            body: body.into(),
        })
    }

    /// Decodes the body according to the envelope's kind.
    pub fn message(&self) -> Result<Message, Malformed> {
        Message::decode(self.kind, &self.body)
    }

    /// Builds the reply to this envelope, addressed back to its sender on the
    /// same thread.
    pub fn reply(&self, message: &Message) -> Self {
        Self {
            sender: self.to.clone(),
            to: self.sender.clone(),
            performative: Performative::Inform,
            kind: message.kind(),
            thread: self.thread,
            body: message.encode_body(),
        }
    }
}

/// Envelope filter, applied by every role before dispatching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    pub performative: Option<Performative>,
    pub kind: Option<Kind>,
}

impl Template {
    /// Accepts every `inform` envelope.
    pub const fn inform() -> Self {
        Self {
            performative: Some(Performative::Inform),
            kind: None,
        }
    }

    #[must_use]
    pub const fn with_kind(mut self, kind: Kind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn matches(&self, envelope: &Envelope) -> bool {
        self.performative.is_none_or(|p| p == envelope.performative)
            && self.kind.is_none_or(|k| k == envelope.kind)
    }
}
