use async_nats::HeaderMap;
use bytes::Bytes;

/// A single JetStream message, owned, on its way through a Tower stack.
#[derive(Debug, Clone)]
pub struct ConsumeRequest {
    /// Subject the message was published on
    pub subject: String,
    /// Raw message body
    pub payload: Bytes,
    /// Transport headers (retry bookkeeping, trace context)
    pub headers: Option<HeaderMap>,
    /// JetStream stream sequence, used as the message offset
    pub stream_sequence: u64,
}

impl ConsumeRequest {
    pub fn new(
        subject: String,
        payload: Bytes,
        headers: Option<HeaderMap>,
        stream_sequence: u64,
    ) -> Self {
        Self {
            subject,
            payload,
            headers,
            stream_sequence,
        }
    }

    /// Header value by name, if the message carries headers and the header is set
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .as_ref()
            .and_then(|h| h.get(name))
            .map(|v| v.as_str())
    }

    /// Last dot-separated token of the subject
    pub fn subject_suffix(&self) -> &str {
        self.subject.rsplit('.').next().unwrap_or_default()
    }
}

/// Whether the consumer should commit (ack) the message or leave it for redelivery (nak).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeResponse {
    Ack,
    Nak(Option<String>),
}

impl ConsumeResponse {
    pub fn ack() -> Self {
        Self::Ack
    }

    pub fn nak(reason: impl Into<String>) -> Self {
        Self::Nak(Some(reason.into()))
    }

    pub fn is_ack(&self) -> bool {
        matches!(self, Self::Ack)
    }

    pub fn is_nak(&self) -> bool {
        matches!(self, Self::Nak(_))
    }
}
