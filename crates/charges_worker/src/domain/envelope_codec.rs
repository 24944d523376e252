use super::CodecError;
use bytes::{Bytes, BytesMut};
use prost::Message;

/// Envelope every charges delta arrives in.
///
/// `data` holds the delta JSON; `context_id` is the upstream correlation id
/// and may be blank.
#[derive(Clone, PartialEq, Message)]
pub struct DeltaEnvelope {
    #[prost(string, tag = "1")]
    pub data: String,
    #[prost(string, tag = "2")]
    pub context_id: String,
    #[prost(int32, tag = "3")]
    pub attempt: i32,
    #[prost(bool, tag = "4")]
    pub is_delete: bool,
}

impl DeltaEnvelope {
    pub fn upsert(data: impl Into<String>, context_id: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            context_id: context_id.into(),
            attempt: 0,
            is_delete: false,
        }
    }

    pub fn delete(data: impl Into<String>, context_id: impl Into<String>) -> Self {
        Self {
            is_delete: true,
            ..Self::upsert(data, context_id)
        }
    }
}

/// Anything the worker writes to a channel
#[derive(Debug, Clone)]
pub enum OutboundPayload {
    /// Bytes forwarded untouched, e.g. a delta moving to the retry channel
    Raw(Bytes),
    Delta(DeltaEnvelope),
    Text(String),
}

pub fn decode_delta(bytes: &[u8]) -> Result<DeltaEnvelope, CodecError> {
    Ok(DeltaEnvelope::decode(bytes)?)
}

pub fn encode_payload(payload: &OutboundPayload) -> Result<Bytes, CodecError> {
    match payload {
        OutboundPayload::Raw(bytes) => Ok(bytes.clone()),
        OutboundPayload::Text(text) => Ok(Bytes::copy_from_slice(text.as_bytes())),
        OutboundPayload::Delta(envelope) => {
            let mut buf = BytesMut::with_capacity(envelope.encoded_len());
            envelope.encode(&mut buf)?;
            Ok(buf.freeze())
        }
    }
}
