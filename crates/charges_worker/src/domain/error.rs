use thiserror::Error;

/// Failures turning bytes on the wire into a [`DeltaEnvelope`](super::DeltaEnvelope) and back.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to decode delta envelope: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("failed to encode delta envelope: {0}")]
    Encode(#[from] prost::EncodeError),
}

/// A raw delta field that could not be normalised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} {value:?}: expected {expected}")]
pub struct NormaliseError {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

#[derive(Debug, Error)]
pub enum TransformError {
    /// Malformed input data; replaying the delta cannot fix it
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("failed to map {field}: {reason}")]
    Mapping { field: &'static str, reason: String },
}

impl TransformError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Mapping { .. })
    }

    pub(crate) fn invalid(field: &'static str, err: NormaliseError) -> Self {
        Self::InvalidField {
            field,
            reason: err.to_string(),
        }
    }
}

/// Transport level failures talking to the charges data API.
#[derive(Debug, Error)]
pub enum ApiClientError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("failed to serialise request body: {0}")]
    Serialise(#[from] serde_json::Error),
}

/// Every way processing a single charge delta can fail.
///
/// [`DeltaError::is_retryable`] decides whether the message goes back through
/// the retry channel or straight to the dead-letter channel.
#[derive(Debug, Error)]
pub enum DeltaError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("invalid delta payload: {0}")]
    InvalidPayload(String),

    #[error("charge delta contains no charge items")]
    NoChargeItems,

    #[error("delta is missing required identifier {0}")]
    MissingIdentifier(&'static str),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("charges data api rejected the request with status {0}")]
    ApiRejected(u16),

    #[error("charges data api responded with status {0}")]
    ApiUnavailable(u16),

    #[error("charges data api call failed: {0}")]
    ApiClient(#[from] ApiClientError),
}

impl DeltaError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Codec(_)
            | Self::InvalidPayload(_)
            | Self::NoChargeItems
            | Self::MissingIdentifier(_)
            | Self::ApiRejected(_) => false,
            Self::Transform(err) => err.is_retryable(),
            Self::ApiUnavailable(_) | Self::ApiClient(_) => true,
        }
    }
}

pub type DeltaResult<T> = Result<T, DeltaError>;

/// Map a charges data api status code onto the processing outcome.
///
/// 2xx succeeds, 400 and 409 are permanent rejections, anything else is
/// treated as a transient failure worth retrying.
pub fn classify_api_status(status: u16) -> DeltaResult<()> {
    match status {
        200..=299 => Ok(()),
        400 | 409 => Err(DeltaError::ApiRejected(status)),
        _ => Err(DeltaError::ApiUnavailable(status)),
    }
}
