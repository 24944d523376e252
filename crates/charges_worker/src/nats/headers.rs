use crate::domain::{DeltaMessage, MessageProvenance, RetryMetadata};
use async_nats::HeaderMap;
use chrono::{DateTime, Utc};
use common::nats::{ConsumeRequest, RecordedHeaders};

pub const RETRY_ATTEMPT_HEADER: &str = "delta-retry-attempt";
pub const ORIGINAL_TOPIC_HEADER: &str = "delta-original-topic";
pub const ORIGINAL_PARTITION_HEADER: &str = "delta-original-partition";
pub const ORIGINAL_OFFSET_HEADER: &str = "delta-original-offset";
/// Epoch milliseconds
pub const RETRY_DUE_AT_HEADER: &str = "delta-retry-due-at";
pub const FAILURE_REASON_HEADER: &str = "delta-failure-reason";

/// Headers the consume and publish logging layers put on each line
pub fn logged_headers() -> RecordedHeaders {
    RecordedHeaders::new(&[
        RETRY_ATTEMPT_HEADER,
        ORIGINAL_PARTITION_HEADER,
        ORIGINAL_OFFSET_HEADER,
        FAILURE_REASON_HEADER,
    ])
}

pub fn metadata_headers(metadata: &RetryMetadata) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(RETRY_ATTEMPT_HEADER, metadata.attempt.to_string().as_str());
    headers.insert(ORIGINAL_TOPIC_HEADER, metadata.original.topic.as_str());
    headers.insert(
        ORIGINAL_PARTITION_HEADER,
        metadata.original.partition.to_string().as_str(),
    );
    headers.insert(
        ORIGINAL_OFFSET_HEADER,
        metadata.original.offset.to_string().as_str(),
    );
    if let Some(due_at) = metadata.due_at {
        headers.insert(
            RETRY_DUE_AT_HEADER,
            due_at.timestamp_millis().to_string().as_str(),
        );
    }
    if let Some(reason) = &metadata.failure_reason {
        // header values are single line
        headers.insert(FAILURE_REASON_HEADER, reason.replace(['\r', '\n'], " ").as_str());
    }
    headers
}

/// Partition a message was published to, the last subject token.
///
/// Channel streams only accept `{channel}.{n}` subjects, so the 0 fallback
/// covers hand-built requests only.
pub fn subject_partition(request: &ConsumeRequest) -> u32 {
    request.subject_suffix().parse().unwrap_or(0)
}

pub fn retry_due_at(request: &ConsumeRequest) -> Option<DateTime<Utc>> {
    request
        .header(RETRY_DUE_AT_HEADER)
        .and_then(|v| v.trim().parse::<i64>().ok())
        .and_then(DateTime::from_timestamp_millis)
}

/// Build the domain view of a consumed message.
///
/// Retried messages carry their original position in headers; a first
/// delivery takes it from the subject and stream sequence.
pub fn delta_message(request: &ConsumeRequest, source_topic: &str) -> DeltaMessage {
    let partition = subject_partition(request);
    let parsed = |name: &str| request.header(name).and_then(|v| v.trim().parse().ok());

    let provenance = MessageProvenance {
        topic: request
            .header(ORIGINAL_TOPIC_HEADER)
            .map(str::to_string)
            .unwrap_or_else(|| source_topic.to_string()),
        partition: parsed(ORIGINAL_PARTITION_HEADER).unwrap_or(partition),
        offset: request
            .header(ORIGINAL_OFFSET_HEADER)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(request.stream_sequence),
    };

    DeltaMessage {
        payload: request.payload.clone(),
        provenance,
        attempt: parsed(RETRY_ATTEMPT_HEADER).filter(|a| *a >= 1).unwrap_or(1),
    }
}
