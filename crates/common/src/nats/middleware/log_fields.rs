use async_nats::HeaderMap;
use std::sync::Arc;

/// Header names the logging layers copy onto each log line
#[derive(Clone, Debug, Default)]
pub struct RecordedHeaders {
    names: Arc<[&'static str]>,
}

impl RecordedHeaders {
    pub fn new(names: &[&'static str]) -> Self {
        Self {
            names: names.into(),
        }
    }

    /// `name=value` for every recorded header the message carries, space separated
    pub fn render(&self, headers: Option<&HeaderMap>) -> String {
        let Some(headers) = headers else {
            return String::new();
        };
        self.names
            .iter()
            .filter_map(|name| {
                headers
                    .get(*name)
                    .map(|value| format!("{name}={}", value.as_str()))
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// `("charges-delta", "3")` for `charges-delta.3`; an undotted subject has no partition
pub fn split_partition(subject: &str) -> (&str, &str) {
    subject.rsplit_once('.').unwrap_or((subject, ""))
}
