use super::{
    classify_api_status, non_blank, ChargeTransformer, ChargesApiClient, ChargesDeleteDelta,
    ChargesDelta, DeltaEnvelope, DeltaError, DeltaResult, IdentifierEncoder,
};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Company number the charges data api expects on delete requests
pub const DELETE_TENANT: &str = "0";

/// Position of a message in its source channel.
///
/// Displays as `{topic}-{partition}-{offset}`, the form stored as `updated_by`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageProvenance {
    pub topic: String,
    pub partition: u32,
    pub offset: u64,
}

impl MessageProvenance {
    pub fn new(topic: impl Into<String>, partition: u32, offset: u64) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
        }
    }
}

impl fmt::Display for MessageProvenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.topic, self.partition, self.offset)
    }
}

#[derive(Debug, Clone)]
pub struct DeltaContext {
    /// Correlation id forwarded to the api as the request id
    pub context_id: String,
    pub provenance: MessageProvenance,
    pub attempt: u32,
}

impl DeltaContext {
    /// A blank upstream context id is replaced with a fresh one
    pub fn new(context_id: &str, provenance: MessageProvenance, attempt: u32) -> Self {
        let context_id = match non_blank(Some(context_id)) {
            Some(id) => id.to_string(),
            None => xid::new().to_string(),
        };
        Self {
            context_id,
            provenance,
            attempt,
        }
    }
}

/// Applies one decoded delta to the charges data api
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DeltaProcessor: Send + Sync {
    async fn process(&self, envelope: &DeltaEnvelope, context: &DeltaContext) -> DeltaResult<()>;
}

pub struct ChargeDeltaProcessor {
    transformer: Arc<dyn ChargeTransformer>,
    encoder: IdentifierEncoder,
    api_client: Arc<dyn ChargesApiClient>,
}

impl ChargeDeltaProcessor {
    pub fn new(
        transformer: Arc<dyn ChargeTransformer>,
        encoder: IdentifierEncoder,
        api_client: Arc<dyn ChargesApiClient>,
    ) -> Self {
        Self {
            transformer,
            encoder,
            api_client,
        }
    }

    async fn process_upsert(&self, data: &str, context: &DeltaContext) -> DeltaResult<()> {
        let delta: ChargesDelta =
            serde_json::from_str(data).map_err(|e| DeltaError::InvalidPayload(e.to_string()))?;

        let Some(charge) = delta.charges.first() else {
            warn!("charge delta has no charge items, skipping");
            return Err(DeltaError::NoChargeItems);
        };
        if delta.charges.len() > 1 {
            warn!(
                charge_count = delta.charges.len(),
                "charge delta has more than one charge, only the first is processed"
            );
        }

        if non_blank(charge.id.as_deref()).is_none() {
            return Err(DeltaError::MissingIdentifier("id"));
        }
        let Some(company_number) = non_blank(charge.company_number.as_deref()) else {
            return Err(DeltaError::MissingIdentifier("company_number"));
        };

        let payload = self.transformer.transform(
            charge,
            delta.delta_at.clone(),
            &context.provenance.to_string(),
        )?;
        let charge_id = payload.external_data.id.clone();
        debug!(company_number, charge_id = %charge_id, "charge delta transformed");

        let response = self
            .api_client
            .put_charge(company_number, &charge_id, &payload, &context.context_id)
            .await?;
        debug!(status = response.status, "charge upsert dispatched");

        classify_api_status(response.status)
    }

    async fn process_delete(&self, data: &str, context: &DeltaContext) -> DeltaResult<()> {
        let delta: ChargesDeleteDelta =
            serde_json::from_str(data).map_err(|e| DeltaError::InvalidPayload(e.to_string()))?;

        let Some(raw_id) = non_blank(delta.charges_id.as_deref()) else {
            return Err(DeltaError::MissingIdentifier("charges_id"));
        };
        let charge_id = self.encoder.encode_charge_id(raw_id);

        let response = self
            .api_client
            .delete_charge(DELETE_TENANT, &charge_id, &context.context_id)
            .await?;
        debug!(charge_id = %charge_id, status = response.status, "charge delete dispatched");

        classify_api_status(response.status)
    }
}

#[async_trait]
impl DeltaProcessor for ChargeDeltaProcessor {
    #[instrument(
        skip_all,
        fields(
            context_id = %context.context_id,
            updated_by = %context.provenance,
            attempt = context.attempt,
            is_delete = envelope.is_delete,
        )
    )]
    async fn process(&self, envelope: &DeltaEnvelope, context: &DeltaContext) -> DeltaResult<()> {
        debug!(payload_bytes = envelope.data.len(), "processing charge delta");

        if envelope.is_delete {
            self.process_delete(&envelope.data, context).await
        } else {
            self.process_upsert(&envelope.data, context).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ApiClientError, ApiResponse, DeltaChargeTransformer, InternalChargeApi,
        MockChargeTransformer, MockChargesApiClient, TransformError,
    };
    use serde_json::json;

    const CHARGE_ID: &str = "2e6X44GGkwsvYqCd5HF6a42mWZs=";

    fn encoder() -> IdentifierEncoder {
        IdentifierEncoder::new("sometest", "sometest2").unwrap()
    }

    fn processor(api_client: MockChargesApiClient) -> ChargeDeltaProcessor {
        ChargeDeltaProcessor::new(
            Arc::new(DeltaChargeTransformer::new(encoder())),
            encoder(),
            Arc::new(api_client),
        )
    }

    fn context() -> DeltaContext {
        DeltaContext::new(
            "context_id",
            MessageProvenance::new("charges-delta", 0, 42),
            1,
        )
    }

    fn upsert_envelope() -> DeltaEnvelope {
        let data = json!({
            "charges": [{
                "id": "3000117455",
                "company_number": "01099198",
                "status": "0",
                "type": "LEGAL CHARGE",
                "trans_id": "3000117455",
                "notice_type": "MR01",
                "delivered_on": "20130206",
            }],
            "delta_at": "20230724093435661593",
        });
        DeltaEnvelope::upsert(data.to_string(), "context_id")
    }

    #[test]
    fn test_provenance_display() {
        assert_eq!(
            MessageProvenance::new("charges-delta", 3, 1207).to_string(),
            "charges-delta-3-1207"
        );
    }

    #[test]
    fn test_blank_context_id_is_generated() {
        let ctx = DeltaContext::new("  ", MessageProvenance::new("charges-delta", 0, 1), 1);
        assert!(!ctx.context_id.trim().is_empty());
        assert_ne!(ctx.context_id, "  ");

        assert_eq!(context().context_id, "context_id");
    }

    #[tokio::test]
    async fn test_upsert_puts_transformed_charge() {
        // Arrange
        let mut api_client = MockChargesApiClient::new();
        api_client
            .expect_put_charge()
            .withf(
                |company: &str, id: &str, payload: &InternalChargeApi, context_id: &str| {
                    company == "01099198"
                        && id == CHARGE_ID
                        && payload.internal_data.updated_by == "charges-delta-0-42"
                        && payload.external_data.links.self_link
                            == format!("/company/01099198/charges/{CHARGE_ID}")
                        && context_id == "context_id"
                },
            )
            .times(1)
            .returning(|_, _, _, _| Ok(ApiResponse::new(200)));

        // Act
        let result = processor(api_client)
            .process(&upsert_envelope(), &context())
            .await;

        // Assert
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_upsert_reprocessing_sends_identical_payload() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let recorded = seen.clone();

        let mut api_client = MockChargesApiClient::new();
        api_client
            .expect_put_charge()
            .times(2)
            .returning(move |_, _, payload, _| {
                recorded.lock().unwrap().push(payload.clone());
                Ok(ApiResponse::new(200))
            });

        let processor = processor(api_client);
        processor.process(&upsert_envelope(), &context()).await.unwrap();
        processor.process(&upsert_envelope(), &context()).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0], seen[1]);
    }

    #[tokio::test]
    async fn test_empty_charges_never_calls_api() {
        let mut api_client = MockChargesApiClient::new();
        api_client.expect_put_charge().times(0);

        let envelope = DeltaEnvelope::upsert(
            json!({"charges": [], "delta_at": "20230724093435661593"}).to_string(),
            "context_id",
        );
        let err = processor(api_client)
            .process(&envelope, &context())
            .await
            .unwrap_err();

        assert!(matches!(err, DeltaError::NoChargeItems));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_missing_charge_id_never_calls_api() {
        let mut api_client = MockChargesApiClient::new();
        api_client.expect_put_charge().times(0);

        let envelope = DeltaEnvelope::upsert(
            json!({"charges": [{"company_number": "01099198"}]}).to_string(),
            "context_id",
        );
        let err = processor(api_client)
            .process(&envelope, &context())
            .await
            .unwrap_err();

        assert!(matches!(err, DeltaError::MissingIdentifier("id")));
    }

    #[tokio::test]
    async fn test_malformed_json_is_not_retryable() {
        let api_client = MockChargesApiClient::new();

        let envelope = DeltaEnvelope::upsert("{not json", "context_id");
        let err = processor(api_client)
            .process(&envelope, &context())
            .await
            .unwrap_err();

        assert!(matches!(err, DeltaError::InvalidPayload(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_api_status_classification() {
        for (status, retryable) in [
            (400, false),
            (409, false),
            (401, true),
            (404, true),
            (500, true),
            (503, true),
        ] {
            let mut api_client = MockChargesApiClient::new();
            api_client
                .expect_put_charge()
                .times(1)
                .returning(move |_, _, _, _| Ok(ApiResponse::new(status)));

            let err = processor(api_client)
                .process(&upsert_envelope(), &context())
                .await
                .unwrap_err();

            assert_eq!(err.is_retryable(), retryable, "status {status}");
        }
    }

    #[tokio::test]
    async fn test_transport_failure_is_retryable() {
        let mut api_client = MockChargesApiClient::new();
        api_client
            .expect_put_charge()
            .times(1)
            .returning(|_, _, _, _| Err(ApiClientError::Timeout("10s elapsed".to_string())));

        let err = processor(api_client)
            .process(&upsert_envelope(), &context())
            .await
            .unwrap_err();

        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_transform_failure_skips_api_call() {
        let mut transformer = MockChargeTransformer::new();
        transformer.expect_transform().times(1).returning(|_, _, _| {
            Err(TransformError::Mapping {
                field: "trans_id",
                reason: "\"ABC\" is not numeric".to_string(),
            })
        });
        let mut api_client = MockChargesApiClient::new();
        api_client.expect_put_charge().times(0);

        let processor =
            ChargeDeltaProcessor::new(Arc::new(transformer), encoder(), Arc::new(api_client));
        let err = processor
            .process(&upsert_envelope(), &context())
            .await
            .unwrap_err();

        assert!(matches!(err, DeltaError::Transform(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_delete_uses_tenant_and_encoded_id() {
        let mut api_client = MockChargesApiClient::new();
        api_client
            .expect_delete_charge()
            .withf(|company: &str, id: &str, context_id: &str| {
                company == DELETE_TENANT && id == CHARGE_ID && context_id == "context_id"
            })
            .times(1)
            .returning(|_, _, _| Ok(ApiResponse::new(200)));

        let envelope = DeltaEnvelope::delete(
            json!({"charges_id": "3000117455", "delta_at": "20230724093435661593"}).to_string(),
            "context_id",
        );

        assert!(processor(api_client)
            .process(&envelope, &context())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_delete_without_id_never_calls_api() {
        let mut api_client = MockChargesApiClient::new();
        api_client.expect_delete_charge().times(0);

        let envelope = DeltaEnvelope::delete(json!({"charges_id": ""}).to_string(), "context_id");
        let err = processor(api_client)
            .process(&envelope, &context())
            .await
            .unwrap_err();

        assert!(matches!(err, DeltaError::MissingIdentifier("charges_id")));
    }

    fn delete_envelope() -> DeltaEnvelope {
        DeltaEnvelope::delete(
            json!({"charges_id": "3000117455", "delta_at": "20230724093435661593"}).to_string(),
            "context_id",
        )
    }

    #[tokio::test]
    async fn test_delete_api_status_classification() {
        for (status, retryable) in [
            (400, false),
            (409, false),
            (401, true),
            (404, true),
            (500, true),
        ] {
            let mut api_client = MockChargesApiClient::new();
            api_client
                .expect_delete_charge()
                .times(1)
                .returning(move |_, _, _| Ok(ApiResponse::new(status)));

            let err = processor(api_client)
                .process(&delete_envelope(), &context())
                .await
                .unwrap_err();

            assert_eq!(err.is_retryable(), retryable, "status {status}");
        }
    }

    #[tokio::test]
    async fn test_delete_success_statuses() {
        for status in [200, 204] {
            let mut api_client = MockChargesApiClient::new();
            api_client
                .expect_delete_charge()
                .times(1)
                .returning(move |_, _, _| Ok(ApiResponse::new(status)));

            assert!(processor(api_client)
                .process(&delete_envelope(), &context())
                .await
                .is_ok());
        }
    }

    #[tokio::test]
    async fn test_malformed_delete_json_is_not_retryable() {
        let mut api_client = MockChargesApiClient::new();
        api_client.expect_delete_charge().times(0);

        let envelope = DeltaEnvelope::delete("{\"charges_id\": ", "context_id");
        let err = processor(api_client)
            .process(&envelope, &context())
            .await
            .unwrap_err();

        assert!(matches!(err, DeltaError::InvalidPayload(_)));
        assert!(!err.is_retryable());
    }
}
