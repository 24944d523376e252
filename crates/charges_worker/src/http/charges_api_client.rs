use crate::domain::{ApiClientError, ApiResponse, ChargesApiClient, InternalChargeApi};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use tracing::debug;

const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// [`ChargesApiClient`] over HTTP.
///
/// Upserts go to `PUT {base}/company/{company_number}/charge/{charge_id}/internal`,
/// deletes to `DELETE {base}/company/{company_number}/charges/{charge_id}`.
pub struct HttpChargesApiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpChargesApiClient {
    pub fn new(base_url: &str, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build charges api http client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn upsert_url(&self, company_number: &str, charge_id: &str) -> String {
        format!(
            "{}/company/{company_number}/charge/{charge_id}/internal",
            self.base_url
        )
    }

    fn delete_url(&self, company_number: &str, charge_id: &str) -> String {
        format!("{}/company/{company_number}/charges/{charge_id}", self.base_url)
    }

    async fn send(
        &self,
        request: RequestBuilder,
        context_id: &str,
    ) -> Result<ApiResponse, ApiClientError> {
        let response = request
            .header(reqwest::header::AUTHORIZATION, &self.api_key)
            .header(REQUEST_ID_HEADER, context_id)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ApiClientError::Timeout(e.to_string())
                } else {
                    ApiClientError::Transport(e.to_string())
                }
            })?;

        Ok(ApiResponse::new(response.status().as_u16()))
    }
}

#[async_trait]
impl ChargesApiClient for HttpChargesApiClient {
    async fn put_charge(
        &self,
        company_number: &str,
        charge_id: &str,
        payload: &InternalChargeApi,
        context_id: &str,
    ) -> Result<ApiResponse, ApiClientError> {
        let url = self.upsert_url(company_number, charge_id);
        let body = serde_json::to_vec(payload)?;
        debug!(url = %url, body_bytes = body.len(), "putting charge");

        let request = self
            .client
            .put(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        self.send(request, context_id).await
    }

    async fn delete_charge(
        &self,
        company_number: &str,
        charge_id: &str,
        context_id: &str,
    ) -> Result<ApiResponse, ApiClientError> {
        let url = self.delete_url(company_number, charge_id);
        debug!(url = %url, "deleting charge");

        self.send(self.client.delete(url), context_id).await
    }
}
