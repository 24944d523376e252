use super::{ApiClientError, InternalChargeApi};
use async_trait::async_trait;

/// Status returned by the charges data api; classification happens in the processor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
}

impl ApiResponse {
    pub fn new(status: u16) -> Self {
        Self { status }
    }
}

/// Downstream store for charges.
///
/// Implementations only fail on transport problems; any HTTP status, 5xx
/// included, comes back as an [`ApiResponse`].
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ChargesApiClient: Send + Sync {
    async fn put_charge(
        &self,
        company_number: &str,
        charge_id: &str,
        payload: &InternalChargeApi,
        context_id: &str,
    ) -> Result<ApiResponse, ApiClientError>;

    async fn delete_charge(
        &self,
        company_number: &str,
        charge_id: &str,
        context_id: &str,
    ) -> Result<ApiResponse, ApiClientError>;
}
