use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use giftlist_core::{EntityDiff, EntityId};

use crate::{
    JobId, OperationReport, ServiceError, ServiceErrorKind, StatusReport, UniformOperation,
};

/// Remote boundary for the metadata scraper. Transport-agnostic; the HTTP
/// implementation below is one choice, tests provide scripted ones.
#[async_trait::async_trait]
pub trait MetadataService: Send + Sync {
    async fn start_job(&self, input: &str) -> Result<JobId, ServiceError>;
    async fn get_job_status(&self, job_id: &JobId) -> Result<StatusReport, ServiceError>;
    /// Best-effort; returns whether the service acknowledged the cancel.
    async fn cancel_job(&self, job_id: &JobId) -> Result<bool, ServiceError>;
}

/// Remote boundary for wishlist mutations.
#[async_trait::async_trait]
pub trait WishlistService: Send + Sync {
    /// Submits one batched field-edit mutation; returns the number of
    /// entities the service updated.
    async fn submit_field_edits(&self, diff: &[EntityDiff]) -> Result<u64, ServiceError>;
    async fn submit_uniform_operation(
        &self,
        operation: UniformOperation,
        ids: &[EntityId],
        payload: &Value,
    ) -> Result<OperationReport, ServiceError>;
}

/// Connection settings shared by the HTTP service implementations.
///
/// `request_timeout` bounds every individual call; the job-level attempt
/// ceiling lives in the backoff schedule, not here.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub base_url: Url,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl ServiceSettings {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

fn build_client(settings: &ServiceSettings) -> Result<reqwest::Client, ServiceError> {
    reqwest::Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .build()
        .map_err(|err| ServiceError::new(ServiceErrorKind::Network, err.to_string()))
}

fn endpoint(settings: &ServiceSettings, path: &str) -> Result<Url, ServiceError> {
    settings
        .base_url
        .join(path)
        .map_err(|err| ServiceError::new(ServiceErrorKind::Protocol, err.to_string()))
}

fn map_transport_error(err: reqwest::Error) -> ServiceError {
    if err.is_timeout() {
        return ServiceError::new(ServiceErrorKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return ServiceError::new(ServiceErrorKind::Protocol, err.to_string());
    }
    ServiceError::new(ServiceErrorKind::Network, err.to_string())
}

async fn decode_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, ServiceError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ServiceError::new(
            ServiceErrorKind::HttpStatus(status.as_u16()),
            status.to_string(),
        ));
    }
    response.json::<T>().await.map_err(map_transport_error)
}

/// JSON/HTTP metadata service client.
#[derive(Debug, Clone)]
pub struct HttpMetadataService {
    settings: ServiceSettings,
    client: reqwest::Client,
}

impl HttpMetadataService {
    pub fn new(settings: ServiceSettings) -> Result<Self, ServiceError> {
        let client = build_client(&settings)?;
        Ok(Self { settings, client })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartReply {
    job_id: JobId,
}

#[derive(Deserialize)]
struct CancelReply {
    acknowledged: bool,
}

#[async_trait::async_trait]
impl MetadataService for HttpMetadataService {
    async fn start_job(&self, input: &str) -> Result<JobId, ServiceError> {
        let url = endpoint(&self.settings, "metadata/jobs")?;
        let response = self
            .client
            .post(url)
            .json(&json!({ "input": input }))
            .send()
            .await
            .map_err(map_transport_error)?;
        let reply: StartReply = decode_json(response).await?;
        Ok(reply.job_id)
    }

    async fn get_job_status(&self, job_id: &JobId) -> Result<StatusReport, ServiceError> {
        let url = endpoint(&self.settings, &format!("metadata/jobs/{job_id}"))?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_transport_error)?;
        decode_json(response).await
    }

    async fn cancel_job(&self, job_id: &JobId) -> Result<bool, ServiceError> {
        let url = endpoint(&self.settings, &format!("metadata/jobs/{job_id}/cancel"))?;
        let response = self
            .client
            .post(url)
            .send()
            .await
            .map_err(map_transport_error)?;
        let reply: CancelReply = decode_json(response).await?;
        Ok(reply.acknowledged)
    }
}

/// JSON/HTTP wishlist mutation client.
#[derive(Debug, Clone)]
pub struct HttpWishlistService {
    settings: ServiceSettings,
    client: reqwest::Client,
}

impl HttpWishlistService {
    pub fn new(settings: ServiceSettings) -> Result<Self, ServiceError> {
        let client = build_client(&settings)?;
        Ok(Self { settings, client })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EditsReply {
    updated_count: u64,
}

#[async_trait::async_trait]
impl WishlistService for HttpWishlistService {
    async fn submit_field_edits(&self, diff: &[EntityDiff]) -> Result<u64, ServiceError> {
        let url = endpoint(&self.settings, "items/bulk")?;
        let response = self
            .client
            .patch(url)
            .json(&json!({ "edits": diff }))
            .send()
            .await
            .map_err(map_transport_error)?;
        let reply: EditsReply = decode_json(response).await?;
        Ok(reply.updated_count)
    }

    async fn submit_uniform_operation(
        &self,
        operation: UniformOperation,
        ids: &[EntityId],
        payload: &Value,
    ) -> Result<OperationReport, ServiceError> {
        let url = endpoint(&self.settings, &format!("items/bulk/{operation}"))?;
        let response = self
            .client
            .post(url)
            .json(&json!({ "ids": ids, "payload": payload }))
            .send()
            .await
            .map_err(map_transport_error)?;
        decode_json(response).await
    }
}
