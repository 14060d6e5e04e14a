//! Client for the coordination service that opens, feeds and finalizes
//! multipart uploads.

pub mod actions;
pub mod request;
pub mod responses;

use crate::upload::{
    error::UploadError,
    part::{Part, PartTarget, Session, UploadedPart},
    source::ChunkStream,
};
use anyhow::{Result, anyhow};
use reqwest::Client;
use secrecy::SecretString;
use std::{fmt, future::Future, sync::Arc};
use url::Url;

/// Receives the number of bytes of a part written so far
pub type ByteProgress = Arc<dyn Fn(u64) + Send + Sync>;

/// Network operations needed by an upload session.
///
/// None of them retry; retrying is a caller policy.
pub trait Transfer: Send + Sync + 'static {
    /// Open a multipart upload for `name`
    fn initialize(&self, name: &str) -> impl Future<Output = Result<Session, UploadError>> + Send;

    /// One upload target per part, exactly `parts` of them
    fn request_part_targets(
        &self,
        session: &Session,
        parts: u16,
    ) -> impl Future<Output = Result<Vec<PartTarget>, UploadError>> + Send;

    /// Stream `payload` as the body of `part`, calling `on_progress` as bytes are sent
    fn upload_part(
        &self,
        session: &Session,
        part: &Part,
        payload: ChunkStream,
        on_progress: ByteProgress,
    ) -> impl Future<Output = Result<UploadedPart, UploadError>> + Send;

    /// Assemble the uploaded parts into the final object
    fn finalize(
        &self,
        session: &Session,
        parts: &[UploadedPart],
        session_token: Option<&SecretString>,
    ) -> impl Future<Output = Result<(), UploadError>> + Send;
}

/// HTTP client for one coordination service endpoint
#[derive(Debug, Clone)]
pub struct Coordinator {
    endpoint: Url,
    client: Client,
}

impl Coordinator {
    /// Endpoints without a scheme default to https
    ///
    /// # Errors
    ///
    /// Will return `Err` if the endpoint is not a valid base URL
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint = if endpoint.contains("://") {
            endpoint.to_string()
        } else {
            format!("https://{endpoint}")
        };

        let endpoint = Url::parse(&endpoint)?;

        if endpoint.cannot_be_a_base() {
            return Err(anyhow!("endpoint cannot be a base URL: {endpoint}"));
        }

        Ok(Self {
            endpoint,
            client: Client::new(),
        })
    }

    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    #[must_use]
    pub const fn client(&self) -> &Client {
        &self.client
    }
}

impl fmt::Display for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "endpoint: {}", self.endpoint)
    }
}

impl Transfer for Coordinator {
    async fn initialize(&self, name: &str) -> Result<Session, UploadError> {
        actions::InitializeMultipartUpload::new(name)
            .request(self)
            .await
    }

    async fn request_part_targets(
        &self,
        session: &Session,
        parts: u16,
    ) -> Result<Vec<PartTarget>, UploadError> {
        actions::GetMultipartPreSignedUrls::new(session, parts)
            .request(self)
            .await
    }

    async fn upload_part(
        &self,
        session: &Session,
        part: &Part,
        payload: ChunkStream,
        on_progress: ByteProgress,
    ) -> Result<UploadedPart, UploadError> {
        actions::ProxyUploadPart::new(session, part)
            .request(self, payload, on_progress)
            .await
    }

    async fn finalize(
        &self,
        session: &Session,
        parts: &[UploadedPart],
        session_token: Option<&SecretString>,
    ) -> Result<(), UploadError> {
        actions::FinalizeMultipartUpload::new(session, parts, session_token)
            .request(self)
            .await
    }
}
