use crate::{
    coordinator::{
        Coordinator,
        actions::{Action, describe_error},
        request,
    },
    upload::{
        error::UploadError,
        part::{Session, UploadedPart},
    },
};
use anyhow::{Result, anyhow};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::collections::BTreeMap;

const SESSION_TOKEN_HEADER: &str = "parse-session-token";

/// `POST /uploads/finalizeMultipartUpload`, assembles the uploaded parts
#[derive(Debug, Serialize)]
pub struct FinalizeMultipartUpload<'a> {
    #[serde(flatten)]
    session: &'a Session,
    parts: &'a [UploadedPart],
    #[serde(skip)]
    session_token: Option<&'a SecretString>,
}

impl<'a> FinalizeMultipartUpload<'a> {
    #[must_use]
    pub const fn new(
        session: &'a Session,
        parts: &'a [UploadedPart],
        session_token: Option<&'a SecretString>,
    ) -> Self {
        Self {
            session,
            parts,
            session_token,
        }
    }

    /// # Errors
    ///
    /// Will return `Err` if can not make the request
    pub async fn request(&self, coordinator: &Coordinator) -> Result<(), UploadError> {
        self.send(coordinator)
            .await
            .map_err(|e| UploadError::Finalization(format!("{e:#}")))
    }

    async fn send(&self, coordinator: &Coordinator) -> Result<()> {
        let url = self.url(coordinator)?;
        let headers = self.headers().unwrap_or_default();

        let response =
            request::json(coordinator.client(), url, self.http_method(), &headers, self).await?;

        if response.status().is_success() {
            log::info!(
                "Finalized upload fileId: {}, parts: {}",
                self.session.file_id,
                self.parts.len()
            );
            Ok(())
        } else {
            Err(anyhow!(describe_error(response).await))
        }
    }
}

impl Action for FinalizeMultipartUpload<'_> {
    fn http_method(&self) -> Method {
        Method::POST
    }

    fn headers(&self) -> Option<BTreeMap<&str, &str>> {
        let mut map: BTreeMap<&str, &str> = BTreeMap::new();

        if let Some(token) = self.session_token {
            map.insert(SESSION_TOKEN_HEADER, token.expose_secret());
        }

        Some(map)
    }

    fn query_pairs(&self) -> Option<BTreeMap<&str, &str>> {
        None
    }

    fn path(&self) -> Vec<&str> {
        vec!["uploads", "finalizeMultipartUpload"]
    }
}
