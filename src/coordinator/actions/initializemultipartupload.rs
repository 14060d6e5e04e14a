use crate::{
    coordinator::{
        Coordinator,
        actions::{Action, describe_error},
        request,
    },
    upload::{error::UploadError, part::Session},
};
use anyhow::{Result, anyhow};
use reqwest::Method;
use serde::Serialize;
use std::collections::BTreeMap;

/// `POST /uploads/initializeMultipartUpload`, returns the `fileId` and `fileKey`
#[derive(Debug, Serialize)]
pub struct InitializeMultipartUpload<'a> {
    name: &'a str,
}

impl<'a> InitializeMultipartUpload<'a> {
    #[must_use]
    pub const fn new(name: &'a str) -> Self {
        Self { name }
    }

    /// # Errors
    ///
    /// Will return `Err` if can not make the request or the response is not a session
    pub async fn request(&self, coordinator: &Coordinator) -> Result<Session, UploadError> {
        self.send(coordinator)
            .await
            .map_err(|e| UploadError::Initialization(format!("{e:#}")))
    }

    async fn send(&self, coordinator: &Coordinator) -> Result<Session> {
        let url = self.url(coordinator)?;
        let headers = self.headers().unwrap_or_default();

        let response =
            request::json(coordinator.client(), url, self.http_method(), &headers, self).await?;

        if response.status().is_success() {
            let session: Session = response.json().await?;

            log::debug!("fileId: {}, fileKey: {}", session.file_id, session.file_key);

            Ok(session)
        } else {
            Err(anyhow!(describe_error(response).await))
        }
    }
}

impl Action for InitializeMultipartUpload<'_> {
    fn http_method(&self) -> Method {
        Method::POST
    }

    fn headers(&self) -> Option<BTreeMap<&str, &str>> {
        None
    }

    fn query_pairs(&self) -> Option<BTreeMap<&str, &str>> {
        None
    }

    fn path(&self) -> Vec<&str> {
        vec!["uploads", "initializeMultipartUpload"]
    }
}
