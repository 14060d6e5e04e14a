use crate::{
    coordinator::{
        Coordinator,
        actions::{Action, describe_error},
        request,
        responses::PreSignedUrls,
    },
    upload::{
        error::UploadError,
        part::{PartTarget, Session},
    },
};
use anyhow::{Result, anyhow};
use reqwest::Method;
use serde::Serialize;
use std::collections::BTreeMap;

/// `POST /uploads/getMultipartPreSignedUrls`, one upload target per part
#[derive(Debug, Serialize)]
pub struct GetMultipartPreSignedUrls<'a> {
    #[serde(flatten)]
    session: &'a Session,
    parts: u16,
}

impl<'a> GetMultipartPreSignedUrls<'a> {
    #[must_use]
    pub const fn new(session: &'a Session, parts: u16) -> Self {
        Self { session, parts }
    }

    /// # Errors
    ///
    /// Will return `Err` if can not make the request or the number of targets
    /// does not match the requested parts
    pub async fn request(&self, coordinator: &Coordinator) -> Result<Vec<PartTarget>, UploadError> {
        self.send(coordinator)
            .await
            .map_err(|e| UploadError::TargetAcquisition(format!("{e:#}")))
    }

    async fn send(&self, coordinator: &Coordinator) -> Result<Vec<PartTarget>> {
        let url = self.url(coordinator)?;
        let headers = self.headers().unwrap_or_default();

        let response =
            request::json(coordinator.client(), url, self.http_method(), &headers, self).await?;

        if !response.status().is_success() {
            return Err(anyhow!(describe_error(response).await));
        }

        let rs: PreSignedUrls = response.json().await?;

        if rs.parts.len() != usize::from(self.parts) {
            return Err(anyhow!(
                "requested {} upload targets, got {}",
                self.parts,
                rs.parts.len()
            ));
        }

        log::debug!("upload targets: {}", rs.parts.len());

        Ok(rs.parts)
    }
}

impl Action for GetMultipartPreSignedUrls<'_> {
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
        vec!["uploads", "getMultipartPreSignedUrls"]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session() -> Session {
        Session {
            file_id: "upload-1".to_string(),
            file_key: "videos/a.mp4".to_string(),
        }
    }

    #[test]
    fn test_body() {
        let session = session();
        let action = GetMultipartPreSignedUrls::new(&session, 3);
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({"fileId": "upload-1", "fileKey": "videos/a.mp4", "parts": 3})
        );
    }

    #[test]
    fn test_url() {
        let session = session();
        let coordinator = Coordinator::new("https://zoomy.b4a.io").unwrap();
        let action = GetMultipartPreSignedUrls::new(&session, 3);
        assert_eq!(Method::POST, action.http_method());
        assert_eq!(
            action.url(&coordinator).unwrap().as_str(),
            "https://zoomy.b4a.io/uploads/getMultipartPreSignedUrls"
        );
    }
}
