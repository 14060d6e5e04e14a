use crate::{
    coordinator::{
        ByteProgress, Coordinator,
        actions::{Action, describe_error},
        request,
        responses::ProxyUploadPartResult,
    },
    upload::{
        error::UploadError,
        part::{Part, Session, UploadedPart},
        source::ChunkStream,
    },
};
use anyhow::{Result, anyhow};
use reqwest::{Method, StatusCode, header::ETAG};
use std::collections::BTreeMap;

// multipart form field holding the raw bytes
const FORM_FIELD: &str = "chunk";

/// `POST /uploads/proxy-upload-part`, the service forwards the chunk to the backend
#[derive(Debug)]
pub struct ProxyUploadPart<'a> {
    session: &'a Session,
    part: &'a Part,
    part_number: String,
}

impl<'a> ProxyUploadPart<'a> {
    #[must_use]
    pub fn new(session: &'a Session, part: &'a Part) -> Self {
        Self {
            session,
            part,
            part_number: part.get_number().to_string(),
        }
    }

    /// Only a `200` carrying an entity tag counts as stored
    ///
    /// # Errors
    ///
    /// Will return `Err` if can not make the request or the part was not stored
    pub async fn request(
        &self,
        coordinator: &Coordinator,
        payload: ChunkStream,
        on_progress: ByteProgress,
    ) -> Result<UploadedPart, UploadError> {
        self.send(coordinator, payload, on_progress)
            .await
            .map_err(|e| UploadError::part(self.part.get_number(), format!("{e:#}")))
    }

    async fn send(
        &self,
        coordinator: &Coordinator,
        payload: ChunkStream,
        on_progress: ByteProgress,
    ) -> Result<UploadedPart> {
        let url = self.url(coordinator)?;
        let headers = self.headers().unwrap_or_default();

        log::debug!(
            "Uploading part: {}, target: {}",
            self.part.get_number(),
            self.part.get_target()
        );

        let response = request::multipart(
            coordinator.client(),
            url,
            self.http_method(),
            &headers,
            FORM_FIELD,
            format!("part-{}", self.part_number),
            self.part.get_chunk(),
            payload,
            on_progress,
        )
        .await?;

        if response.status() != StatusCode::OK {
            return Err(anyhow!(describe_error(response).await));
        }

        let header_etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);

        let body = response.text().await?;
        let rs: ProxyUploadPartResult = serde_json::from_str(&body).unwrap_or_default();

        match rs.e_tag.or(header_etag).filter(|etag| !etag.is_empty()) {
            Some(etag) => Ok(UploadedPart::new(self.part.get_number(), etag)),
            None => Err(anyhow!("missing ETag")),
        }
    }
}

impl Action for ProxyUploadPart<'_> {
    fn http_method(&self) -> Method {
        Method::POST
    }

    fn headers(&self) -> Option<BTreeMap<&str, &str>> {
        None
    }

    fn query_pairs(&self) -> Option<BTreeMap<&str, &str>> {
        let mut map: BTreeMap<&str, &str> = BTreeMap::new();
        map.insert("partNumber", &self.part_number);
        map.insert("uploadId", &self.session.file_id);
        map.insert("fileKey", &self.session.file_key);
        Some(map)
    }

    fn path(&self) -> Vec<&str> {
        vec!["uploads", "proxy-upload-part"]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::upload::part::PartRange;

    fn session() -> Session {
        Session {
            file_id: "upload-1".to_string(),
            file_key: "videos/a b.mp4".to_string(),
        }
    }

    #[test]
    fn test_query_pairs() {
        let session = session();
        let part = Part::new(PartRange::new(2, 10, 10), "https://s3/2".to_string());
        let action = ProxyUploadPart::new(&session, &part);

        let mut map = BTreeMap::new();
        map.insert("partNumber", "2");
        map.insert("uploadId", "upload-1");
        map.insert("fileKey", "videos/a b.mp4");
        assert_eq!(Some(map), action.query_pairs());
    }

    #[test]
    fn test_url() {
        let session = session();
        let part = Part::new(PartRange::new(2, 10, 10), "https://s3/2".to_string());
        let coordinator = Coordinator::new("https://zoomy.b4a.io").unwrap();
        let action = ProxyUploadPart::new(&session, &part);
        assert_eq!(Method::POST, action.http_method());
        assert_eq!(
            action.url(&coordinator).unwrap().as_str(),
            "https://zoomy.b4a.io/uploads/proxy-upload-part?fileKey=videos%2Fa+b.mp4&partNumber=2&uploadId=upload-1"
        );
    }
}
