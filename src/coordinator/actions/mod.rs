//! Actions
//! One file per call of the coordination service, all under `/uploads`

use crate::coordinator::{Coordinator, responses::ErrorResponse};
use anyhow::{Result, anyhow};
use reqwest::{Method, Response};
use std::collections::BTreeMap;
use url::Url;

mod initializemultipartupload;
pub use self::initializemultipartupload::InitializeMultipartUpload;

mod getmultipartpresignedurls;
pub use self::getmultipartpresignedurls::GetMultipartPreSignedUrls;

mod proxyuploadpart;
pub use self::proxyuploadpart::ProxyUploadPart;

mod finalizemultipartupload;
pub use self::finalizemultipartupload::FinalizeMultipartUpload;

pub trait Action {
    // headers to send in the request
    fn headers(&self) -> Option<BTreeMap<&str, &str>>;

    // method to use GET/POST...
    fn http_method(&self) -> Method;

    // URL query pairs
    fn query_pairs(&self) -> Option<BTreeMap<&str, &str>>;

    // URL path, appended to the endpoint
    fn path(&self) -> Vec<&str>;

    /// # Errors
    ///
    /// Will return `Err` if the endpoint can not be a base URL
    fn url(&self, coordinator: &Coordinator) -> Result<Url> {
        let mut url = coordinator.endpoint().clone();

        url.path_segments_mut()
            .map_err(|()| anyhow!("cannot be base: {}", coordinator.endpoint()))?
            .pop_if_empty()
            .extend(self.path());

        if let Some(pairs) = &self.query_pairs() {
            for (k, v) in pairs {
                url.query_pairs_mut().append_pair(k, v);
            }
        }

        Ok(url)
    }
}

/// Render a failed response (status, and the service error when there is one)
///
/// # Errors
///
/// Will return `Err` if the body can not be read
pub async fn response_error(response: Response) -> Result<String> {
    let mut error: BTreeMap<&str, String> = BTreeMap::new();
    error.insert("HTTP Status Code", response.status().to_string());

    let body = response.text().await?;

    if let Ok(e) = serde_json::from_str::<ErrorResponse>(&body) {
        if let Some(code) = e.code {
            error.insert("Code", code.to_string());
        }
        error.insert("Message", e.error);
    } else if !body.is_empty() {
        error.insert("Response", body);
    }

    Ok(error
        .iter()
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<String>>()
        .join(", "))
}

/// Render a failed response without ever failing
pub async fn describe_error(response: Response) -> String {
    let status = response.status();
    response_error(response)
        .await
        .unwrap_or_else(|e| format!("HTTP Status Code: {status}, {e}"))
}
