use crate::upload::part::PartTarget;
use serde::Deserialize;

/// Error body returned by the coordination service
#[derive(Deserialize, Debug, Clone)]
pub struct ErrorResponse {
    pub code: Option<i64>,
    pub error: String,
}

/// Response of `getMultipartPreSignedUrls`
#[derive(Deserialize, Debug, Clone)]
pub struct PreSignedUrls {
    #[serde(default)]
    pub parts: Vec<PartTarget>,
}

/// Response of `proxy-upload-part`
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ProxyUploadPartResult {
    #[serde(rename = "ETag")]
    pub e_tag: Option<String>,
}
