use crate::{coordinator::ByteProgress, upload::source::ChunkStream};
use anyhow::Result;
use futures::stream::TryStreamExt;
use reqwest::{
    Body, Client, Method, Response,
    header::{HeaderMap, HeaderName, HeaderValue},
    multipart::{Form, Part},
};
use serde::Serialize;
use std::collections::BTreeMap;
use url::Url;

fn header_map(headers: &BTreeMap<&str, &str>) -> Result<HeaderMap> {
    headers
        .iter()
        .map(|(k, v)| Ok((k.parse::<HeaderName>()?, v.parse::<HeaderValue>()?)))
        .collect::<Result<HeaderMap>>()
}

/// # Errors
///
/// Will return `Err` if can not make the request
pub async fn json<B: Serialize + ?Sized>(
    client: &Client,
    url: Url,
    method: Method,
    headers: &BTreeMap<&str, &str>,
    body: &B,
) -> Result<Response> {
    let headers = header_map(headers)?;

    log::debug!("{method} {url}");

    Ok(client
        .request(method, url)
        .headers(headers)
        .json(body)
        .send()
        .await?)
}

/// Send `stream` as a multipart form field, reporting the bytes read from it
///
/// # Errors
///
/// Will return `Err` if can not make the request
#[allow(clippy::too_many_arguments)]
pub async fn multipart(
    client: &Client,
    url: Url,
    method: Method,
    headers: &BTreeMap<&str, &str>,
    field: &str,
    file_name: String,
    length: u64,
    stream: ChunkStream,
    on_progress: ByteProgress,
) -> Result<Response> {
    let headers = header_map(headers)?;

    let mut loaded: u64 = 0;
    let stream = stream.inspect_ok(move |bytes| {
        loaded += bytes.len() as u64;
        on_progress(loaded);
    });

    let part = Part::stream_with_length(Body::wrap_stream(stream), length)
        .file_name(file_name)
        .mime_str("application/octet-stream")?;

    let form = Form::new().part(field.to_string(), part);

    log::debug!("{method} {url} ({length} bytes)");

    Ok(client
        .request(method, url)
        .headers(headers)
        .multipart(form)
        .send()
        .await?)
}
