//! Source image validation and upload to the search-by-image endpoint

use image::ImageFormat;
use reqwest::multipart::{Form, Part};
use std::path::Path;
use tracing::{debug, info};

use super::types::SearchRoot;
use crate::error::{InputError, LocateError, LocateResult};

/// `request` parameter asking the endpoint for the search-by-image link block
const UPLOAD_REQUEST_BLOCKS: &str = r#"{"blocks":[{"block":"b-page_type_search-by-image__link"}]}"#;

/// Multipart field carrying the image
const UPLOAD_FIELD: &str = "upfile";

/// Content type for the codecs the endpoint accepts
#[must_use]
pub fn upload_content_type(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Gif => Some("image/gif"),
        _ => None,
    }
}

/// Read and decode the source image, rejecting anything the endpoint will not take
pub async fn load_source_image(
    path: &Path,
) -> Result<(Vec<u8>, ImageFormat, image::DynamicImage), InputError> {
    if !path.is_file() {
        return Err(InputError::NotFound(path.to_path_buf()));
    }

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| InputError::Unreadable(format!("{}: {e}", path.display())))?;

    let format = image::guess_format(&bytes).map_err(|_| InputError::UnsupportedFormat {
        format: "unknown".to_string(),
    })?;
    if upload_content_type(format).is_none() {
        return Err(InputError::UnsupportedFormat {
            format: format!("{format:?}").to_lowercase(),
        });
    }

    let (bytes, decoded) = tokio::task::spawn_blocking(move || {
        let decoded = image::load_from_memory_with_format(&bytes, format);
        (bytes, decoded)
    })
    .await
    .map_err(|e| InputError::Unreadable(format!("decode task failed: {e}")))?;

    let decoded = decoded.map_err(|e| InputError::Unreadable(e.to_string()))?;
    Ok((bytes, format, decoded))
}

/// Pull `blocks[0].params.url` out of the upload response
#[must_use]
pub fn search_query_from_response(body: &serde_json::Value) -> Option<&str> {
    body.get("blocks")?
        .get(0)?
        .get("params")?
        .get("url")?
        .as_str()
        .filter(|q| !q.is_empty())
}

/// Upload the source image and return the search root
///
/// `endpoint` is the search-by-image URL; the returned search URL is
/// `<endpoint>?<query>` where `<query>` comes from the JSON response.
pub async fn upload_image(
    client: &reqwest::Client,
    endpoint: &str,
    path: &Path,
) -> LocateResult<SearchRoot> {
    let (bytes, format, query_image) = load_source_image(path).await?;
    let content_type = upload_content_type(format).unwrap_or("application/octet-stream");

    let part = Part::bytes(bytes)
        .file_name("blob")
        .mime_str(content_type)
        .map_err(|e| LocateError::Upload(format!("invalid content type: {e}")))?;
    let form = Form::new().part(UPLOAD_FIELD, part);

    info!("Uploading {} to {endpoint}", path.display());
    let response = client
        .post(endpoint)
        .query(&[
            ("rpt", "imageview"),
            ("format", "json"),
            ("request", UPLOAD_REQUEST_BLOCKS),
        ])
        .multipart(form)
        .send()
        .await
        .map_err(|e| LocateError::Upload(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(LocateError::Upload(format!("endpoint answered {status}")));
    }

    let body: serde_json::Value = response
        .json()
        .await
        .map_err(|e| LocateError::Upload(format!("invalid JSON response: {e}")))?;

    let query = search_query_from_response(&body)
        .ok_or_else(|| LocateError::Upload("response carries no search link".to_string()))?;

    let search_url = format!("{endpoint}?{query}");
    debug!("Search root: {search_url}");
    Ok(SearchRoot {
        search_url,
        query_image,
    })
}
