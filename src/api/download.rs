//! Fetching source images from chat messages.

use std::io::Cursor;
use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose;
use image::ImageReader;
use regex::Regex;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap};
use tracing::debug;

use crate::constants::{ALLOWED_TYPES, MAX_CONTENT_SIZE};
use crate::error::DownloadError;
use crate::resize::Size;

#[allow(clippy::expect_used)]
static DATA_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^data:(image/\w+);base64,(.*)$").expect("data url pattern")
});

fn is_allowed(mime: &str) -> bool {
    let essence = mime.split(';').next().unwrap_or(mime).trim();
    ALLOWED_TYPES.contains(&essence)
}

/// Decodes an inline `data:` image URL.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, DownloadError> {
    let captures = DATA_URL
        .captures(url)
        .ok_or(DownloadError::UnsupportedFileType)?;
    let mime = captures.get(1).map_or("", |m| m.as_str());
    if !is_allowed(mime) {
        return Err(DownloadError::UnsupportedFileType);
    }
    let payload = captures.get(2).map_or("", |m| m.as_str());
    Ok(general_purpose::STANDARD.decode(payload.trim())?)
}

/// Checks the headers of a HEAD response against the size and type limits.
pub fn check_headers(headers: &HeaderMap) -> Result<(), DownloadError> {
    let length = headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok());
    if length.is_some_and(|length| length > MAX_CONTENT_SIZE) {
        return Err(DownloadError::FileTooLarge);
    }

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if !is_allowed(content_type) {
        return Err(DownloadError::UnsupportedFileType);
    }
    Ok(())
}

/// Downloads the image behind `url`, which may be a `data:` URL.
///
/// Remote images are checked with a HEAD request before the body is fetched.
pub async fn download(http: &reqwest::Client, url: &str) -> Result<Vec<u8>, DownloadError> {
    if url.starts_with("data:") {
        return decode_data_url(url);
    }

    let head = http.head(url).send().await?.error_for_status()?;
    check_headers(head.headers())?;

    let bytes = http
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;
    if bytes.len() as u64 > MAX_CONTENT_SIZE {
        return Err(DownloadError::FileTooLarge);
    }
    debug!("Downloaded {} bytes from {url}", bytes.len());
    Ok(bytes.to_vec())
}

/// Reads the pixel dimensions from an image header.
pub fn image_size(bytes: &[u8]) -> Result<Size, DownloadError> {
    let (width, height) = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .into_dimensions()?;
    Ok(Size::new(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::new_rgb8(width, height)
            .write_to(&mut out, image::ImageFormat::Png)
            .expect("encode png");
        out.into_inner()
    }

    fn headers(pairs: &[(reqwest::header::HeaderName, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(name.clone(), HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn data_url_png_is_decoded() {
        let bytes = png(3, 2);
        let url = format!(
            "data:image/png;base64,{}",
            general_purpose::STANDARD.encode(&bytes)
        );
        assert_eq!(decode_data_url(&url).expect("decode"), bytes);
    }

    #[test]
    fn data_url_with_other_type_is_rejected() {
        let err = decode_data_url("data:image/gif;base64,R0lGOD").unwrap_err();
        assert!(matches!(err, DownloadError::UnsupportedFileType));
        let err = decode_data_url("data:text/plain;base64,aGk=").unwrap_err();
        assert!(matches!(err, DownloadError::UnsupportedFileType));
    }

    #[test]
    fn data_url_with_bad_payload_fails() {
        let err = decode_data_url("data:image/png;base64,@@@").unwrap_err();
        assert!(matches!(err, DownloadError::Failed(_)));
    }

    #[test]
    fn oversized_content_is_rejected() {
        let map = headers(&[(CONTENT_LENGTH, "10485761"), (CONTENT_TYPE, "image/png")]);
        assert!(matches!(check_headers(&map), Err(DownloadError::FileTooLarge)));
    }

    #[test]
    fn limit_itself_is_allowed() {
        let map = headers(&[(CONTENT_LENGTH, "10485760"), (CONTENT_TYPE, "image/jpeg")]);
        assert!(check_headers(&map).is_ok());
    }

    #[test]
    fn unexpected_type_is_rejected() {
        let map = headers(&[(CONTENT_LENGTH, "100"), (CONTENT_TYPE, "image/webp")]);
        assert!(matches!(
            check_headers(&map),
            Err(DownloadError::UnsupportedFileType)
        ));
        assert!(matches!(
            check_headers(&HeaderMap::new()),
            Err(DownloadError::UnsupportedFileType)
        ));
    }

    #[test]
    fn type_parameters_are_ignored() {
        let map = headers(&[(CONTENT_TYPE, "image/png; charset=binary")]);
        assert!(check_headers(&map).is_ok());
    }

    #[test]
    fn size_is_read_from_header() {
        assert_eq!(image_size(&png(40, 25)).expect("size"), Size::new(40, 25));
        assert!(image_size(b"definitely not an image").is_err());
    }
}
