//! Client for the NovelAI-style generation endpoint.

use base64::Engine;
use base64::engine::general_purpose;
use tracing::debug;
use url::Url;

use crate::constants::{IMG2IMG_PATH, SEED_HEADER, TXT2IMG_PATH};
use crate::error::FailedCall;
use crate::params::GenerationParameters;

/// An image returned by the generation service.
#[derive(Clone, Debug)]
pub struct GeneratedImage {
    /// Raw image bytes.
    pub image: Vec<u8>,
    /// Seed reported by the service, if any.
    pub seed: Option<String>,
}

/// Generation API client. Holds the endpoint without its trailing slash.
#[derive(Clone, Debug)]
pub struct NovelAiClient {
    http: reqwest::Client,
    endpoint: String,
}

impl NovelAiClient {
    /// Creates a client for `endpoint`, which must be an absolute URL.
    pub fn new(http: reqwest::Client, endpoint: &str) -> Result<Self, url::ParseError> {
        let endpoint = endpoint.trim().trim_end_matches('/').to_string();
        Url::parse(&endpoint)?;
        Ok(Self { http, endpoint })
    }

    /// The configured endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Full request URL, including the query string.
    pub fn request_url(
        &self,
        params: &GenerationParameters,
        img2img: bool,
    ) -> Result<Url, url::ParseError> {
        let path = if img2img { IMG2IMG_PATH } else { TXT2IMG_PATH };
        let mut url = Url::parse(&format!("{}{}", self.endpoint, path))?;
        url.query_pairs_mut().extend_pairs(params.query_pairs());
        Ok(url)
    }

    /// Runs one generation. With a `source` image this is an image-to-image
    /// POST carrying the base64 encoded source as its body, otherwise a plain
    /// GET.
    pub async fn generate(
        &self,
        params: &GenerationParameters,
        source: Option<&[u8]>,
    ) -> Result<GeneratedImage, FailedCall> {
        let url = self
            .request_url(params, source.is_some())
            .map_err(|err| FailedCall::other(err.to_string()))?;
        debug!("Requesting {}{}", self.endpoint, url.path());

        let request = match source {
            Some(image) => self
                .http
                .post(url)
                .body(general_purpose::STANDARD.encode(image)),
            None => self.http.get(url),
        };
        let resp = request.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FailedCall::status(status, body));
        }

        let seed = resp
            .headers()
            .get(SEED_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let image = resp.bytes().await?.to_vec();
        debug!("Generated {} bytes, seed {:?}", image.len(), seed);
        Ok(GeneratedImage { image, seed })
    }
}
