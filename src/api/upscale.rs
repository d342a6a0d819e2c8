//! Real-CUGAN upscaling through a Gradio `predict` endpoint.

use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose;
use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{SESSION_HASH_ALPHABET, SESSION_HASH_LENGTH};
use crate::error::FailedCall;

#[allow(clippy::expect_used)]
static DATA_URI_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^data:image/.*;base64,").expect("data uri prefix pattern"));

/// Denoising strength of the upscaling model.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum Denoise {
    /// Light denoising.
    #[value(name = "1x")]
    One,
    /// Medium denoising.
    #[value(name = "2x")]
    Two,
    /// Strong denoising.
    #[value(name = "3x")]
    Three,
    /// Conservative model.
    Conservative,
    /// No denoising.
    #[default]
    No,
}

impl Denoise {
    /// Weights file for this denoise level.
    pub fn weights(&self) -> &'static str {
        match self {
            Self::One => "denoise1x.pth",
            Self::Two => "denoise2x.pth",
            Self::Three => "denoise3x.pth",
            Self::Conservative => "conservative.pth",
            Self::No => "no-denoise.pth",
        }
    }
}

/// Upscaling factor.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum ScaleFactor {
    /// Twice the size.
    #[default]
    #[value(name = "2x")]
    Double,
    /// Three times the size.
    #[value(name = "3x")]
    Triple,
    /// Four times the size.
    #[value(name = "4x")]
    Quadruple,
}

impl std::fmt::Display for ScaleFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Double => write!(f, "2x"),
            Self::Triple => write!(f, "3x"),
            Self::Quadruple => write!(f, "4x"),
        }
    }
}

/// Model file name the upscaler expects, e.g. `up2x-latest-no-denoise.pth`.
pub fn model_file(scale: ScaleFactor, denoise: Denoise) -> String {
    format!("up{scale}-latest-{}", denoise.weights())
}

/// Random session hash for a Gradio request.
pub fn session_hash(len: usize) -> String {
    (0..len)
        .map(|_| {
            let index = rand::random_range(0..SESSION_HASH_ALPHABET.len());
            char::from(SESSION_HASH_ALPHABET[index])
        })
        .collect()
}

/// One input value of a Gradio predict call.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
enum PredictInput {
    Text(String),
    Number(u8),
}

#[derive(Debug, Serialize)]
struct PredictRequest {
    cleared: bool,
    example_id: Option<u32>,
    session_hash: String,
    data: Vec<PredictInput>,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

fn predict_request(image: &[u8], model: &str, tile: u8) -> PredictRequest {
    PredictRequest {
        cleared: false,
        example_id: None,
        session_hash: session_hash(SESSION_HASH_LENGTH),
        data: vec![
            PredictInput::Text(format!(
                "data:image/png;base64,{}",
                general_purpose::STANDARD.encode(image)
            )),
            PredictInput::Text(model.to_string()),
            PredictInput::Number(tile),
        ],
    }
}

/// Pulls the image out of the first `data` entry of a predict response.
fn decode_output(body: &[u8]) -> Result<Vec<u8>, FailedCall> {
    let parsed: PredictResponse = serde_json::from_slice(body)
        .map_err(|err| FailedCall::other(format!("Failed to parse upscaler response: {err}")))?;
    let uri = parsed
        .data
        .first()
        .and_then(|value| value.as_str())
        .ok_or_else(|| FailedCall::other("Upscaler response has no image"))?;
    let b64 = DATA_URI_PREFIX.replace(uri, "");
    general_purpose::STANDARD
        .decode(b64.trim())
        .map_err(|err| FailedCall::other(format!("Failed to base64-decode upscaled image: {err}")))
}

/// Upscaling API client.
#[derive(Clone, Debug)]
pub struct UpscaleClient {
    http: reqwest::Client,
    api: String,
}

impl UpscaleClient {
    /// Creates a client posting to `api`.
    pub fn new(http: reqwest::Client, api: impl Into<String>) -> Self {
        Self {
            http,
            api: api.into(),
        }
    }

    /// Upscales `image` with the given model file and tile size.
    pub async fn upscale(&self, image: &[u8], model: &str, tile: u8) -> Result<Vec<u8>, FailedCall> {
        let body = predict_request(image, model, tile);
        debug!("Upscaling {} bytes with {model}, tile {tile}", image.len());

        let resp = self.http.post(&self.api).json(&body).send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;
        if !status.is_success() {
            return Err(FailedCall::status(
                status,
                String::from_utf8_lossy(&bytes).to_string(),
            ));
        }
        decode_output(&bytes)
    }
}
