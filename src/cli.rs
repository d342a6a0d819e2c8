//! CLI parser
use clap::Parser;
use std::path::PathBuf;

use crate::constants::DEFAULT_UPSCALE_API;
use crate::params::{Model, Orient};

#[derive(Parser, Debug)]
/// CLI Options
pub struct CliOptions {
    #[clap(long, help = "Enable debug logging", env = "NAI_DEBUG")]
    /// Enable debug logging. Env: NAI_DEBUG
    pub debug: bool,

    #[clap(long, short, env = "NAI_ENDPOINT")]
    /// Base URL of the generation API, eg `https://nai.example.org`.
    /// Env: NAI_ENDPOINT
    pub endpoint: String,

    #[clap(long, short, default_value = "", env = "NAI_TOKEN", hide_env_values = true)]
    /// API token. Env: NAI_TOKEN
    pub token: String,

    #[clap(long, short, value_enum, default_value_t = Model::Nai, env = "NAI_MODEL")]
    /// Default model, `safe` is SFW only.
    /// Env: NAI_MODEL
    pub model: Model,

    #[clap(long, short, value_enum, default_value_t = Orient::Portrait, env = "NAI_ORIENT")]
    /// Default image orientation. Env: NAI_ORIENT
    pub orient: Orient,

    #[clap(long, default_value = "masterpiece", env = "NAI_BASE_PROMPT")]
    /// Tags appended to every prompt, defaults to `masterpiece`.
    /// Env: NAI_BASE_PROMPT
    pub base_prompt: String,

    #[clap(long, short, default_value = "", env = "NAI_FORBIDDEN")]
    /// Forbidden words, separated by commas or newlines. A trailing `!` only
    /// matches whole words. Env: NAI_FORBIDDEN
    pub forbidden: String,

    #[clap(long, default_value = "0", env = "NAI_RECALL_TIMEOUT")]
    /// Seconds after which sent images are recalled, `0` disables recall.
    /// Env: NAI_RECALL_TIMEOUT
    pub recall_timeout: u64,

    #[clap(long, default_value = "120", env = "NAI_REQUEST_TIMEOUT")]
    /// Timeout in seconds for every outbound request.
    /// Env: NAI_REQUEST_TIMEOUT
    pub request_timeout: u64,

    #[clap(long, default_value = DEFAULT_UPSCALE_API, env = "NAI_UPSCALE_API")]
    /// Real-CUGAN predict endpoint. Env: NAI_UPSCALE_API
    pub upscale_api: String,

    #[clap(long, default_value = "./images", env = "NAI_OUT_DIR")]
    /// Where the console writes received images, defaults to `./images`.
    /// Env: NAI_OUT_DIR
    pub out_dir: PathBuf,
}
