//! Shared constants for the generation and upscaling commands
//!

/// Largest pixel area the generation service accepts (1024x1024).
pub const MAX_OUTPUT_AREA: u64 = 1024 * 1024;

/// Generated dimensions must be a multiple of this.
pub const DIMENSION_STEP: u32 = 64;

/// Largest image (in bytes) we will download as a generation or upscale source.
pub const MAX_CONTENT_SIZE: u64 = 10 * 1024 * 1024;

/// MIME types accepted for source images.
pub const ALLOWED_TYPES: &[&str] = &["image/jpeg", "image/png"];

/// Browser user agent sent with every outbound request.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/106.0.0.0 Safari/537.36";

/// Path of the text-to-image action.
pub const TXT2IMG_PATH: &str = "/got_image";

/// Path of the image-to-image action.
pub const IMG2IMG_PATH: &str = "/got_image2image";

/// Response header carrying the seed used for a generation.
pub const SEED_HEADER: &str = "seed";

/// Default classifier-free guidance scale.
pub const DEFAULT_SCALE: f64 = 11.0;

/// Default strength for image-to-image requests.
pub const DEFAULT_IMG2IMG_STRENGTH: f64 = 0.7;

/// Default strength when no source image is supplied.
pub const DEFAULT_TXT2IMG_STRENGTH: f64 = 0.5;

/// Default upscaling endpoint (Real-CUGAN on Hugging Face spaces).
pub const DEFAULT_UPSCALE_API: &str = "https://hf.space/embed/saber2022/Real-CUGAN/api/predict/";

/// Alphabet used for upscaler session hashes.
pub const SESSION_HASH_ALPHABET: &[u8] = b"0123456789qazwsxedcrfvtgbyhnujmikolp";

/// Length of upscaler session hashes.
pub const SESSION_HASH_LENGTH: usize = 11;

/// Command name and aliases of the drawing command.
pub const DRAW_ALIASES: &[&str] = &[
    "ai-draw", "draw", "画图", "AI作画", "AI画图", "AI", "ai", "ai作图", "ai画图", "作图", "画",
    "约稿",
];

/// Command name and aliases of the upscaling command.
pub const UPSCALE_ALIASES: &[&str] = &[
    "real-cugan",
    "清晰术",
    "清晰",
    "Real-CUGAN",
    "RealCUGAN",
    "real",
    "upup",
];
