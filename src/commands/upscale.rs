//! `real-cugan`: upscale an image with Real-CUGAN.

use clap::Parser;

use super::AppState;
use crate::api::download::download;
use crate::api::upscale::{Denoise, ScaleFactor, model_file};
use crate::chat::{ChatSession, OutgoingMessage, extract_image};
use crate::error::DrawError;

/// Options of the upscaling command.
#[derive(Parser, Debug)]
#[command(name = "real-cugan", about = "Upscale an image with Real-CUGAN.")]
pub struct UpscaleArgs {
    /// Denoise level
    #[arg(short, long, value_enum, default_value_t)]
    pub pth: Denoise,

    /// Upscaling factor
    #[arg(short = 'o', long, value_enum, default_value_t)]
    pub mode: ScaleFactor,

    /// Tile size, lower values use less memory
    #[arg(short, long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(0..=4))]
    pub tile: u8,

    /// The `<image url="..."/>` to upscale
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub input: Vec<String>,
}

/// Runs the upscaling command. Errors are returned for [`super::report`].
pub async fn upscale<S: ChatSession>(
    state: &AppState,
    session: &S,
    args: UpscaleArgs,
) -> Result<(), DrawError> {
    let input = args.input.join(" ");
    if input.trim().is_empty() {
        session.send(OutgoingMessage::text(super::usage())).await?;
        return Ok(());
    }

    let (_, url) = extract_image(&input);
    let url = url.ok_or(DrawError::MissingImage)?;
    session
        .send(OutgoingMessage::text("Casting the clarity spell!"))
        .await?;

    let image = download(state.http(), &url).await?;
    let model = model_file(args.mode, args.pth);
    let upscaled = state.upscaler().upscale(&image, &model, args.tile).await?;
    session.send(OutgoingMessage::Image(upscaled)).await?;
    Ok(())
}
