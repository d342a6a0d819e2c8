//! `ai-draw`: text-to-image and image-to-image generation.

use clap::Parser;
use tracing::info;

use super::{AppState, StageTimer, schedule_recall};
use crate::api::download::{download, image_size};
use crate::chat::{ChatSession, OutgoingMessage, extract_image};
use crate::error::DrawError;
use crate::params::{GenerationParameters, Model, Orient, compose_tags};

/// Options of the drawing command.
#[derive(Parser, Debug)]
#[command(
    name = "ai-draw",
    about = "AI drawing. Separate tags with commas, wrap a tag in {} to add weight. Chinese tags are not supported.",
    after_help = "Example: ai-draw 1girls, miku"
)]
pub struct DrawArgs {
    /// Generation model
    #[arg(short, long, value_enum)]
    pub model: Option<Model>,

    /// Image orientation
    #[arg(short, long, value_enum)]
    pub orient: Option<Orient>,

    /// Generation seed, not recommended
    #[arg(short, long)]
    pub seed: Option<String>,

    /// Draw from an attached image
    #[arg(short, long)]
    pub img2img: bool,

    /// Guidance scale, defaults to 11
    #[arg(short = 'c', long)]
    pub scale: Option<f64>,

    /// Strength between 0 and 1 when drawing from an image
    #[arg(short = 'r', long)]
    pub strength: Option<f64>,

    /// Report elapsed time for each step
    #[arg(short, long)]
    pub debug: bool,

    /// Tags, optionally with an `<image url="..."/>` attachment
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub tags: Vec<String>,
}

/// Runs the drawing command. Errors are returned for [`super::report`].
pub async fn draw<S: ChatSession>(
    state: &AppState,
    session: &S,
    args: DrawArgs,
) -> Result<(), DrawError> {
    let timer = StageTimer::new(args.debug);
    let input = args.tags.join(" ");
    if input.trim().is_empty() {
        timer.stage(session, "Query time").await?;
        session.send(OutgoingMessage::text(super::usage())).await?;
        return Ok(());
    }

    let (input, image_url) = if args.img2img {
        let (rest, url) = extract_image(&input);
        (rest, Some(url.ok_or(DrawError::MissingImage)?))
    } else {
        (input, None)
    };

    let config = state.config();
    let rules = state.forbidden().await;
    let tags = compose_tags(&input, image_url.is_some(), &config.base_prompt, &rules)?;
    timer.stage(session, "Processed input").await?;

    let model = args.model.unwrap_or(config.model);
    let orient = args.orient.unwrap_or(config.orient);
    session
        .send(OutgoingMessage::text("Drawing (´・ω・`)"))
        .await?;

    let mut builder = GenerationParameters::builder(tags, config.token.as_str(), model, orient)
        .seed(args.seed)
        .scale(args.scale)
        .strength(args.strength);

    let source = match image_url {
        Some(url) => {
            let bytes = download(state.http(), &url).await?;
            timer.stage(session, "Downloaded image").await?;
            let size = image_size(&bytes)?;
            timer.stage(session, "Read image size").await?;
            builder = builder.source_image(size);
            Some(bytes)
        }
        None => None,
    };
    let params = builder.build();
    timer.stage(session, "Assembled parameters").await?;

    match params.size {
        Some(size) => info!(
            "Generating img2img with model {}, {}, source normalized to {size}",
            params.model, params.orient
        ),
        None => info!(
            "Generating txt2img with model {}, {}",
            params.model, params.orient
        ),
    }
    let art = state.novelai().generate(&params, source.as_deref()).await?;
    timer.stage(session, "Request finished").await?;

    let seed = art.seed.as_deref().unwrap_or("unknown");
    let ids = session
        .send(OutgoingMessage::Forward(vec![
            OutgoingMessage::text(format!("Seed: {seed}")),
            OutgoingMessage::text(format!("Tags: {}", params.tags)),
            OutgoingMessage::Image(art.image),
        ]))
        .await?;
    timer.stage(session, "Sent").await?;

    schedule_recall(session, ids, config.recall_timeout);
    Ok(())
}
