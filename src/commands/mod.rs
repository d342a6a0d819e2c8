//! Chat commands and the state they share.

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{CommandFactory, Parser};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::api::http_client;
use crate::api::novelai::NovelAiClient;
use crate::api::upscale::UpscaleClient;
use crate::chat::{ChatSession, MessageId, OutgoingMessage, split_args};
use crate::config::PluginConfig;
use crate::constants::{DRAW_ALIASES, UPSCALE_ALIASES};
use crate::error::DrawError;
use crate::forbidden::ForbiddenRuleSet;

pub mod draw;
pub mod upscale;

pub use draw::DrawArgs;
pub use upscale::UpscaleArgs;

/// Console command that replaces the forbidden word configuration.
pub const SET_FORBIDDEN: &str = "set-forbidden";

/// State shared by all command invocations.
#[derive(Clone, Debug)]
pub struct AppState {
    config: Arc<PluginConfig>,
    forbidden: Arc<RwLock<Arc<ForbiddenRuleSet>>>,
    http: reqwest::Client,
    novelai: NovelAiClient,
    upscaler: UpscaleClient,
}

impl AppState {
    /// Builds the HTTP clients and compiles the initial forbidden words.
    pub fn new(config: PluginConfig) -> Result<Self, anyhow::Error> {
        let http = http_client(config.request_timeout)?;
        let novelai = NovelAiClient::new(http.clone(), &config.endpoint)
            .map_err(|err| anyhow::anyhow!("Invalid endpoint {:?}: {err}", config.endpoint))?;
        let upscaler = UpscaleClient::new(http.clone(), config.upscale_api.clone());
        let rules = ForbiddenRuleSet::compile(&config.forbidden);
        info!("Loaded {} forbidden word rules", rules.len());

        Ok(Self {
            config: Arc::new(config),
            forbidden: Arc::new(RwLock::new(Arc::new(rules))),
            http,
            novelai,
            upscaler,
        })
    }

    /// Plugin configuration.
    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// Snapshot of the current forbidden word rules.
    pub async fn forbidden(&self) -> Arc<ForbiddenRuleSet> {
        self.forbidden.read().await.clone()
    }

    /// Replaces the forbidden word rules, returning the new rule count.
    /// Readers holding the previous snapshot keep using it.
    pub async fn reload_forbidden(&self, raw: &str) -> usize {
        let rules = Arc::new(ForbiddenRuleSet::compile(raw));
        let count = rules.len();
        *self.forbidden.write().await = rules;
        info!("Reloaded forbidden words, {count} rules");
        count
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn novelai(&self) -> &NovelAiClient {
        &self.novelai
    }

    pub(crate) fn upscaler(&self) -> &UpscaleClient {
        &self.upscaler
    }
}

/// A parsed chat command.
#[derive(Debug)]
pub enum Command {
    /// Draw an image.
    Draw(DrawArgs),
    /// Upscale an image.
    Upscale(UpscaleArgs),
    /// Replace the forbidden word configuration.
    SetForbidden(String),
    /// Show usage for all commands.
    Help,
}

/// Parses one line of chat input.
///
/// `None` means the line is not addressed to this plugin. Option errors come
/// back as clap errors, ready to be rendered for the user.
pub fn parse_command(line: &str) -> Option<Result<Command, clap::Error>> {
    let line = line.trim();
    let (name, rest) = line
        .split_once(char::is_whitespace)
        .unwrap_or((line, ""));

    if name == "help" {
        return Some(Ok(Command::Help));
    }
    if name == SET_FORBIDDEN {
        return Some(Ok(Command::SetForbidden(rest.trim().to_string())));
    }

    let args = std::iter::once(name.to_string()).chain(split_args(rest));
    if DRAW_ALIASES.contains(&name) {
        Some(DrawArgs::try_parse_from(args).map(Command::Draw))
    } else if UPSCALE_ALIASES.contains(&name) {
        Some(UpscaleArgs::try_parse_from(args).map(Command::Upscale))
    } else {
        None
    }
}

/// Usage text for both commands.
pub fn usage() -> String {
    format!(
        "{}\n{}",
        DrawArgs::command().render_help(),
        UpscaleArgs::command().render_help()
    )
}

/// Runs one line of chat input against `session`.
///
/// Command failures are reported to the session and never returned; only a
/// session that cannot send at all produces an error here.
pub async fn dispatch<S: ChatSession>(
    state: &AppState,
    session: &S,
    line: &str,
) -> anyhow::Result<()> {
    let command = match parse_command(line) {
        None => return Ok(()),
        Some(Ok(command)) => command,
        Some(Err(err)) => {
            session
                .send(OutgoingMessage::text(err.render().to_string()))
                .await?;
            return Ok(());
        }
    };

    let result = match command {
        Command::Help => {
            session.send(OutgoingMessage::text(usage())).await?;
            Ok(())
        }
        Command::SetForbidden(raw) => {
            let count = state.reload_forbidden(&raw).await;
            session
                .send(OutgoingMessage::text(format!("Loaded {count} forbidden word rules.")))
                .await?;
            Ok(())
        }
        Command::Draw(args) => draw::draw(state, session, args).await,
        Command::Upscale(args) => upscale::upscale(state, session, args).await,
    };

    match result {
        Ok(()) => Ok(()),
        Err(err) => report(session, &err).await,
    }
}

/// Turns a command failure into a reply. User mistakes get a plain answer,
/// everything else is logged and quoted back.
pub async fn report<S: ChatSession>(session: &S, err: &DrawError) -> anyhow::Result<()> {
    let message = if err.is_user_error() {
        OutgoingMessage::text(err.user_message())
    } else {
        error!("Command failed: {err}");
        OutgoingMessage::quote(err.user_message())
    };
    session.send(message).await?;
    Ok(())
}

/// Deletes `ids` from the session after `timeout`. Zero disables recall.
///
/// The timer runs detached from the command; failed deletions are only
/// logged.
pub fn schedule_recall<S: ChatSession>(
    session: &S,
    ids: Vec<MessageId>,
    timeout: Duration,
) -> Option<JoinHandle<()>> {
    if timeout.is_zero() || ids.is_empty() {
        return None;
    }
    let session = session.clone();
    Some(tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        for id in ids {
            if let Err(err) = session.delete_message(&id).await {
                warn!("Failed to recall message {id}: {err}");
            }
        }
    }))
}

/// Reports elapsed time at each stage when debug mode is on.
#[derive(Clone, Copy, Debug)]
pub(crate) struct StageTimer {
    started: Option<Instant>,
}

impl StageTimer {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            started: enabled.then(Instant::now),
        }
    }

    pub(crate) async fn stage<S: ChatSession>(
        &self,
        session: &S,
        label: &str,
    ) -> Result<(), DrawError> {
        if let Some(started) = self.started {
            let elapsed = started.elapsed().as_secs_f64();
            session
                .send(OutgoingMessage::text(format!("{label}: {elapsed:.3}s")))
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrelated_lines_are_ignored() {
        assert!(parse_command("hello there").is_none());
        assert!(parse_command("").is_none());
    }

    #[test]
    fn draw_aliases_parse() {
        for alias in ["ai-draw", "约稿", "ai"] {
            let parsed = parse_command(&format!("{alias} -m safe -o landscape 1girls, miku"));
            match parsed {
                Some(Ok(Command::Draw(args))) => {
                    assert_eq!(args.tags.join(" "), "1girls, miku");
                    assert_eq!(args.model, Some(crate::params::Model::Safe));
                    assert_eq!(args.orient, Some(crate::params::Orient::Landscape));
                }
                other => panic!("unexpected parse for {alias}: {other:?}"),
            }
        }
    }

    #[test]
    fn unknown_option_value_is_a_parse_error() {
        assert!(matches!(parse_command("ai -m furry cat"), Some(Err(_))));
    }

    #[test]
    fn upscale_aliases_parse() {
        match parse_command("upup -p 3x -o 4x -t 0 <image url=\"https://x/y.png\"/>") {
            Some(Ok(Command::Upscale(args))) => {
                assert_eq!(args.tile, 0);
                assert_eq!(args.input.len(), 1);
            }
            other => panic!("unexpected parse: {other:?}"),
        }
        assert!(matches!(parse_command("real -t 9"), Some(Err(_))));
    }

    #[test]
    fn set_forbidden_keeps_raw_text() {
        match parse_command("set-forbidden cat!, dog") {
            Some(Ok(Command::SetForbidden(raw))) => assert_eq!(raw, "cat!, dog"),
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn usage_mentions_both_commands() {
        let text = usage();
        assert!(text.contains("ai-draw"));
        assert!(text.contains("real-cugan"));
    }

    #[tokio::test]
    async fn reload_swaps_snapshot() {
        let state = AppState::new(PluginConfig::new("https://nai.example.org")).expect("state");
        let before = state.forbidden().await;
        assert!(before.is_empty());

        assert_eq!(state.reload_forbidden("cat!, dog").await, 2);
        assert!(before.is_empty());
        assert_eq!(state.forbidden().await.len(), 2);
    }

    #[test]
    fn invalid_endpoint_is_rejected() {
        assert!(AppState::new(PluginConfig::new("nowhere")).is_err());
    }
}
