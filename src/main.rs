use clap::Parser;
use nai_draw::commands::{AppState, dispatch};
use nai_draw::config::{PluginConfig, setup_logging};
use nai_draw::console::ConsoleSession;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::{error, info};

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = nai_draw::cli::CliOptions::parse();

    if let Err(err) = setup_logging(cli.debug) {
        eprintln!("Logging disabled: {err}");
    }

    let state = match AppState::new(PluginConfig::from(&cli)) {
        Ok(state) => state,
        Err(err) => {
            error!("Startup error: {}", err);
            return;
        }
    };
    let session = ConsoleSession::new(cli.out_dir.clone())
        .with_recall(!state.config().recall_timeout.is_zero());
    info!(
        "Ready, images go to {}. Type `help` for usage.",
        session.out_dir().display()
    );

    let mut tasks = JoinSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let state = state.clone();
                    let session = session.clone();
                    tasks.spawn(async move {
                        if let Err(err) = dispatch(&state, &session, &line).await {
                            error!("Failed to reply: {}", err);
                        }
                    });
                }
                Ok(None) => break,
                Err(err) => {
                    error!("Failed to read input: {}", err);
                    break;
                }
            },
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                tasks.abort_all();
                return;
            }
        }
    }

    while tasks.join_next().await.is_some() {}
}
