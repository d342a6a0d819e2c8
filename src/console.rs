//! Terminal session: replies go to stdout, images to files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Context;
use tokio::sync::Mutex;
use tracing::debug;

use crate::chat::{ChatSession, MessageId, OutgoingMessage};

/// A [`ChatSession`] for running the plugin from a terminal.
#[derive(Clone, Debug)]
pub struct ConsoleSession {
    out_dir: PathBuf,
    recall: bool,
    seq: Arc<AtomicUsize>,
    files: Arc<Mutex<HashMap<MessageId, Vec<PathBuf>>>>,
}

fn extension_for(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .ok()
        .and_then(|format| format.extensions_str().first().copied())
        .unwrap_or("png")
}

impl ConsoleSession {
    /// Creates a session writing images below `out_dir`. Written files are
    /// not tracked for recall until [`Self::with_recall`] enables it.
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            recall: false,
            seq: Arc::new(AtomicUsize::new(0)),
            files: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Remember written files so that recalling a message removes them.
    pub fn with_recall(mut self, recall: bool) -> Self {
        self.recall = recall;
        self
    }

    /// Directory images are written to.
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Files written for a message that has not been recalled yet.
    pub async fn files_of(&self, id: &str) -> Vec<PathBuf> {
        self.files.lock().await.get(id).cloned().unwrap_or_default()
    }

    /// Prints `message`, returning the files written for it.
    async fn render(&self, id: &str, message: &OutgoingMessage) -> anyhow::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut pending = vec![(0usize, message)];
        while let Some((indent, message)) = pending.pop() {
            let pad = "  ".repeat(indent);
            match message {
                OutgoingMessage::Text(text) => println!("{pad}{text}"),
                OutgoingMessage::Quote(text) => println!("{pad}> {text}"),
                OutgoingMessage::Image(bytes) => {
                    tokio::fs::create_dir_all(&self.out_dir)
                        .await
                        .with_context(|| format!("Failed to create {}", self.out_dir.display()))?;
                    let path = self
                        .out_dir
                        .join(format!("{id}-{}.{}", files.len(), extension_for(bytes)));
                    tokio::fs::write(&path, bytes)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("{pad}[image] {}", path.display());
                    files.push(path);
                }
                OutgoingMessage::Forward(messages) => {
                    println!("{pad}[forwarded message]");
                    pending.extend(messages.iter().rev().map(|inner| (indent + 1, inner)));
                }
            }
        }
        Ok(files)
    }
}

impl ChatSession for ConsoleSession {
    async fn send(&self, message: OutgoingMessage) -> anyhow::Result<Vec<MessageId>> {
        let id = self.seq.fetch_add(1, Ordering::Relaxed).to_string();
        let files = self.render(&id, &message).await?;
        if self.recall && !files.is_empty() {
            self.files.lock().await.insert(id.clone(), files);
        }
        Ok(vec![id])
    }

    async fn delete_message(&self, id: &str) -> anyhow::Result<()> {
        let files = self.files.lock().await.remove(id).unwrap_or_default();
        for path in files {
            tokio::fs::remove_file(&path)
                .await
                .with_context(|| format!("Failed to remove {}", path.display()))?;
            debug!("Removed {}", path.display());
        }
        println!("[recalled message {id}]");
        Ok(())
    }
}
