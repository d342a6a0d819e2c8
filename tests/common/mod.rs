#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use axum::Router;
use base64::Engine;
use base64::engine::general_purpose;
use nai_draw::chat::{ChatSession, MessageId, OutgoingMessage};
use tokio::sync::Mutex;

/// A request seen by the mock service.
#[derive(Clone, Debug)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub body: String,
}

pub type RequestLog = Arc<Mutex<Vec<Recorded>>>;

/// Session that keeps everything it is asked to send or delete.
#[derive(Clone, Debug, Default)]
pub struct RecordingSession {
    sent: Arc<Mutex<Vec<OutgoingMessage>>>,
    deleted: Arc<Mutex<Vec<MessageId>>>,
}

impl RecordingSession {
    pub async fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn deleted(&self) -> Vec<MessageId> {
        self.deleted.lock().await.clone()
    }

    pub async fn last(&self) -> OutgoingMessage {
        self.sent
            .lock()
            .await
            .last()
            .cloned()
            .expect("at least one message")
    }
}

impl ChatSession for RecordingSession {
    async fn send(&self, message: OutgoingMessage) -> anyhow::Result<Vec<MessageId>> {
        let mut sent = self.sent.lock().await;
        sent.push(message);
        Ok(vec![format!("msg-{}", sent.len() - 1)])
    }

    async fn delete_message(&self, id: &str) -> anyhow::Result<()> {
        self.deleted.lock().await.push(id.to_string());
        Ok(())
    }
}

/// Serves `app` on an ephemeral local port, returning its base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve mock");
    });
    format!("http://{addr}")
}

/// Base URL of a port nothing listens on.
pub async fn closed_endpoint() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}")
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::new_rgb8(width, height)
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}

pub fn data_url(bytes: &[u8]) -> String {
    format!(
        "data:image/png;base64,{}",
        general_purpose::STANDARD.encode(bytes)
    )
}
