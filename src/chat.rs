//! Chat surface the commands talk to.
//!
//! The chat framework itself is not part of this crate. Commands only see a
//! [`ChatSession`], which sends [`OutgoingMessage`]s and can delete them
//! again.

use std::future::Future;
use std::sync::LazyLock;

use regex::Regex;

/// Identifier of a sent message, as handed out by the session.
pub type MessageId = String;

#[allow(clippy::expect_used)]
static IMAGE_MARKUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<(?:image|img)\b[^>]*?\b(?:url|src)="([^"]*)"[^>]*>"#).expect("image markup pattern")
});

/// A message the plugin wants to post.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OutgoingMessage {
    /// Plain text.
    Text(String),
    /// Text quoting the message that invoked the command.
    Quote(String),
    /// An image, as encoded bytes.
    Image(Vec<u8>),
    /// Several messages bundled into one forwarded message.
    Forward(Vec<OutgoingMessage>),
}

impl OutgoingMessage {
    /// Shorthand for [`OutgoingMessage::Text`].
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Shorthand for [`OutgoingMessage::Quote`].
    pub fn quote(text: impl Into<String>) -> Self {
        Self::Quote(text.into())
    }
}

/// One conversation a command was invoked from.
pub trait ChatSession: Clone + Send + Sync + 'static {
    /// Posts a message, returning the ids it was stored under.
    fn send(
        &self,
        message: OutgoingMessage,
    ) -> impl Future<Output = anyhow::Result<Vec<MessageId>>> + Send;

    /// Deletes a previously sent message.
    fn delete_message(&self, id: &str) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Removes inline `<image url="..."/>` markup from `input`.
///
/// Returns the remaining text and the URL of the first image found.
pub fn extract_image(input: &str) -> (String, Option<String>) {
    let url = IMAGE_MARKUP
        .captures(input)
        .and_then(|captures| captures.get(1))
        .map(|url| html_escape::decode_html_entities(url.as_str()).to_string());
    let rest = IMAGE_MARKUP.replace_all(input, "").to_string();
    (rest, url)
}

/// Splits a command line on whitespace. Double quotes group words and are
/// dropped; `<...>` markup is kept whole, quotes included.
pub fn split_args(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_markup = false;
    let mut quoted = false;

    for c in line.chars() {
        match c {
            '<' if !quoted => {
                in_markup = true;
                current.push(c);
            }
            '>' if in_markup => {
                in_markup = false;
                current.push(c);
            }
            '"' if !in_markup => quoted = !quoted,
            c if c.is_whitespace() && !in_markup && !quoted => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        args.push(current);
    }
    args
}
