//! Alert message templates

/// Message body in one of the supported renderings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    Plain(String),
    Html(String),
}

impl MessageBody {
    /// Body text regardless of rendering
    pub fn as_str(&self) -> &str {
        match self {
            MessageBody::Plain(s) | MessageBody::Html(s) => s,
        }
    }

    pub fn is_html(&self) -> bool {
        matches!(self, MessageBody::Html(_))
    }
}

/// A rendered subject and body, ready to address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub subject: String,
    pub body: MessageBody,
}

impl RenderedMessage {
    /// Plain-text message
    pub fn plain(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: MessageBody::Plain(body.into()),
        }
    }

    /// HTML message
    pub fn html(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: MessageBody::Html(body.into()),
        }
    }
}

/// Alert templates
#[derive(Debug, Clone, PartialEq)]
pub enum AlertTemplate {
    /// The subscriber's location is in a danger zone
    DangerZone { x: f64, y: f64 },
}

/// Subject line for danger alerts
pub const DANGER_SUBJECT: &str = "⚠️ Danger Alert for Your Location";

impl AlertTemplate {
    /// Render as plain text or HTML
    pub fn render(&self, html: bool) -> RenderedMessage {
        match self {
            AlertTemplate::DangerZone { x, y } => {
                if html {
                    let body = format!(
                        "<html><body>\
                        <h2>Danger Alert</h2>\
                        <p><strong>Warning:</strong> your registered location \
                        <code>({}, {})</code> is currently in a danger zone.</p>\
                        <p>Please take appropriate precautions.</p>\
                        </body></html>",
                        x, y
                    );
                    RenderedMessage::html(DANGER_SUBJECT, body)
                } else {
                    let body = format!(
                        "Warning: Your registered location ({}, {}) is currently in a danger zone.\n\
                        Please take appropriate precautions.\n",
                        x, y
                    );
                    RenderedMessage::plain(DANGER_SUBJECT, body)
                }
            }
        }
    }
}
