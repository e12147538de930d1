use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Definition error: {0}")]
    Definition(String),

    #[error("Environment error: {0}")]
    Environment(String),

    #[error("Invalid request template: {0}")]
    RequestTemplate(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Session is not bound to a definition")]
    Unbound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Failure reported by a [`Transport`](crate::http::Transport) while performing an exchange.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Connect,
    Timeout,
    Redirect,
    Body,
    Request,
    Other,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connect, message)
    }
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Connect => "connect",
            Self::Timeout => "timeout",
            Self::Redirect => "redirect",
            Self::Body => "body",
            Self::Request => "request",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}
