use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("Camera error: {0}")]
    Camera(String),

    #[error("Camera is not streaming")]
    NotStreaming,

    #[error("Request rejected: {}", .0.as_deref().unwrap_or("no message"))]
    Rejected(Option<String>),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

/// How a failure is surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The service answered `success: false`.
    Application,
    /// The request never produced a usable answer.
    Transport,
    /// Capture device missing or access denied.
    Platform,
    Local,
}

impl ConsoleError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ConsoleError::Rejected(_) => FailureKind::Application,
            ConsoleError::Transport(_) | ConsoleError::InvalidResponse(_) => FailureKind::Transport,
            ConsoleError::Camera(_) | ConsoleError::NotStreaming => FailureKind::Platform,
            ConsoleError::Config(_)
            | ConsoleError::Io(_)
            | ConsoleError::Image(_)
            | ConsoleError::Other(_) => FailureKind::Local,
        }
    }

    /// Server-provided message of an application failure, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ConsoleError::Rejected(message) => message.as_deref(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConsoleError>;
