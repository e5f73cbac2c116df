use std::path::PathBuf;

/// Result alias that carries the custom [`TardisError`] type.
pub type Result<T> = std::result::Result<T, TardisError>;

/// What kind of asset failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Animation,
    Audio,
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetKind::Animation => f.write_str("animation"),
            AssetKind::Audio => f.write_str("audio"),
        }
    }
}

/// Common error type for the core crate.
///
/// None of these are fatal to the presentation loop: callers log them and fall
/// back to an idle state.
#[derive(Debug, thiserror::Error)]
pub enum TardisError {
    /// An animation or audio asset does not resolve.
    #[error("{kind} asset not found: {}", path.display())]
    NotFound { kind: AssetKind, path: PathBuf },
    /// A catalog lookup matched nothing.
    #[error("title \"{0}\" not found")]
    SelectionNotFound(String),
    /// The audio backend never reached a playing state.
    #[error("audio backend did not start {} within {waited_ms} ms", path.display())]
    StartTimeout { path: PathBuf, waited_ms: u64 },
    /// An asset exists but could not be decoded.
    #[error("failed to decode {}: {message}", path.display())]
    Decode { path: PathBuf, message: String },
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Wrapper around configuration and catalog parse errors.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl TardisError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub fn not_found(kind: AssetKind, path: impl Into<PathBuf>) -> Self {
        Self::NotFound {
            kind,
            path: path.into(),
        }
    }

    pub fn decode(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        Self::Decode {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<&str> for TardisError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for TardisError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
