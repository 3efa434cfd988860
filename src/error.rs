use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `charachat`.
///
/// The reply pipeline itself never fails; these variants cover the outer
/// surfaces (config, storage, the chat endpoint, user-supplied data). Library
/// callers can match on them to decide what to show the user; application glue
/// keeps using `anyhow::Result` for context chains.
#[derive(Debug, Error)]
pub enum CharaError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Key-value storage ───────────────────────────────────────────────
    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    // ── Chat endpoint ───────────────────────────────────────────────────
    #[error("chat: {0}")]
    Chat(#[from] ChatError),

    // ── User-facing validation ──────────────────────────────────────────
    #[error("validation: {0}")]
    Validation(#[from] ValidationError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Storage errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("invalid key {key:?}: only [A-Za-z0-9_-] is allowed")]
    InvalidKey { key: String },
}

// ─── Chat endpoint errors ───────────────────────────────────────────────────

/// Terminal failures of a single chat turn. None of these are retried.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("API key not set; add it to config.toml or export CHARACHAT_API_KEY")]
    MissingApiKey,

    #[error("request failed: {message}")]
    Request { message: String },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("request cancelled")]
    Cancelled,

    #[error("endpoint returned no completion")]
    EmptyResponse,

    #[error("invalid API config: {0}")]
    InvalidConfig(#[from] ValidationError),
}

impl ChatError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

// ─── Validation errors ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("character field `{field}` {reason}")]
    Character { field: &'static str, reason: String },

    #[error("api field `{field}` {reason}")]
    ApiConfig { field: &'static str, reason: String },

    #[error("generated character data rejected: {reason}")]
    GeneratedData { reason: String },
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, CharaError>;
