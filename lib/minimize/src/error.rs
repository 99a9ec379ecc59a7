use serde_json::Value;

/// The error type of the wrapped minifier, passed through without modification.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Configuration errors raised while setting up the plugin.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("Invalid minimize implementation: none was supplied")]
    MissingImplementation,

    #[error("Invalid comment pattern `{pattern}`: {message}")]
    CommentPattern { pattern: String, message: String },

    #[error("Invalid value for option `{key}`: {value}")]
    InvalidOption { key: &'static str, value: Value },
}
