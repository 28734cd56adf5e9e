use thiserror::Error;

#[derive(Error, Debug)]
pub enum OverwatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDeserialize(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Malformed tool call: {0}")]
    MalformedToolCall(String),

    /// The judge model produced no usable decision. The batch must not run.
    #[error("Judge unavailable: {0}")]
    JudgeUnavailable(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Page error: {0}")]
    Page(String),

    #[error("CDP error: {0}")]
    Cdp(String),
}

pub type Result<T> = std::result::Result<T, OverwatchError>;
