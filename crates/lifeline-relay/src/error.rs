use thiserror::Error;

/// Errors returned by the outbound relay clients.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote service answered with a status the client does not accept.
    #[error("unexpected status {status} from {context}")]
    UnexpectedStatus {
        status: reqwest::StatusCode,
        context: String,
    },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The completion service answered without any usable text.
    #[error("completion response contained no text")]
    EmptyCompletion,

    /// The client configuration is unusable (bad base URL, bad model name).
    #[error("invalid relay configuration: {0}")]
    Config(String),
}
