use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        source: reqwest::Error,
    },

    #[error("no IPv4 address in response from {endpoint} (status {status})")]
    NoAddress {
        endpoint: String,
        status: reqwest::StatusCode,
    },
}
