/// Errors raised while listing a project's instances. Any of these aborts the
/// current discovery cycle; nothing fetched so far is kept.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to request access token: {0}")]
    Token(#[source] reqwest::Error),
    #[error("metadata server refused access token request with status {status}")]
    TokenStatus { status: u16 },
    #[error("failed to list instances in `{project}`: {source}")]
    Request {
        project: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("listing instances in `{project}` returned status {status}: {body}")]
    Status {
        project: String,
        status: u16,
        body: String,
    },
    #[error("failed to decode instance list for `{project}`: {source}")]
    Decode {
        project: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
