use thiserror::Error;

/// Failure of a single REST operation against the capture service. Every
/// network call in this crate returns exactly one of these; there are no
/// per-call-site error callbacks.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("couldn't reach the service:\n{0}")]
    Transport(#[from] reqwest::Error),

    #[error("'{0}' answered with HTTP status {1}")]
    Status(Box<str>, u16),

    #[error("couldn't decode the response from '{0}':\n{1}")]
    Decode(Box<str>, serde_json::Error),

    #[error("invalid endpoint URL:\n{0}")]
    Endpoint(#[from] url::ParseError),

    #[error("endpoint '{0}' cannot carry an item path")]
    Opaque(Box<str>),

    #[error("the service description is missing the '{0}' endpoint")]
    MissingEndpoint(&'static str),
}

/// A precondition of task creation left unmet by the current selection.
/// The messages are user-facing; each names the field that needs attention.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("please select a submitter")]
    NoSubmitter,

    #[error("please select a target assay or study")]
    NoTarget,

    #[error("please select a source directory")]
    NoDirectory,

    #[error("please select a more specific directory")]
    DirectoryTooCoarse,
}

#[derive(Debug, Error)]
pub enum CapstanError {
    #[error("error while loading reference data:\n{0}")]
    Load(#[from] ApiError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("error while creating the task:\n{0}")]
    Create(ApiError),

    #[error("redraw hook:\n{0}")]
    Redraw(anyhow::Error),

    #[error("no endpoints configured; set a base URL or an explicit endpoint set")]
    Unconfigured,
}
