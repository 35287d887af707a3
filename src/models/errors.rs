use std::fmt;

use thiserror::Error;

/// Workflow stages, used to tag failures on the processing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Metadata,
    Image,
    Print,
    Burn,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Metadata => "metadata",
            Stage::Image => "image",
            Stage::Print => "print",
            Stage::Burn => "burn",
        };
        f.write_str(s)
    }
}

/// Malformed or irrelevant ingress input. Dropped and warned at the adapter,
/// never surfaced past it.
#[derive(Error, Debug)]
pub enum IngressParseError {
    #[error("activity record missing required field: {field}")]
    MissingField { field: &'static str },
    #[error("invalid contract address {value:?}: {reason}")]
    InvalidAddress { value: String, reason: String },
    #[error("invalid token id {value:?}")]
    InvalidTokenId { value: String },
    #[error("log has {got} topics, expected 4")]
    TopicCount { got: usize },
    #[error("log topic0 does not match the Transfer signature")]
    SignatureMismatch,
    #[error("log destination topic does not match the monitored wallet")]
    DestinationMismatch,
}

/// Chain-side failure from a contract read or write.
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("rpc error: {0}")]
    Rpc(String),
    #[error("signing credential not configured")]
    NoSigner,
}

/// HTTP content fetch failure (metadata document or image payload).
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("document not parseable: {0}")]
    Parse(String),
    #[error("empty payload")]
    Empty,
}

/// Print submission failure.
#[derive(Error, Debug)]
pub enum PrintError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("print endpoint returned status {0}")]
    Status(u16),
    #[error("stored image unreadable: {0}")]
    Io(#[from] std::io::Error),
}

/// Two-tier burn failure. Logged and surfaced, but never rolls back a
/// `Printed` outcome.
#[derive(Error, Debug)]
pub enum BurnError {
    #[error("no signing credential configured for burning")]
    NoCredential,
    #[error("all burn attempts failed; native: {native}; fallback: {fallback}")]
    Exhausted { native: String, fallback: String },
}

/// The metadata stage can fail on either side of its boundary: the chain read
/// for the token URI or the HTTP fetch of the document itself.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// The image stage touches the network and the local filesystem.
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("metadata document has no image field")]
    MissingLocator,
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("failed to persist image: {0}")]
    Io(#[from] std::io::Error),
}

/// Workflow stage failure. The record stays resumable at the last successful
/// checkpoint.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("metadata stage failed for token {token_id}: {source}")]
    Metadata {
        token_id: String,
        #[source]
        source: MetadataError,
    },
    #[error("image stage failed for token {token_id}: {source}")]
    Image {
        token_id: String,
        #[source]
        source: ImageError,
    },
    #[error("print stage failed for token {token_id}: {source}")]
    Print {
        token_id: String,
        #[source]
        source: PrintError,
    },
    #[error("burn stage failed for token {token_id}: {source}")]
    Burn {
        token_id: String,
        #[source]
        source: BurnError,
    },
}

impl WorkflowError {
    pub fn stage(&self) -> Stage {
        match self {
            WorkflowError::Metadata { .. } => Stage::Metadata,
            WorkflowError::Image { .. } => Stage::Image,
            WorkflowError::Print { .. } => Stage::Print,
            WorkflowError::Burn { .. } => Stage::Burn,
        }
    }
}
