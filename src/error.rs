use std::{io, path::PathBuf};

use thiserror::Error;

/// The crate's result type.
pub type Result<T> = std::result::Result<T, TrainerError>;

/// All errors that can occur while orchestrating a training run.
#[derive(Debug, Error)]
pub enum TrainerError {
    /// The customer script lacks a function the requested operation needs.
    #[error("customer script defines none of: {}", .0.join(", "))]
    MissingFunction(Vec<&'static str>),

    /// An input function was invoked without its channel directory.
    #[error("input channel `{0}` was not provided")]
    MissingChannel(String),

    /// The current host is not part of the cluster.
    #[error("current host `{current_host}` is not one of the hosts {hosts:?}")]
    UnknownHost {
        current_host: String,
        hosts: Vec<String>,
    },

    /// The cluster was configured without any host.
    #[error("host list is empty")]
    NoHosts,

    /// The model path could not be parsed as an object storage URI.
    #[error("invalid model path `{0}`")]
    InvalidModelPath(String),

    /// The storage service could not tell where a bucket lives.
    #[error("failed to locate bucket `{bucket}`: {source}")]
    BucketLocation {
        bucket: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A platform configuration file is missing or malformed.
    #[error("invalid container config {}: {msg}", .path.display())]
    InvalidConfig { path: PathBuf, msg: String },

    /// Customer code or the training framework failed.
    #[error(transparent)]
    Framework(#[from] anyhow::Error),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
