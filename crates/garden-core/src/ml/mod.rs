//! Model collaborators: yield prediction and the remote model server used by
//! the experimental combined schedule.
//!
//! Inference itself happens elsewhere; this module only defines how the
//! planner talks to a model and what it does when there is none.

pub mod remote;
pub mod yield_model;

use std::path::PathBuf;

pub use remote::HttpModelClient;
pub use yield_model::{FALLBACK_YIELD, LinearYieldModel, YieldContext, YieldModel, YieldPredictor};

/// Errors from loading or calling a model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model is not configured")]
    Unavailable,

    #[error("failed to read model file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid model definition: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("model server request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("model returned {got} results for {expected} inputs")]
    BatchSize { expected: usize, got: usize },
}
