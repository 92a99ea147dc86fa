use thiserror::Error;

use crate::status::Stage;

/// A submission that stopped at one of its external calls.
#[derive(Debug, Error)]
#[error("failed while {stage}")]
pub struct SubmitError {
    pub stage: Stage,
    #[source]
    pub source: anyhow::Error,
}

impl SubmitError {
    pub fn new(stage: Stage, source: anyhow::Error) -> Self {
        Self { stage, source }
    }

    /// Human-readable cause including the whole context chain.
    pub fn reason(&self) -> String {
        format!("{:#}", self.source)
    }
}
