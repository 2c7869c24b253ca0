//! Error types for the environment, agent and configuration

use thiserror::Error;

/// Errors raised by the IPD environment, the Q-learner and config loading.
///
/// Every variant is a caller contract violation; nothing here is retried.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum IpdError {
    #[error("invalid observation ({agent}, {opponent}): both components must be 0 or 1")]
    InvalidObservation { agent: u8, opponent: u8 },

    #[error("invalid action {value}: expected 0 (cooperate) or 1 (defect)")]
    InvalidAction { value: u8 },

    #[error("opponent strategy pool is empty")]
    EmptyStrategyPool,

    #[error("invalid parameter {name} = {value}: expected {expected}")]
    InvalidParameter {
        name: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("step called before reset")]
    EpisodeNotStarted,

    #[error("episode already finished after {rounds} rounds")]
    EpisodeFinished { rounds: u32 },

    #[error("unknown strategy '{name}'")]
    UnknownStrategy { name: String },

    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

impl IpdError {
    pub(crate) fn parameter(
        name: &'static str,
        value: impl ToString,
        expected: &'static str,
    ) -> Self {
        Self::InvalidParameter {
            name,
            value: value.to_string(),
            expected,
        }
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, IpdError>;
