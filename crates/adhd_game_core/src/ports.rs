//! crates/adhd_game_core/src/ports.rs
//!
//! Defines the service contracts (traits) the core talks to. Concrete transports live
//! in adapter crates, keeping the reward and completion logic independent of HTTP.

use crate::domain::{CompletionRequest, CompletionResponse, DungeonId, Quest, QuestId, UserContext};
use async_trait::async_trait;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// Errors from read-only ports such as the quest source.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Submission Errors
//=========================================================================================

/// Whether a failed submission may be retried with the same idempotency key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transient,
    Terminal,
}

/// Classifies a non-success HTTP-style status code.
pub fn classify_status(status: u16) -> FailureKind {
    match status {
        408 | 425 | 429 | 500..=599 => FailureKind::Transient,
        _ => FailureKind::Terminal,
    }
}

/// Failures reported by the submission channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    /// The request may not have reached the server.
    #[error("Network error: {0}")]
    Network(String),
    /// The server answered with a non-success status; `message` is its body, verbatim.
    #[error("{message} (status {status})")]
    Rejected { status: u16, message: String },
    /// The server accepted the request but its reply could not be read.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl SubmissionError {
    pub fn kind(&self) -> FailureKind {
        match self {
            SubmissionError::Network(_) | SubmissionError::InvalidResponse(_) => {
                FailureKind::Transient
            }
            SubmissionError::Rejected { status, .. } => classify_status(*status),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == FailureKind::Transient
    }
}

pub type SubmissionResult<T> = Result<T, SubmissionError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait SubmissionChannel: Send + Sync {
    /// Submits one completion. Implementations must send `request` unchanged so that its
    /// idempotency key is what the server deduplicates on.
    async fn submit_completion(
        &self,
        user: &UserContext,
        quest_id: &QuestId,
        request: &CompletionRequest,
    ) -> SubmissionResult<CompletionResponse>;
}

#[async_trait]
pub trait QuestSource: Send + Sync {
    /// Lists the quests configured for a dungeon.
    async fn list_quests(&self, user: &UserContext, dungeon_id: &DungeonId) -> PortResult<Vec<Quest>>;
}
