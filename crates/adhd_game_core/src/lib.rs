pub mod card;
pub mod completion;
pub mod domain;
pub mod points;
pub mod ports;
pub mod reward;

pub use card::{CardError, QuestCard, SubmissionState};
pub use completion::{build, BuildError, CompletionAttempt, EditState};
pub use domain::{
    CompletionPayload, CompletionRequest, CompletionResponse, DungeonId, IdempotencyKey, Quest,
    QuestCategory, QuestDifficulty, QuestId, QuestMode, QuestStatus, UserContext,
};
pub use points::{ParsePointsError, Points};
pub use ports::{
    classify_status, FailureKind, PortError, PortResult, QuestSource, SubmissionChannel,
    SubmissionError, SubmissionResult,
};
pub use reward::{
    check_minute_bounds, max_reward, parse_progress, preview_reward, MinuteBounds,
    RewardPreview, ValidationError,
};
