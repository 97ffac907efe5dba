//! crates/adhd_game_core/src/completion.rs
//!
//! Turns a user's edit state into a `CompletionRequest` and owns the rule that an
//! idempotency key is minted once per confirmation, never per retry.

use crate::domain::{
    CompletionPayload, CompletionRequest, IdempotencyKey, Quest, QuestId, QuestMode,
};
use crate::reward::{clamp_minutes, clamp_percent};

/// What the input dialog holds at the moment the user confirms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditState {
    /// Bare confirmation, for `BINARY` quests.
    Confirm,
    /// Slider position in percent, for `PARTIAL` quests.
    Slider { percent: f64 },
    /// Minutes entered, for `PER_MINUTE` quests.
    Minutes { minutes: i64 },
}

impl EditState {
    pub const DEFAULT_SLIDER_PERCENT: f64 = 50.0;
    pub const DEFAULT_MINUTES: i64 = 30;

    /// The edit state an input dialog opens with for `mode`.
    pub fn initial(mode: QuestMode) -> Self {
        match mode {
            QuestMode::Binary => EditState::Confirm,
            QuestMode::Partial => EditState::Slider {
                percent: Self::DEFAULT_SLIDER_PERCENT,
            },
            QuestMode::PerMinute => EditState::Minutes {
                minutes: Self::DEFAULT_MINUTES,
            },
        }
    }

    /// The mode this edit state belongs to.
    pub fn mode(&self) -> QuestMode {
        match self {
            EditState::Confirm => QuestMode::Binary,
            EditState::Slider { .. } => QuestMode::Partial,
            EditState::Minutes { .. } => QuestMode::PerMinute,
        }
    }

    /// Progress value as the reward calculator expects it.
    pub fn progress(&self) -> Option<f64> {
        match self {
            EditState::Confirm => None,
            EditState::Slider { percent } => Some(*percent),
            EditState::Minutes { minutes } => Some(*minutes as f64),
        }
    }
}

/// Structural problems with an edit state. These point at a UI defect, not bad user data.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    #[error("quest {quest_id} is {expected} but the edit state is for {actual}")]
    EditStateMismatch {
        quest_id: QuestId,
        expected: QuestMode,
        actual: QuestMode,
    },
    #[error("attempt belongs to quest {attempt_quest}, not {quest_id}")]
    QuestMismatch {
        attempt_quest: QuestId,
        quest_id: QuestId,
    },
}

/// Packages `edit` for `quest` under `key`. Percent is clamped to `[0, 100]` and sent as
/// a `0..1` ratio; minutes are clamped to be non-negative.
pub fn build(
    quest: &Quest,
    edit: &EditState,
    key: IdempotencyKey,
) -> Result<CompletionRequest, BuildError> {
    let payload = match (quest.mode, edit) {
        (QuestMode::Binary, EditState::Confirm) => CompletionPayload::Binary {},
        (QuestMode::Partial, EditState::Slider { percent }) => CompletionPayload::Partial {
            completion_ratio: clamp_percent(*percent) / 100.0,
        },
        (QuestMode::PerMinute, EditState::Minutes { minutes }) => CompletionPayload::PerMinute {
            minutes: clamp_minutes(*minutes as f64),
        },
        (expected, edit) => {
            return Err(BuildError::EditStateMismatch {
                quest_id: quest.id.clone(),
                expected,
                actual: edit.mode(),
            })
        }
    };
    Ok(CompletionRequest::new(key, payload))
}

/// One user confirmation of one quest. The key is fixed for the attempt's lifetime, so
/// every request built from it (including retries) carries the same token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionAttempt {
    quest_id: QuestId,
    key: IdempotencyKey,
}

impl CompletionAttempt {
    /// Starts an attempt for `quest` with a freshly generated key.
    pub fn confirm(quest: &Quest) -> Self {
        Self {
            quest_id: quest.id.clone(),
            key: IdempotencyKey::generate(),
        }
    }

    pub fn quest_id(&self) -> &QuestId {
        &self.quest_id
    }

    pub fn key(&self) -> IdempotencyKey {
        self.key
    }

    pub fn build(&self, quest: &Quest, edit: &EditState) -> Result<CompletionRequest, BuildError> {
        if quest.id != self.quest_id {
            return Err(BuildError::QuestMismatch {
                attempt_quest: self.quest_id.clone(),
                quest_id: quest.id.clone(),
            });
        }
        build(quest, edit, self.key)
    }
}
