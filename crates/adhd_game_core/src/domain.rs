//! crates/adhd_game_core/src/domain.rs
//!
//! Defines the core data structures shared by the reward calculator, the completion
//! builder and the ports. Field names follow the JSON records exchanged with the API.

use crate::points::{lenient, Points};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

//=========================================================================================
// Identifiers & Context
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DungeonId(pub String);

impl fmt::Display for QuestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl fmt::Display for DungeonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// The caller's identity, passed explicitly into every port call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    user_id: String,
}

impl UserContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

/// Token attached to a completion so that the server can drop duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(Uuid);

impl IdempotencyKey {
    /// A fresh random (v4) key.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

//=========================================================================================
// Quest Configuration
//=========================================================================================

/// How a quest's reward is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestMode {
    Binary,
    Partial,
    PerMinute,
}

impl QuestMode {
    /// Whether the user has to report progress before submitting.
    pub fn requires_input(&self) -> bool {
        !matches!(self, QuestMode::Binary)
    }

    pub fn action_label(&self) -> &'static str {
        match self {
            QuestMode::Binary => "Complete",
            QuestMode::Partial => "Log Progress",
            QuestMode::PerMinute => "Log Time",
        }
    }
}

impl fmt::Display for QuestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            QuestMode::Binary => "BINARY",
            QuestMode::Partial => "PARTIAL",
            QuestMode::PerMinute => "PER_MINUTE",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestCategory {
    Daily,
    Weekly,
    #[default]
    Adhoc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestDifficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestStatus {
    #[default]
    Active,
    Paused,
    Archived,
}

/// Immutable configuration for a repeatable task, as published by the quest source.
///
/// Numeric fields are read leniently: an admin-entered value that is missing or not a
/// number becomes zero (or "absent" for optional fields) instead of rejecting the quest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quest {
    pub id: QuestId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: QuestCategory,
    #[serde(default)]
    pub difficulty: QuestDifficulty,
    pub mode: QuestMode,
    #[serde(default, deserialize_with = "lenient::points_or_zero")]
    pub points_award: Points,
    #[serde(
        default,
        deserialize_with = "lenient::optional_points",
        skip_serializing_if = "Option::is_none"
    )]
    pub rate_points_per_min: Option<Points>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_minutes: Option<u32>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_points",
        skip_serializing_if = "Option::is_none"
    )]
    pub daily_points_cap: Option<Points>,
    #[serde(default)]
    pub cooldown_sec: u64,
    #[serde(default)]
    pub streak_enabled: bool,
    #[serde(default)]
    pub status: QuestStatus,
}

impl Quest {
    /// A minimal quest of the given mode; the remaining fields take their defaults.
    pub fn new(id: impl Into<String>, mode: QuestMode, points_award: Points) -> Self {
        Self {
            id: QuestId(id.into()),
            title: String::new(),
            description: String::new(),
            category: QuestCategory::default(),
            difficulty: QuestDifficulty::default(),
            mode,
            points_award,
            rate_points_per_min: None,
            min_minutes: None,
            max_minutes: None,
            daily_points_cap: None,
            cooldown_sec: 0,
            streak_enabled: false,
            status: QuestStatus::default(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == QuestStatus::Active
    }
}

//=========================================================================================
// Completion Records
//=========================================================================================

/// Mode-specific body of a completion. Each variant carries exactly the fields valid
/// for its mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CompletionPayload {
    Binary {},
    Partial { completion_ratio: f64 },
    PerMinute { minutes: u32 },
}

impl CompletionPayload {
    pub fn mode(&self) -> QuestMode {
        match self {
            CompletionPayload::Binary {} => QuestMode::Binary,
            CompletionPayload::Partial { .. } => QuestMode::Partial,
            CompletionPayload::PerMinute { .. } => QuestMode::PerMinute,
        }
    }
}

/// A single submission attempt for one quest. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    idempotency_key: IdempotencyKey,
    #[serde(flatten)]
    payload: CompletionPayload,
}

impl CompletionRequest {
    pub(crate) fn new(idempotency_key: IdempotencyKey, payload: CompletionPayload) -> Self {
        Self {
            idempotency_key,
            payload,
        }
    }

    pub fn idempotency_key(&self) -> IdempotencyKey {
        self.idempotency_key
    }

    pub fn payload(&self) -> &CompletionPayload {
        &self.payload
    }
}

/// What the submission channel reports back after accepting a completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub awarded_points: Points,
    pub submitted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streak_count: Option<u32>,
}
