//! crates/adhd_game_core/src/card.rs
//!
//! The per-quest submission state machine behind a quest card:
//! `Idle -> AwaitingInput -> Submitting -> Completed | Failed`.
//!
//! A card owns at most one in-flight completion. The in-flight flag is raised before
//! the channel call and lowered by a guard on every exit path, including the submit
//! future being dropped.

use crate::completion::{BuildError, CompletionAttempt, EditState};
use crate::domain::{CompletionRequest, CompletionResponse, IdempotencyKey, Quest, QuestMode, UserContext};
use crate::points::Points;
use crate::ports::{SubmissionChannel, SubmissionError};
use crate::reward::{preview_reward, RewardPreview};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Submission state, as published to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    AwaitingInput,
    Submitting,
    Completed {
        awarded_points: Points,
        streak_count: Option<u32>,
    },
    Failed {
        error: SubmissionError,
    },
}

impl SubmissionState {
    pub fn name(&self) -> &'static str {
        match self {
            SubmissionState::Idle => "idle",
            SubmissionState::AwaitingInput => "awaiting input",
            SubmissionState::Submitting => "submitting",
            SubmissionState::Completed { .. } => "completed",
            SubmissionState::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CardError {
    #[error("A completion for this quest is already in flight")]
    SubmissionInFlight,
    #[error("Cannot {action} while the card is {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },
    #[error("{0} quests need progress before they can be submitted")]
    InputRequired(QuestMode),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

#[derive(Default)]
struct CardInner {
    edit: Option<EditState>,
    attempt: Option<CompletionAttempt>,
}

pub struct QuestCard {
    quest: Quest,
    inner: Mutex<CardInner>,
    state: watch::Sender<SubmissionState>,
    in_flight: AtomicBool,
}

impl QuestCard {
    pub fn new(quest: Quest) -> Self {
        let (state, _) = watch::channel(SubmissionState::Idle);
        Self {
            quest,
            inner: Mutex::new(CardInner::default()),
            state,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn quest(&self) -> &Quest {
        &self.quest
    }

    pub fn state(&self) -> SubmissionState {
        self.state.borrow().clone()
    }

    /// Receives every state change from now on.
    pub fn subscribe(&self) -> watch::Receiver<SubmissionState> {
        self.state.subscribe()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// The key kept from a transiently failed submission, reused by the next submit.
    pub fn retained_key(&self) -> Option<IdempotencyKey> {
        self.lock().attempt.as_ref().map(CompletionAttempt::key)
    }

    /// Opens the input dialog. `BINARY` quests have no input and stay idle.
    pub fn begin(&self) -> Result<(), CardError> {
        let mut inner = self.lock();
        match self.state() {
            SubmissionState::Idle => {}
            SubmissionState::AwaitingInput => return Ok(()),
            other => {
                return Err(CardError::InvalidState {
                    action: "begin",
                    state: other.name(),
                })
            }
        }
        if !self.quest.mode.requires_input() {
            return Ok(());
        }
        inner.edit.get_or_insert(EditState::initial(self.quest.mode));
        self.state.send_replace(SubmissionState::AwaitingInput);
        Ok(())
    }

    /// Replaces the dialog's edit state. Changing the input after a transient failure
    /// starts a new logical submission, so the retained key is dropped.
    pub fn set_input(&self, edit: EditState) -> Result<(), CardError> {
        let mut inner = self.lock();
        let state = self.state();
        if state != SubmissionState::AwaitingInput {
            return Err(CardError::InvalidState {
                action: "change input",
                state: state.name(),
            });
        }
        if edit.mode() != self.quest.mode {
            return Err(BuildError::EditStateMismatch {
                quest_id: self.quest.id.clone(),
                expected: self.quest.mode,
                actual: edit.mode(),
            }
            .into());
        }
        if inner.attempt.is_some() && inner.edit != Some(edit) {
            debug!(quest_id = %self.quest.id, "Input changed, discarding retained idempotency key");
            inner.attempt = None;
        }
        inner.edit = Some(edit);
        Ok(())
    }

    /// Reward preview for whatever the dialog currently holds.
    pub fn preview(&self) -> RewardPreview {
        let progress = self.lock().edit.and_then(|edit| edit.progress());
        preview_reward(&self.quest, progress)
    }

    /// Closes the dialog without confirming. Never produces a key.
    pub fn cancel(&self) -> Result<(), CardError> {
        let mut inner = self.lock();
        match self.state() {
            SubmissionState::Idle | SubmissionState::AwaitingInput => {
                *inner = CardInner::default();
                self.state.send_replace(SubmissionState::Idle);
                Ok(())
            }
            other => Err(CardError::InvalidState {
                action: "cancel",
                state: other.name(),
            }),
        }
    }

    /// Acknowledges a finished submission so the quest can be completed again.
    pub fn reset(&self) -> Result<(), CardError> {
        let mut inner = self.lock();
        match self.state() {
            SubmissionState::Submitting => Err(CardError::InvalidState {
                action: "reset",
                state: "submitting",
            }),
            _ => {
                *inner = CardInner::default();
                self.state.send_replace(SubmissionState::Idle);
                Ok(())
            }
        }
    }

    /// The user's confirmation: builds the request (minting a key unless one is
    /// retained) and hands it to `channel`.
    ///
    /// Transient failures leave the key and input in place for a user-initiated retry.
    /// Terminal failures move the card to `Failed` and are never retried here.
    pub async fn submit<C>(
        &self,
        channel: &C,
        user: &UserContext,
    ) -> Result<CompletionResponse, CardError>
    where
        C: SubmissionChannel + ?Sized,
    {
        let mut guard = InFlightGuard::acquire(self).ok_or(CardError::SubmissionInFlight)?;
        let request = self.prepare()?;

        info!(
            quest_id = %self.quest.id,
            idempotency_key = %request.idempotency_key(),
            "Submitting completion"
        );
        let outcome = channel
            .submit_completion(user, &self.quest.id, &request)
            .await;

        let result = {
            let mut inner = self.lock();
            match outcome {
                Ok(response) => {
                    info!(
                        quest_id = %self.quest.id,
                        awarded_points = %response.awarded_points,
                        "Completion accepted"
                    );
                    *inner = CardInner::default();
                    self.state.send_replace(SubmissionState::Completed {
                        awarded_points: response.awarded_points,
                        streak_count: response.streak_count,
                    });
                    Ok(response)
                }
                Err(error) if error.is_transient() => {
                    warn!(
                        quest_id = %self.quest.id,
                        idempotency_key = %request.idempotency_key(),
                        "Completion failed, key retained for retry: {}",
                        error
                    );
                    self.state.send_replace(self.resting_state(&inner));
                    Err(CardError::Submission(error))
                }
                Err(error) => {
                    warn!(quest_id = %self.quest.id, "Completion rejected: {}", error);
                    inner.attempt = None;
                    self.state.send_replace(SubmissionState::Failed {
                        error: error.clone(),
                    });
                    Err(CardError::Submission(error))
                }
            }
        };
        guard.settle();
        result
    }

    fn prepare(&self) -> Result<CompletionRequest, CardError> {
        let mut inner = self.lock();
        let state = self.state();
        if !matches!(state, SubmissionState::Idle | SubmissionState::AwaitingInput) {
            return Err(CardError::InvalidState {
                action: "submit",
                state: state.name(),
            });
        }
        let edit = match inner.edit {
            Some(edit) => edit,
            None if !self.quest.mode.requires_input() => EditState::Confirm,
            None => return Err(CardError::InputRequired(self.quest.mode)),
        };
        if inner.attempt.is_some() {
            debug!(quest_id = %self.quest.id, "Reusing retained idempotency key");
        }
        let request = inner
            .attempt
            .get_or_insert_with(|| CompletionAttempt::confirm(&self.quest))
            .build(&self.quest, &edit)?;
        self.state.send_replace(SubmissionState::Submitting);
        Ok(request)
    }

    // Where the card rests between attempts: input modes keep their dialog open.
    fn resting_state(&self, inner: &CardInner) -> SubmissionState {
        if self.quest.mode.requires_input() && inner.edit.is_some() {
            SubmissionState::AwaitingInput
        } else {
            SubmissionState::Idle
        }
    }

    fn lock(&self) -> MutexGuard<'_, CardInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Holds the card's in-flight flag for the duration of one submit call.
struct InFlightGuard<'a> {
    card: &'a QuestCard,
    settled: bool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(card: &'a QuestCard) -> Option<Self> {
        card.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                card,
                settled: false,
            })
    }

    fn settle(&mut self) {
        self.settled = true;
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            // Dropped mid-flight: the outcome is unknown, so treat it like a transient
            // failure and keep the key.
            let inner = self.card.lock();
            if self.card.state() == SubmissionState::Submitting {
                self.card
                    .state
                    .send_replace(self.card.resting_state(&inner));
            }
        }
        self.card.in_flight.store(false, Ordering::Release);
    }
}
