use adhd_game_core::{
    CompletionPayload, DungeonId, EditState, FailureKind, PortError, Points, Quest, QuestCard,
    QuestId, QuestMode, QuestSource, SubmissionChannel, SubmissionError, SubmissionState,
    UserContext,
};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use client_lib::{HttpApiAdapter, RetryConfig, RetryingChannel};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One completion the fake API received.
#[derive(Debug, Clone)]
struct Received {
    user_id: Option<String>,
    quest_id: String,
    body: Value,
}

/// Scripted replies for the completion endpoint, consumed in order. Once empty every
/// completion is accepted with 50 points.
#[derive(Default)]
struct FakeApi {
    replies: Mutex<VecDeque<(StatusCode, String)>>,
    received: Mutex<Vec<Received>>,
}

type Shared = Arc<FakeApi>;

fn user_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

async fn list_quests(Path(dungeon): Path<String>, headers: HeaderMap) -> Response {
    if user_header(&headers).is_none() {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if dungeon != "d1" {
        return (StatusCode::NOT_FOUND, "dungeon not found").into_response();
    }
    Json(json!([
        { "id": "q-binary", "title": "Make Your Bed", "mode": "BINARY", "points_award": "50" },
        { "id": "q-partial", "mode": "PARTIAL", "points_award": 100 },
        {
            "id": "q-timed",
            "mode": "PER_MINUTE",
            "points_award": "0",
            "rate_points_per_min": "not a number",
            "status": "paused"
        }
    ]))
    .into_response()
}

async fn complete(
    State(api): State<Shared>,
    Path(quest_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    api.received.lock().unwrap().push(Received {
        user_id: user_header(&headers),
        quest_id,
        body,
    });
    match api.replies.lock().unwrap().pop_front() {
        Some((status, body)) => (status, body).into_response(),
        None => Json(json!({
            "awarded_points": "50",
            "submitted_at": "2024-03-01T08:30:00Z",
            "streak_count": 3
        }))
        .into_response(),
    }
}

async fn spawn(replies: Vec<(StatusCode, &str)>) -> (HttpApiAdapter, Shared) {
    let api = Arc::new(FakeApi {
        replies: Mutex::new(
            replies
                .into_iter()
                .map(|(status, body)| (status, body.to_string()))
                .collect(),
        ),
        ..Default::default()
    });
    let app = Router::new()
        .route("/api/v1/dungeons/{dungeon}/quests", get(list_quests))
        .route("/api/v1/quests/{quest}/complete", post(complete))
        .with_state(api.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let adapter =
        HttpApiAdapter::new(reqwest::Client::new(), &format!("http://{}/api/v1", addr)).unwrap();
    (adapter, api)
}

fn fast_retry(max_attempts: usize) -> RetryConfig {
    RetryConfig {
        max_attempts,
        base_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
        jitter_max: None,
    }
}

fn user() -> UserContext {
    UserContext::new("1001")
}

#[tokio::test]
async fn lists_quests_with_lenient_numbers() {
    let (adapter, _) = spawn(vec![]).await;

    let quests = adapter.list_quests(&user(), &DungeonId("d1".into())).await.unwrap();

    assert_eq!(quests.len(), 3);
    assert_eq!(quests[0].points_award, Points::from_whole(50));
    assert_eq!(quests[1].mode, QuestMode::Partial);
    assert_eq!(quests[1].points_award, Points::from_whole(100));
    assert_eq!(quests[2].rate_points_per_min, None);
    assert!(!quests[2].is_active());
}

#[tokio::test]
async fn listing_maps_missing_dungeon_and_user() {
    let (adapter, _) = spawn(vec![]).await;

    let missing = adapter.list_quests(&user(), &DungeonId("nope".into())).await;
    assert!(matches!(missing, Err(PortError::NotFound(_))));

    let anonymous = adapter
        .list_quests(&UserContext::new(""), &DungeonId("d1".into()))
        .await;
    assert!(matches!(anonymous, Err(PortError::Unauthorized)));
}

#[tokio::test]
async fn binary_completion_sends_only_the_key() {
    let (adapter, api) = spawn(vec![]).await;
    let quest = Quest::new("q-binary", QuestMode::Binary, Points::from_whole(50));
    let card = QuestCard::new(quest);

    card.begin().unwrap();
    let response = card.submit(&adapter, &user()).await.unwrap();

    assert_eq!(response.awarded_points, Points::from_whole(50));
    assert_eq!(response.streak_count, Some(3));

    let received = api.received.lock().unwrap().clone();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].user_id.as_deref(), Some("1001"));
    assert_eq!(received[0].quest_id, "q-binary");
    let body = received[0].body.as_object().unwrap();
    assert_eq!(body.len(), 1);
    assert!(uuid::Uuid::parse_str(body["idempotency_key"].as_str().unwrap()).is_ok());
}

#[tokio::test]
async fn partial_completion_sends_ratio() {
    let (adapter, api) = spawn(vec![]).await;
    let quest = Quest::new("q-partial", QuestMode::Partial, Points::from_whole(100));
    let card = QuestCard::new(quest);

    card.begin().unwrap();
    card.set_input(EditState::Slider { percent: 25.0 }).unwrap();
    card.submit(&adapter, &user()).await.unwrap();

    let received = api.received.lock().unwrap().clone();
    assert_eq!(received[0].body["completion_ratio"], json!(0.25));
    assert!(received[0].body.get("minutes").is_none());
}

#[tokio::test]
async fn cooldown_conflict_is_terminal_with_server_message() {
    let (adapter, api) = spawn(vec![(StatusCode::CONFLICT, "Quest is on cooldown")]).await;
    let quest = Quest::new("q-binary", QuestMode::Binary, Points::from_whole(50));
    let card = QuestCard::new(quest);
    let channel = RetryingChannel::new(adapter, fast_retry(3));

    card.begin().unwrap();
    let err = card.submit(&channel, &user()).await.unwrap_err();

    match card.state() {
        SubmissionState::Failed { error } => {
            assert_eq!(error.kind(), FailureKind::Terminal);
            assert_eq!(
                error,
                SubmissionError::Rejected {
                    status: 409,
                    message: "Quest is on cooldown".into()
                }
            );
        }
        other => panic!("unexpected state {:?}", other),
    }
    assert!(err.to_string().contains("Quest is on cooldown"));
    assert_eq!(api.received.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn server_errors_are_retried_with_the_same_key() {
    let (adapter, api) = spawn(vec![
        (StatusCode::SERVICE_UNAVAILABLE, "try later"),
        (StatusCode::BAD_GATEWAY, ""),
    ])
    .await;
    let channel = RetryingChannel::new(adapter, fast_retry(3));
    let quest = Quest::new("q-binary", QuestMode::Binary, Points::from_whole(50));
    let card = QuestCard::new(quest);

    card.begin().unwrap();
    card.submit(&channel, &user()).await.unwrap();

    let keys: Vec<Value> = api
        .received
        .lock()
        .unwrap()
        .iter()
        .map(|r| r.body["idempotency_key"].clone())
        .collect();
    assert_eq!(keys.len(), 3);
    assert!(keys.iter().all(|key| *key == keys[0]));
}

#[tokio::test]
async fn exhausted_retries_keep_the_key_for_the_next_tap() {
    let (adapter, api) = spawn(vec![
        (StatusCode::SERVICE_UNAVAILABLE, ""),
        (StatusCode::SERVICE_UNAVAILABLE, ""),
    ])
    .await;
    let channel = RetryingChannel::new(adapter, fast_retry(2));
    let quest = Quest::new("q-binary", QuestMode::Binary, Points::from_whole(50));
    let card = QuestCard::new(quest);

    card.begin().unwrap();
    let err = card.submit(&channel, &user()).await;
    assert!(err.is_err());
    let retained = card.retained_key().unwrap();
    assert_eq!(card.state(), SubmissionState::Idle);

    card.submit(&channel, &user()).await.unwrap();

    let received = api.received.lock().unwrap().clone();
    assert_eq!(received.len(), 3);
    for r in &received {
        assert_eq!(r.body["idempotency_key"], json!(retained.to_string()));
    }
}

#[tokio::test]
async fn validation_failure_message_is_verbatim() {
    let (adapter, _) = spawn(vec![(
        StatusCode::UNPROCESSABLE_ENTITY,
        "minutes must be at least 15",
    )])
    .await;
    let quest = Quest::new("q-timed", QuestMode::PerMinute, Points::ZERO);
    let card = QuestCard::new(quest);

    card.begin().unwrap();
    card.set_input(EditState::Minutes { minutes: 5 }).unwrap();
    card.submit(&adapter, &user()).await.unwrap_err();

    assert_eq!(
        card.state(),
        SubmissionState::Failed {
            error: SubmissionError::Rejected {
                status: 422,
                message: "minutes must be at least 15".into()
            }
        }
    );
}

#[tokio::test]
async fn undecodable_success_body_is_transient() {
    let (adapter, _) = spawn(vec![(StatusCode::OK, "not json")]).await;
    let quest = Quest::new("q-binary", QuestMode::Binary, Points::from_whole(50));
    let request =
        adhd_game_core::build(&quest, &EditState::Confirm, adhd_game_core::IdempotencyKey::generate())
            .unwrap();
    assert_eq!(request.payload(), &CompletionPayload::Binary {});

    let err = adapter
        .submit_completion(&user(), &QuestId("q-binary".into()), &request)
        .await
        .unwrap_err();

    assert!(matches!(err, SubmissionError::InvalidResponse(_)));
    assert!(err.is_transient());
}

#[tokio::test]
async fn unreachable_server_is_a_network_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let adapter =
        HttpApiAdapter::new(reqwest::Client::new(), &format!("http://{}/api/v1", addr)).unwrap();
    let quest = Quest::new("q-binary", QuestMode::Binary, Points::from_whole(50));
    let card = QuestCard::new(quest);

    card.begin().unwrap();
    let err = card.submit(&adapter, &user()).await.unwrap_err();

    assert!(matches!(
        err,
        adhd_game_core::CardError::Submission(SubmissionError::Network(_))
    ));
    assert!(card.retained_key().is_some());
    assert!(!card.is_in_flight());
}
