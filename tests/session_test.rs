//! Session integration tests
//!
//! End-to-end flows through sessions, the Gemini client and a SQLite-backed
//! ledger, with wiremock standing in for the model API.

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use probability_compass::config::{GeminiConfig, RequestConfig};
use probability_compass::conversation::Role;
use probability_compass::error::{AnalysisError, AppError};
use probability_compass::gateway::Gateway;
use probability_compass::gemini::GeminiClient;
use probability_compass::guard::{FlightOutcome, FlightState};
use probability_compass::history::{HistoryEntry, HistoryLedger, SqliteHistoryStore};
use probability_compass::presentation;
use probability_compass::prompts::CHAT_FAILURE_NOTICE;
use probability_compass::session::{AnalysisSession, ChatOutcome, ChatSession};
use probability_compass::{ConfidenceBias, Query, SourcePreference};

const GENERATE_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

fn create_gateway(base_url: &str) -> Gateway {
    let config = GeminiConfig {
        api_key: Some("test-api-key".to_string()),
        base_url: base_url.to_string(),
        model: "gemini-2.5-flash".to_string(),
        temperature: 0.4,
    };
    let client = GeminiClient::new(&config, RequestConfig { timeout_ms: 5000 })
        .expect("Failed to create client");
    Gateway::new(Arc::new(client))
}

async fn sqlite_ledger() -> HistoryLedger {
    let store = SqliteHistoryStore::new_in_memory()
        .await
        .expect("Failed to open in-memory database");
    HistoryLedger::new(Arc::new(store))
}

fn text_reply(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "groundingMetadata": {"groundingChunks": [
                {"web": {"uri": "https://news.example/a", "title": "News A"}}
            ]}
        }]
    })
}

fn resolved_analysis() -> String {
    json!({
        "reframed_question": "Did the mission land successfully on the Moon?",
        "status": "resolved",
        "confidence_level": "high",
        "probability_low": 100,
        "probability_high": 100,
        "resolved_outcome": "Yes. The lander touched down on the planned date.",
        "system_decision": "Confirmed.",
        "explanation": "Multiple agencies confirmed the landing.",
        "corporate_signals": ["Contractor press release"],
        "social_signals": {
            "overall_sentiment": "bullish",
            "summary": "Celebratory coverage.",
            "key_influencers": [
                {"name": "Agency", "stance": "supportive", "statement": "Touchdown.", "source_url": "https://agency.example"}
            ]
        },
        "sources": [{"name": "Agency", "url": "https://agency.example", "data_point": "landing confirmed"}]
    })
    .to_string()
}

#[cfg(test)]
mod analysis_session_tests {
    use super::*;

    #[tokio::test]
    async fn test_successful_analysis_is_recorded() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_reply(&resolved_analysis())))
            .expect(1)
            .mount(&mock_server)
            .await;

        let ledger = sqlite_ledger().await;
        let session = AnalysisSession::new(create_gateway(&mock_server.uri()), ledger.clone());

        let query = Query::new("Did the mission land?")
            .with_source(SourcePreference::Historical)
            .with_bias(ConfidenceBias::Conservative);
        let outcome = session.submit(&query).await.unwrap();
        let result = outcome.completed().expect("analysis should complete");

        assert!(result.is_resolved());
        assert_eq!(session.state(), FlightState::Idle);

        let history = ledger.list().await.unwrap();
        assert_eq!(history, vec![HistoryEntry::Analysis(result)]);
    }

    #[tokio::test]
    async fn test_preferences_reach_the_prompt_and_result_renders() {
        let mock_server = MockServer::start().await;

        let report = json!({
            "reframed_question": "Will X happen by December 2030?",
            "status": "pending",
            "confidence_level": "low",
            "probability_low": 20,
            "probability_high": 40,
            "system_decision": "Unlikely on the current timeline.",
            "explanation": "Repeated slips of the launch date.",
            "corporate_signals": [],
            "social_signals": {"overall_sentiment": "neutral", "summary": "Quiet.", "key_influencers": []},
            "sources": []
        });
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_reply(&report.to_string())))
            .expect(1)
            .mount(&mock_server)
            .await;

        let session = AnalysisSession::new(create_gateway(&mock_server.uri()), sqlite_ledger().await);
        let query = Query::new("Will X happen by Dec 2030?")
            .with_source(SourcePreference::Polymarket)
            .with_bias(ConfidenceBias::Conservative)
            .with_keywords("launch date");

        let result = session.submit(&query).await.unwrap().completed().unwrap();
        assert_eq!(presentation::average_probability(&result), 30);
        assert!(!result.has_scenarios());

        let requests = mock_server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.contains(SourcePreference::Polymarket.instruction()));
        assert!(prompt.contains(ConfidenceBias::Conservative.instruction()));
        assert!(prompt.contains("\"launch date\""));
    }

    #[tokio::test]
    async fn test_blank_question_issues_no_request() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_reply("unused")))
            .expect(0)
            .mount(&mock_server)
            .await;

        let ledger = sqlite_ledger().await;
        let session = AnalysisSession::new(create_gateway(&mock_server.uri()), ledger.clone());

        let err = session.submit(&Query::new("   ")).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Analysis(AnalysisError::Validation { .. })
        ));
        assert!(ledger.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_analysis_leaves_history_untouched() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let ledger = sqlite_ledger().await;
        let session = AnalysisSession::new(create_gateway(&mock_server.uri()), ledger.clone());

        let err = session.submit(&Query::new("Will it?")).await.unwrap_err();
        assert!(matches!(err, AppError::Analysis(AnalysisError::Failure { .. })));
        assert!(ledger.list().await.unwrap().is_empty());
        assert_eq!(session.state(), FlightState::Idle);
    }

    #[tokio::test]
    async fn test_malformed_analysis_leaves_history_untouched() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(text_reply("{\"status\": \"pending\"}")),
            )
            .mount(&mock_server)
            .await;

        let ledger = sqlite_ledger().await;
        let session = AnalysisSession::new(create_gateway(&mock_server.uri()), ledger.clone());

        let err = session.submit(&Query::new("Will it?")).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Analysis(AnalysisError::MalformedResponse { .. })
        ));
        assert!(ledger.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overlapping_submission_is_dropped() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(text_reply(&resolved_analysis()))
                    .set_delay(Duration::from_millis(300)),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let ledger = sqlite_ledger().await;
        let session = AnalysisSession::new(create_gateway(&mock_server.uri()), ledger.clone());
        let query = Query::new("Did the mission land?");

        let (first, second) = tokio::join!(session.submit(&query), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            session.submit(&query).await
        });

        assert!(matches!(first.unwrap(), FlightOutcome::Completed(_)));
        assert!(second.unwrap().is_dropped());
        assert_eq!(ledger.list().await.unwrap().len(), 1);
        assert_eq!(session.state(), FlightState::Idle);
    }
}

#[cfg(test)]
mod chat_session_tests {
    use super::*;

    #[tokio::test]
    async fn test_chat_records_exchange_with_sources() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_reply(
                "**Estimate:** roughly 35% chance.",
            )))
            .expect(1)
            .mount(&mock_server)
            .await;

        let ledger = sqlite_ledger().await;
        let session = ChatSession::new(create_gateway(&mock_server.uri()), ledger.clone());

        let outcome = session.send("Will it snow on Friday?").await.unwrap();
        let turn = match outcome {
            ChatOutcome::Answered(turn) => turn,
            other => panic!("expected answer, got {other:?}"),
        };
        assert_eq!(turn.role, Role::Model);
        assert_eq!(turn.sources().len(), 1);
        assert_eq!(turn.sources()[0].uri, "https://news.example/a");

        let history = ledger.list().await.unwrap();
        assert_eq!(history.len(), 1);
        match &history[0] {
            HistoryEntry::Conversation(record) => {
                assert_eq!(record.query, "Will it snow on Friday?");
                assert_eq!(record.summary, "**Estimate:** roughly 35% chance....");
                assert_eq!(record.turns, session.conversation().await.turns().to_vec());
            }
            other => panic!("unexpected entry {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_chat_failure_shows_notice_and_recovers() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {"code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED"}
            })))
            .up_to_n_times(1)
            .expect(1)
            .mount(&mock_server)
            .await;

        let ledger = sqlite_ledger().await;
        let session = ChatSession::new(create_gateway(&mock_server.uri()), ledger.clone());

        let outcome = session.send("Will it?").await.unwrap();
        assert!(matches!(
            outcome,
            ChatOutcome::Failed { ref notice, .. } if notice.content == CHAT_FAILURE_NOTICE
        ));
        assert!(ledger.list().await.unwrap().is_empty());
        assert_eq!(session.state(), FlightState::Idle);

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_reply("Now it works.")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let outcome = session.send("Try again?").await.unwrap();
        assert!(matches!(outcome, ChatOutcome::Answered(_)));

        let roles: Vec<Role> = session
            .conversation()
            .await
            .turns()
            .iter()
            .map(|t| t.role)
            .collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::System, Role::User, Role::Model]
        );
        assert_eq!(ledger.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_system_notice_is_forwarded_as_model_turn() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_reply("ok")))
            .mount(&mock_server)
            .await;

        let ledger = sqlite_ledger().await;
        let session = ChatSession::new(create_gateway(&mock_server.uri()), ledger);

        session.send("first").await.unwrap();
        session.send("second").await.unwrap();

        let requests = mock_server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[1].body).unwrap();
        let texts: Vec<&str> = body["contents"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["parts"][0]["text"].as_str().unwrap())
            .collect();
        assert_eq!(texts, vec!["first", CHAT_FAILURE_NOTICE, "second"]);

        let roles: Vec<&str> = body["contents"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, vec!["user", "model", "user"]);
    }

    #[tokio::test]
    async fn test_window_respects_configured_max_turns() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_reply("ok")))
            .mount(&mock_server)
            .await;

        let session = ChatSession::new(create_gateway(&mock_server.uri()), HistoryLedger::in_memory())
            .with_max_turns(2);

        for text in ["one", "two", "three"] {
            session.send(text).await.unwrap();
        }

        let requests = mock_server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[2].body).unwrap();
        let texts: Vec<&str> = body["contents"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["parts"][0]["text"].as_str().unwrap())
            .collect();
        assert_eq!(texts, vec!["two", "ok", "three"]);
    }
}
