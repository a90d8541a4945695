//! Integration tests for the Telegram chat adapter against a mock Bot API

mod common;

use common::FakeToolchain;
use evalbot_engine::bot::TelegramBot;
use evalbot_engine::config::ChatConfig;
use evalbot_engine::message_bus::{Event, EventType, MessageBus};
use evalbot_engine::pipeline::SnippetPipeline;
use sdk::types::ConversationId;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::task::JoinSet;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "123:abc";

struct Harness {
    server: MockServer,
    bot: TelegramBot,
    bus: MessageBus,
    _root: TempDir,
}

async fn harness() -> Harness {
    harness_with(FakeToolchain::new(), true).await
}

async fn harness_with(toolchain: FakeToolchain, report_cleanup_failures: bool) -> Harness {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/bot{}/getMe", TOKEN)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": {"id": 1, "is_bot": true, "username": "evalbot"}
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{}/sendMessage", TOKEN)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let root = TempDir::new().unwrap();
    let pipeline = Arc::new(SnippetPipeline::with_root(root.path(), Arc::new(toolchain)));
    let bus = MessageBus::new();
    let config = ChatConfig {
        api_base_url: server.uri(),
        poll_timeout_secs: 0,
        report_cleanup_failures,
        ..ChatConfig::default()
    };
    let bot = TelegramBot::new(&config, TOKEN.to_string(), pipeline, bus.clone());

    Harness {
        server,
        bot,
        bus,
        _root: root,
    }
}

async fn mount_updates(server: &MockServer, messages: &[(i64, i64, &str)]) {
    let result: Vec<Value> = messages
        .iter()
        .map(|(update_id, chat_id, text)| {
            json!({
                "update_id": update_id,
                "message": {"message_id": update_id, "chat": {"id": chat_id}, "text": text}
            })
        })
        .collect();

    Mock::given(method("GET"))
        .and(path(format!("/bot{}/getUpdates", TOKEN)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": result
        })))
        .mount(server)
        .await;
}

/// Bodies of every sendMessage call, in order
async fn sent_messages(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.url.path().ends_with("/sendMessage"))
        .map(|request| serde_json::from_slice(&request.body).unwrap())
        .collect()
}

async fn drain(tasks: &mut JoinSet<()>) {
    while let Some(joined) = tasks.join_next().await {
        joined.unwrap();
    }
}

#[tokio::test]
async fn test_eval_message_gets_result_reply() {
    let h = harness().await;
    mount_updates(&h.server, &[(10, 42, "/eval\n1 + 1")]).await;
    let mut events = h.bus.subscribe(EventType::All).await;

    h.bot.connect().await.unwrap();
    let mut tasks = JoinSet::new();
    let offset = h.bot.poll_once(0, &mut tasks).await.unwrap();
    drain(&mut tasks).await;

    assert_eq!(offset, 11);
    assert_eq!(
        sent_messages(&h.server).await,
        vec![json!({"chat_id": 42, "text": "2"})]
    );

    assert_eq!(events.recv().await.unwrap(), Event::SessionEstablished);
    assert_eq!(
        events.recv().await.unwrap(),
        Event::MessageReceived {
            conversation_id: ConversationId::from(42i64),
            text: "/eval\n1 + 1".to_string(),
        }
    );
    assert_eq!(
        events.recv().await.unwrap(),
        Event::ResponseEmitted {
            conversation_id: ConversationId::from(42i64),
            kind: "result".to_string(),
        }
    );
}

#[tokio::test]
async fn test_eval_without_expressions() {
    let h = harness().await;
    mount_updates(&h.server, &[(1, 7, "/eval elm-lang/html")]).await;

    let mut tasks = JoinSet::new();
    h.bot.poll_once(0, &mut tasks).await.unwrap();
    drain(&mut tasks).await;

    let sent = sent_messages(&h.server).await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0]["text"].as_str().unwrap().contains("Nothing to evaluate"));
}

#[tokio::test]
async fn test_cleanup_failure_follows_result() {
    let h = harness_with(FakeToolchain::new().replacing_workdir_with_file(), true).await;
    mount_updates(&h.server, &[(20, 42, "/eval\n7")]).await;

    let mut tasks = JoinSet::new();
    h.bot.poll_once(0, &mut tasks).await.unwrap();
    drain(&mut tasks).await;

    let sent = sent_messages(&h.server).await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0], json!({"chat_id": 42, "text": "7"}));
    assert_eq!(sent[1]["chat_id"], json!(42));
    assert!(sent[1]["text"]
        .as_str()
        .unwrap()
        .contains("Couldn't delete the temp directory"));
}

#[tokio::test]
async fn test_cleanup_failure_not_reported_when_disabled() {
    let h = harness_with(FakeToolchain::new().replacing_workdir_with_file(), false).await;
    mount_updates(&h.server, &[(21, 42, "/eval\n7")]).await;

    let mut tasks = JoinSet::new();
    h.bot.poll_once(0, &mut tasks).await.unwrap();
    drain(&mut tasks).await;

    assert_eq!(
        sent_messages(&h.server).await,
        vec![json!({"chat_id": 42, "text": "7"})]
    );
}

#[tokio::test]
async fn test_plain_text_is_forwarded_but_not_answered() {
    let h = harness().await;
    mount_updates(&h.server, &[(3, 9, "hello there")]).await;
    let mut received = h.bus.subscribe(EventType::MessageReceived).await;

    let mut tasks = JoinSet::new();
    h.bot.poll_once(0, &mut tasks).await.unwrap();

    assert!(tasks.is_empty());
    assert!(sent_messages(&h.server).await.is_empty());
    assert_eq!(
        received.recv().await.unwrap(),
        Event::MessageReceived {
            conversation_id: ConversationId::from(9i64),
            text: "hello there".to_string(),
        }
    );
}

#[tokio::test]
async fn test_status_reports_availability() {
    let h = harness().await;
    mount_updates(&h.server, &[(4, 5, "/status")]).await;

    h.bot.connect().await.unwrap();
    let mut tasks = JoinSet::new();
    h.bot.poll_once(0, &mut tasks).await.unwrap();

    let sent = sent_messages(&h.server).await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0]["text"].as_str().unwrap().contains("online"));
}

#[tokio::test]
async fn test_failed_poll_terminates_session() {
    let h = harness().await;
    Mock::given(method("GET"))
        .and(path(format!("/bot{}/getUpdates", TOKEN)))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&h.server)
        .await;
    let mut events = h.bus.subscribe(EventType::All).await;

    h.bot.connect().await.unwrap();
    assert!(h.bot.is_available());

    let mut tasks = JoinSet::new();
    assert!(h.bot.poll_once(0, &mut tasks).await.is_err());

    assert!(!h.bot.is_available());
    assert_eq!(events.recv().await.unwrap(), Event::SessionEstablished);
    assert_eq!(events.recv().await.unwrap(), Event::SessionTerminated);
}

#[tokio::test]
async fn test_rejected_token_fails_connect() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/botbad/getMe"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "ok": false,
            "description": "Unauthorized"
        })))
        .mount(&server)
        .await;

    let root = TempDir::new().unwrap();
    let pipeline = Arc::new(SnippetPipeline::with_root(
        root.path(),
        Arc::new(FakeToolchain::new()),
    ));
    let config = ChatConfig {
        api_base_url: server.uri(),
        ..ChatConfig::default()
    };
    let bot = TelegramBot::new(&config, "bad".to_string(), pipeline, MessageBus::new());

    assert!(bot.connect().await.is_err());
    assert!(!bot.is_available());
}
