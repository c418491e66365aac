mod common;

use common::{Answer, MockTransportMock, ScriptedPrompter, handle, scripted_transport, state};
use rsp_runner::client::methods as rsp;
use rsp_runner::error::Result;
use rsp_runner::explorer::{self, InMemoryOutputWindow, RefreshEvent, TreeNode};
use rsp_runner::protocol::RunState;
use rsp_runner::transport::InboundMessage;
use rsp_runner::{Config, RspClient, RspSession};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

fn notification(method: &str, params: Value) -> InboundMessage {
    InboundMessage::Notification {
        method: method.to_string(),
        params,
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap()
}

async fn next_refresh(refreshes: &mut broadcast::Receiver<RefreshEvent>) -> RefreshEvent {
    tokio::time::timeout(Duration::from_secs(2), refreshes.recv())
        .await
        .expect("no refresh within 2s")
        .expect("refresh channel closed")
}

/// Answers the seeding requests for a server list of `existing`.
fn seeding_responder(
    existing: Vec<(&'static str, RunState)>,
) -> impl Fn(&str, &Value) -> Result<Value> + Send + Sync + 'static {
    move |method: &str, params: &Value| match method {
        rsp::GET_SERVER_HANDLES => Ok(Value::Array(
            existing.iter().map(|(id, _)| to_json(&handle(id))).collect(),
        )),
        rsp::GET_SERVER_STATE => {
            let id = params["id"].as_str().unwrap_or_default();
            let (_, run_state) = existing
                .iter()
                .find(|(known, _)| *known == id)
                .expect("state requested for unknown server");
            Ok(to_json(&state(id, *run_state)))
        }
        other => panic!("unexpected request {}", other),
    }
}

async fn open(
    transport: MockTransportMock,
    prompter: Arc<ScriptedPrompter>,
) -> (RspSession, mpsc::UnboundedSender<InboundMessage>, InMemoryOutputWindow) {
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let window = InMemoryOutputWindow::new();
    let session = RspSession::open(
        RspClient::new(transport),
        inbound_rx,
        Arc::new(window.clone()),
        prompter,
        &Config::default(),
    )
    .await
    .unwrap();
    (session, inbound_tx, window)
}

#[tokio::test]
async fn test_open_seeds_existing_servers() -> Result<()> {
    let (transport, _) = scripted_transport(seeding_responder(vec![
        ("wildfly", RunState::Started),
        ("eap", RunState::Stopped),
    ]));
    let (session, _inbound, _) = open(transport, ScriptedPrompter::new(Vec::new())).await;

    let guard = explorer::lock(session.explorer())?;
    assert_eq!(guard.model().server_ids(), vec!["wildfly", "eap"]);
    assert!(guard.model().is_consistent());

    let roots = guard.get_children(None);
    let labels: Vec<String> = roots
        .iter()
        .map(|node| guard.get_tree_item(node).unwrap().context_value)
        .collect();
    assert_eq!(labels, vec!["Started", "Stopped"]);
    Ok(())
}

#[tokio::test]
async fn test_notifications_drive_the_model() -> Result<()> {
    let (transport, _) = scripted_transport(seeding_responder(Vec::new()));
    let (session, inbound, window) = open(transport, ScriptedPrompter::new(Vec::new())).await;
    let mut refreshes = explorer::lock(session.explorer())?.subscribe();

    inbound
        .send(notification(rsp::SERVER_ADDED, to_json(&handle("wildfly"))))
        .unwrap();
    assert_eq!(next_refresh(&mut refreshes).await, RefreshEvent::All);

    inbound
        .send(notification(
            rsp::SERVER_STATE_CHANGED,
            to_json(&state("wildfly", RunState::Stopped)),
        ))
        .unwrap();
    assert_eq!(
        next_refresh(&mut refreshes).await,
        RefreshEvent::Server("wildfly".to_string())
    );

    {
        let guard = explorer::lock(session.explorer())?;
        let item = guard
            .get_tree_item(&TreeNode::Server(handle("wildfly")))
            .unwrap();
        assert_eq!(item.context_value, "Stopped");
    }

    inbound
        .send(notification(
            rsp::SERVER_PROCESS_OUTPUT,
            json!({
                "server": to_json(&handle("wildfly")),
                "processId": "wildfly:1",
                "streamType": 1,
                "text": "WFLYSRV0025: WildFly Full 26.1.3.Final started\n"
            }),
        ))
        .unwrap();
    // A later refresh means the output before it was applied
    inbound
        .send(notification(
            rsp::SERVER_STATE_CHANGED,
            to_json(&state("wildfly", RunState::Started)),
        ))
        .unwrap();
    next_refresh(&mut refreshes).await;

    let record = window.record("Server: wildfly").unwrap();
    assert_eq!(
        record.content,
        "WFLYSRV0025: WildFly Full 26.1.3.Final started\n"
    );
    assert_eq!(record.show_count, 1);
    Ok(())
}

#[tokio::test]
async fn test_removal_wins_over_late_updates() -> Result<()> {
    let (transport, _) =
        scripted_transport(seeding_responder(vec![("wildfly", RunState::Started)]));
    let (session, inbound, window) = open(transport, ScriptedPrompter::new(Vec::new())).await;
    let mut refreshes = explorer::lock(session.explorer())?.subscribe();

    inbound
        .send(notification(
            rsp::SERVER_PROCESS_OUTPUT,
            json!({"server": to_json(&handle("wildfly")), "text": "stopping\n"}),
        ))
        .unwrap();
    inbound
        .send(notification(rsp::SERVER_REMOVED, to_json(&handle("wildfly"))))
        .unwrap();
    inbound
        .send(notification(
            rsp::SERVER_STATE_CHANGED,
            to_json(&state("wildfly", RunState::Stopped)),
        ))
        .unwrap();
    inbound
        .send(notification(
            rsp::SERVER_PROCESS_OUTPUT,
            json!({"server": to_json(&handle("wildfly")), "text": "late\n"}),
        ))
        .unwrap();
    // Sentinel to know everything before it was dispatched
    inbound
        .send(notification(rsp::SERVER_ADDED, to_json(&handle("eap"))))
        .unwrap();

    assert_eq!(next_refresh(&mut refreshes).await, RefreshEvent::All);
    assert_eq!(next_refresh(&mut refreshes).await, RefreshEvent::All);

    let guard = explorer::lock(session.explorer())?;
    assert!(!guard.model().contains("wildfly"));
    assert!(guard.model().is_consistent());
    assert!(!guard.has_output_channel("wildfly"));

    // The channel was disposed once and never created again
    assert_eq!(window.created(), vec!["Server: wildfly"]);
    let record = window.record("Server: wildfly").unwrap();
    assert!(record.disposed);
    assert!(record.content.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_malformed_notification_is_skipped() -> Result<()> {
    let (transport, _) = scripted_transport(seeding_responder(Vec::new()));
    let (session, inbound, _) = open(transport, ScriptedPrompter::new(Vec::new())).await;
    let mut refreshes = explorer::lock(session.explorer())?.subscribe();

    inbound
        .send(notification(rsp::SERVER_ADDED, json!({"unexpected": true})))
        .unwrap();
    inbound
        .send(notification("client/discoveryPathAdded", json!({"filepath": "/opt"})))
        .unwrap();
    inbound
        .send(notification(rsp::SERVER_ADDED, to_json(&handle("eap"))))
        .unwrap();

    assert_eq!(next_refresh(&mut refreshes).await, RefreshEvent::All);
    assert_eq!(explorer::lock(session.explorer())?.model().server_ids(), vec!["eap"]);
    Ok(())
}

#[tokio::test]
async fn test_string_prompt_is_answered() {
    let (answers_tx, mut answers_rx) = mpsc::unbounded_channel();
    let mut transport = MockTransportMock::new();
    transport
        .expect_send_request()
        .returning(|method, _| match method {
            rsp::GET_SERVER_HANDLES => Ok(json!([])),
            other => panic!("unexpected request {}", other),
        });
    transport
        .expect_send_response()
        .times(1)
        .returning(move |id, result| {
            answers_tx.send((id, result)).unwrap();
            Ok(())
        });

    let prompter = ScriptedPrompter::new(vec![Answer::input("admin123")]);
    let (_session, inbound, _) = open(transport, Arc::clone(&prompter)).await;

    inbound
        .send(InboundMessage::Request {
            id: json!(7),
            method: rsp::PROMPT_STRING.to_string(),
            params: json!({"id": 1, "code": 0, "prompt": "Admin password", "secret": true}),
        })
        .unwrap();

    let (id, answer) = tokio::time::timeout(Duration::from_secs(2), answers_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(id, json!(7));
    assert_eq!(answer, json!("admin123"));

    let asked = prompter.inputs.lock().unwrap().clone();
    assert_eq!(asked[0].prompt, "Admin password");
    assert!(asked[0].password);
}

#[tokio::test]
async fn test_dismissed_string_prompt_answers_empty() {
    let (answers_tx, mut answers_rx) = mpsc::unbounded_channel();
    let mut transport = MockTransportMock::new();
    transport
        .expect_send_request()
        .returning(|_, _| Ok(json!([])));
    transport
        .expect_send_response()
        .returning(move |_, result| {
            answers_tx.send(result).unwrap();
            Ok(())
        });

    let (_session, inbound, _) = open(transport, ScriptedPrompter::new(vec![Answer::Input(None)])).await;
    inbound
        .send(InboundMessage::Request {
            id: json!("p-1"),
            method: rsp::PROMPT_STRING.to_string(),
            params: json!({"prompt": "Username"}),
        })
        .unwrap();

    let answer = tokio::time::timeout(Duration::from_secs(2), answers_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(answer, json!(""));
}

#[tokio::test]
async fn test_shutdown_notifies_once_and_disposes_channels() -> Result<()> {
    let respond = seeding_responder(vec![("wildfly", RunState::Started)]);
    let mut transport = MockTransportMock::new();
    transport
        .expect_send_request()
        .returning(move |method, params| respond(method, &params));
    transport
        .expect_send_notification()
        .times(1)
        .returning(|method, params| {
            assert_eq!(method, rsp::SHUTDOWN);
            assert_eq!(params, Value::Null);
            Ok(())
        });

    let (session, inbound, window) = open(transport, ScriptedPrompter::new(Vec::new())).await;
    let mut refreshes = explorer::lock(session.explorer())?.subscribe();
    inbound
        .send(notification(
            rsp::SERVER_PROCESS_OUTPUT,
            json!({"server": to_json(&handle("wildfly")), "text": "up\n"}),
        ))
        .unwrap();
    inbound
        .send(notification(
            rsp::SERVER_STATE_CHANGED,
            to_json(&state("wildfly", RunState::Started)),
        ))
        .unwrap();
    next_refresh(&mut refreshes).await;

    session.shutdown().await?;
    session.shutdown().await?;

    assert!(session.is_shut_down());
    assert!(window.record("Server: wildfly").unwrap().disposed);
    Ok(())
}
